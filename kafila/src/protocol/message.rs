//! Typed inbound messages
//!
//! Payloads are classified and decoded exactly once here; the dispatcher
//! and everything downstream match on [`InboundMessage`] variants.

use super::broadcast::{PeerBatch, decode_batch};
use super::frame::Channel;
use crate::core::types::NavigationTarget;
use crate::fleet::{FLEET_SIZE, TopologyMatrix, VehicleId};
use crate::formation::FormationOffset;

/// Navigation goal addressed to one vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCommand {
    pub target_id: VehicleId,
    pub target: NavigationTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormationCommand {
    /// `[F,T]`
    Stop,
    /// `[F,L,<id>]`
    Lead(VehicleId),
    /// `[F,F,<leader>,<dx>,<dy>,<dyaw>]`
    Follow {
        leader: VehicleId,
        offset: FormationOffset,
    },
    /// `[F,U,<leader>,<dx>,<dy>,<dyaw>]`
    Update {
        leader: VehicleId,
        offset: FormationOffset,
    },
    /// `[F,S,<leader>,<pattern>]`, informational
    Start { leader: VehicleId, pattern: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopologyCommand {
    /// `[T,E,<0|1>]`
    SetEnabled(bool),
    /// `[T,M,...]` (enables filtering) or legacy `TOPOLOGY:` (leaves it alone)
    Load {
        matrix: TopologyMatrix,
        enable: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Control(ControlCommand),
    Formation(FormationCommand),
    Topology(TopologyCommand),
    PeerBatch(PeerBatch),
}

const LEGACY_CONTROL: &str = "CTRL:";
const LEGACY_FORMATION_UPDATE: &str = "FORMATION:UPDATE,";
const LEGACY_TOPOLOGY: &str = "TOPOLOGY:";

/// Decode one frame payload
pub fn decode(channel: Channel, payload: &[u8]) -> Option<InboundMessage> {
    let text = std::str::from_utf8(payload).ok()?.trim();
    let bytes = text.as_bytes();

    if bytes.first() == Some(&b'[') {
        if bytes.get(2) == Some(&b',') {
            return decode_bracketed(text);
        }
        if bytes.get(1).is_some_and(u8::is_ascii_digit) {
            return match channel {
                Channel::Broadcast => decode_batch(bytes).map(InboundMessage::PeerBatch),
                Channel::Unicast => {
                    log::debug!("Peer batch on unicast channel ignored");
                    None
                }
            };
        }
    }

    match channel {
        Channel::Broadcast => decode_legacy(text),
        Channel::Unicast => None,
    }
}

fn decode_bracketed(text: &str) -> Option<InboundMessage> {
    let body = text.strip_prefix('[')?;
    let body = &body[..body.find(']')?];
    let mut fields = body.split(',').map(str::trim);
    let kind = fields.next()?;
    let args: Vec<&str> = fields.collect();

    match kind {
        "C" => decode_control(&args).map(InboundMessage::Control),
        "F" => decode_formation(&args).map(InboundMessage::Formation),
        "T" => decode_topology(&args).map(InboundMessage::Topology),
        _ => {
            log::debug!("Unknown command kind {:?}", kind);
            None
        }
    }
}

fn decode_control(args: &[&str]) -> Option<ControlCommand> {
    let [id, x, y, yaw] = args else {
        return None;
    };
    Some(ControlCommand {
        target_id: VehicleId::from_short(id)?,
        target: NavigationTarget::new(float(x)?, float(y)?, float(yaw)?),
    })
}

fn decode_formation(args: &[&str]) -> Option<FormationCommand> {
    let (sub, rest) = args.split_first()?;
    match (*sub, rest) {
        ("T", []) => Some(FormationCommand::Stop),
        ("L", [id]) => Some(FormationCommand::Lead(VehicleId::from_short(id)?)),
        ("F", [leader, dx, dy, dyaw]) => Some(FormationCommand::Follow {
            leader: VehicleId::from_short(leader)?,
            offset: offset(dx, dy, dyaw)?,
        }),
        ("U", [leader, dx, dy, dyaw]) => Some(FormationCommand::Update {
            leader: VehicleId::from_short(leader)?,
            offset: offset(dx, dy, dyaw)?,
        }),
        ("S", [leader, pattern]) => Some(FormationCommand::Start {
            leader: VehicleId::from_short(leader)?,
            pattern: pattern.to_string(),
        }),
        _ => None,
    }
}

fn decode_topology(args: &[&str]) -> Option<TopologyCommand> {
    let (sub, rest) = args.split_first()?;
    match (*sub, rest) {
        ("E", [flag]) => match *flag {
            "0" => Some(TopologyCommand::SetEnabled(false)),
            "1" => Some(TopologyCommand::SetEnabled(true)),
            _ => None,
        },
        ("M", values) if values.len() == FLEET_SIZE * FLEET_SIZE => Some(TopologyCommand::Load {
            matrix: matrix(values.iter().copied())?,
            enable: true,
        }),
        _ => None,
    }
}

fn decode_legacy(text: &str) -> Option<InboundMessage> {
    if let Some(start) = text.find(LEGACY_TOPOLOGY) {
        let rows = &text[start + LEGACY_TOPOLOGY.len()..];
        let values = rows.split(';').flat_map(|row| row.split(',')).map(str::trim);
        let values: Vec<&str> = values.collect();
        if values.len() != FLEET_SIZE * FLEET_SIZE {
            return None;
        }
        return Some(InboundMessage::Topology(TopologyCommand::Load {
            matrix: matrix(values.into_iter())?,
            enable: false,
        }));
    }

    if let Some(start) = text.find(LEGACY_FORMATION_UPDATE) {
        let args: Vec<&str> = text[start + LEGACY_FORMATION_UPDATE.len()..]
            .split(',')
            .map(str::trim)
            .collect();
        let [leader, dx, dy, dyaw] = args.as_slice() else {
            return None;
        };
        return Some(InboundMessage::Formation(FormationCommand::Update {
            leader: VehicleId::from_short(leader)?,
            offset: offset(dx, dy, dyaw)?,
        }));
    }

    if let Some(start) = text.find(LEGACY_CONTROL) {
        let args: Vec<&str> = text[start + LEGACY_CONTROL.len()..]
            .split(',')
            .map(str::trim)
            .collect();
        return decode_control(&args).map(InboundMessage::Control);
    }

    log::debug!("Unrecognized broadcast payload dropped");
    None
}

fn float(field: &str) -> Option<f32> {
    field.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn offset(dx: &str, dy: &str, dyaw: &str) -> Option<FormationOffset> {
    Some(FormationOffset::new(float(dx)?, float(dy)?, float(dyaw)?))
}

/// Row-major 0/1 entries into a matrix; any other value rejects the whole load
fn matrix<'a>(values: impl Iterator<Item = &'a str>) -> Option<TopologyMatrix> {
    let mut matrix = [[false; FLEET_SIZE]; FLEET_SIZE];
    let mut count = 0;
    for (i, value) in values.enumerate() {
        let cell = matrix.get_mut(i / FLEET_SIZE)?.get_mut(i % FLEET_SIZE)?;
        *cell = match value {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        count += 1;
    }
    (count == FLEET_SIZE * FLEET_SIZE).then_some(matrix)
}
