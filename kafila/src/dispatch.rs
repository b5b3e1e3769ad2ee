//! Routing of inbound datagrams into fleet state

use crate::fleet::{Fleet, SharedFleet};
use crate::protocol::{
    Channel, ControlCommand, FormationCommand, FrameScanner, InboundMessage, PeerBatch,
    TopologyCommand, decode,
};

/// Demultiplexes received bytes and applies the decoded messages
///
/// This is the only writer of peer records, topology and formation
/// configuration.
pub struct Dispatcher {
    fleet: SharedFleet,
    housekeeping_interval_ms: u64,
    last_housekeeping_ms: u64,
}

impl Dispatcher {
    pub fn new(fleet: SharedFleet, housekeeping_interval_ms: u64) -> Self {
        Self {
            fleet,
            housekeeping_interval_ms,
            last_housekeeping_ms: 0,
        }
    }

    pub fn fleet(&self) -> &SharedFleet {
        &self.fleet
    }

    /// Apply every complete frame in `buf`; returns the number of frames seen
    pub fn process(&mut self, buf: &[u8], now_ms: u64) -> usize {
        let mut fleet = self.fleet.lock();
        let mut frames = 0;
        for frame in FrameScanner::new(buf) {
            frames += 1;
            log::trace!(
                "Frame on {:?} channel, {} bytes",
                frame.channel,
                frame.payload.len()
            );
            match decode(frame.channel, frame.payload) {
                Some(message) => apply(&mut fleet, frame.channel, message, now_ms),
                None => log::debug!(
                    "Undecodable payload dropped: {:?}",
                    String::from_utf8_lossy(frame.payload)
                ),
            }
        }
        frames
    }

    /// Time-gated peer eviction; call every tick
    pub fn housekeeping(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.last_housekeeping_ms) < self.housekeeping_interval_ms {
            return;
        }
        self.last_housekeeping_ms = now_ms;
        let removed = self.fleet.lock().peers.evict(now_ms);
        if removed > 0 {
            log::info!("Housekeeping evicted {} stale peer(s)", removed);
        }
    }
}

fn apply(fleet: &mut Fleet, channel: Channel, message: InboundMessage, now_ms: u64) {
    match message {
        InboundMessage::Control(cmd) => apply_control(fleet, cmd),
        InboundMessage::Formation(cmd) => apply_formation(fleet, cmd),
        InboundMessage::Topology(cmd) => apply_topology(fleet, cmd),
        InboundMessage::PeerBatch(batch) => apply_batch(fleet, &batch, now_ms),
    }
    log::trace!("Applied message from {:?} channel", channel);
}

fn apply_control(fleet: &mut Fleet, cmd: ControlCommand) {
    if fleet.is_local(cmd.target_id) {
        fleet.set_target(cmd.target);
    } else {
        log::trace!("Control command for {} ignored", cmd.target_id);
    }
}

fn apply_formation(fleet: &mut Fleet, cmd: FormationCommand) {
    match cmd {
        FormationCommand::Stop => {
            log::info!("Formation stopped");
            fleet.formation.stop();
        }
        FormationCommand::Lead(id) => {
            if fleet.is_local(id) {
                log::info!("Formation role: leader");
                fleet.formation.lead();
            }
        }
        FormationCommand::Follow { leader, offset } => {
            if fleet.is_local(leader) {
                log::debug!("Ignoring request to follow ourselves");
                return;
            }
            log::info!(
                "Formation role: following {} at ({:.2}, {:.2}, {:.1})",
                leader,
                offset.dx,
                offset.dy,
                offset.dyaw
            );
            fleet.formation.follow(leader, offset);
        }
        FormationCommand::Update { leader, offset } => {
            if fleet.formation.update_offset(leader, offset) {
                log::info!(
                    "Formation offset updated to ({:.2}, {:.2}, {:.1})",
                    offset.dx,
                    offset.dy,
                    offset.dyaw
                );
            }
        }
        FormationCommand::Start { leader, pattern } => {
            log::info!("Formation {:?} starting with leader {}", pattern, leader);
        }
    }
}

fn apply_topology(fleet: &mut Fleet, cmd: TopologyCommand) {
    match cmd {
        TopologyCommand::SetEnabled(enabled) => {
            log::info!("Topology filtering {}", if enabled { "enabled" } else { "disabled" });
            fleet.topology.set_enabled(enabled);
        }
        TopologyCommand::Load { matrix, enable } => {
            fleet.topology.load_matrix(matrix);
            if enable {
                fleet.topology.set_enabled(true);
            }
            log::info!("Topology matrix loaded: {:?}", fleet.topology.matrix());
        }
    }
}

fn apply_batch(fleet: &mut Fleet, batch: &PeerBatch, now_ms: u64) {
    let local = fleet.local_id();
    for entry in batch.iter() {
        if Some(entry.id) == local {
            continue;
        }
        if !fleet.topology.should_process(entry.id, local) {
            log::trace!("Broadcast from {} filtered by topology", entry.id);
            continue;
        }
        fleet.peers.upsert(entry.id, entry.pose, entry.velocity, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::VehicleId;
    use crate::formation::FormationMode;

    fn dispatcher(local: u8) -> Dispatcher {
        let fleet = Fleet::shared(30_000);
        fleet.lock().set_local_id(VehicleId::car(local));
        Dispatcher::new(fleet, 10_000)
    }

    fn frame(channel: u8, payload: &str) -> Vec<u8> {
        format!("+IPD,{},{}:{}", channel, payload.len(), payload).into_bytes()
    }

    #[test]
    fn test_control_only_for_local_vehicle() {
        let mut d = dispatcher(2);
        d.process(&frame(0, "[C,CAR1,1,1,0]"), 0);
        assert!(d.fleet().lock().target().is_none());

        d.process(&frame(0, "[C,CAR2,1,1,0]"), 0);
        assert!(d.fleet().lock().take_new_target().is_some());
    }

    #[test]
    fn test_formation_sequence() {
        let mut d = dispatcher(2);
        let mut buf = frame(0, "[F,F,CAR1,-0.5,0,0]");
        buf.extend(frame(0, "[F,U,CAR3,-9,0,0]"));
        buf.extend(frame(1, "[F,U,CAR1,-1.0,0.5,0]"));
        assert_eq!(d.process(&buf, 0), 3);

        let state = d.fleet().lock().formation;
        assert_eq!(state.mode, FormationMode::Follower);
        assert_eq!(state.leader_id, Some(VehicleId::car(1)));
        assert_eq!(state.offset.dx, -1.0);

        d.process(&frame(1, "[F,L,CAR3]"), 0);
        assert_eq!(d.fleet().lock().formation.mode, FormationMode::Follower);
        d.process(&frame(1, "[F,L,CAR2]"), 0);
        assert_eq!(d.fleet().lock().formation.mode, FormationMode::Leader);
        d.process(&frame(0, "[F,F,CAR2,0,0,0]"), 0);
        assert_eq!(d.fleet().lock().formation.mode, FormationMode::Leader);
        d.process(&frame(0, "[F,T]"), 0);
        assert_eq!(d.fleet().lock().formation.mode, FormationMode::None);
    }

    #[test]
    fn test_batch_skips_self_and_respects_topology() {
        let mut d = dispatcher(2);
        d.process(&frame(1, "[T,M,0,0,0,0,0,0,0,0,0,1,0,0,0,0,0,0]"), 0);
        d.process(
            &frame(1, "[3 C1 1 1 0 0 0 0 C2 2 2 0 0 0 0 C3 3 3 0 0 0 0]"),
            500,
        );

        let fleet = d.fleet().lock();
        assert!(fleet.topology.is_enabled());
        assert!(fleet.peers.lookup(VehicleId::car(1)).is_none());
        assert!(fleet.peers.lookup(VehicleId::car(2)).is_none());
        let c3 = fleet.peers.lookup(VehicleId::car(3)).unwrap();
        assert_eq!(c3.last_update_ms, 500);
    }

    #[test]
    fn test_housekeeping_is_time_gated() {
        let mut d = dispatcher(1);
        d.process(&frame(1, "[1 C2 0 0 0 0 0 0]"), 0);

        d.housekeeping(25_000);
        // Stale, but the next pass is not due until 35s
        d.housekeeping(31_000);
        assert!(d.fleet().lock().peers.lookup(VehicleId::car(2)).is_some());

        d.housekeeping(35_000);
        assert!(d.fleet().lock().peers.lookup(VehicleId::car(2)).is_none());
    }
}
