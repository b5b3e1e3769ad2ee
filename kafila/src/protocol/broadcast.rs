//! Compact peer-state broadcast codec
//!
//! Wire form: `[<count> <id> <x> <y> <heading> <vx> <vy> <vz> <id> ...]`,
//! fields separated by whitespace only. Ids use the short `C<n>` form.

use super::cursor::Cursor;
use crate::core::types::{BodyVelocity, Pose2D};
use crate::fleet::{PEER_CAPACITY, VehicleId};
use std::fmt::Write;

/// One decoded peer tuple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerEntry {
    pub id: VehicleId,
    pub pose: Pose2D,
    pub velocity: BodyVelocity,
}

/// Fixed-capacity list of peer tuples from one broadcast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerBatch {
    entries: [Option<PeerEntry>; PEER_CAPACITY],
    len: usize,
}

impl PeerBatch {
    pub fn new() -> Self {
        Self {
            entries: [None; PEER_CAPACITY],
            len: 0,
        }
    }

    /// Append an entry; returns `false` when full
    pub fn push(&mut self, entry: PeerEntry) -> bool {
        match self.entries.get_mut(self.len) {
            Some(slot) => {
                *slot = Some(entry);
                self.len += 1;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerEntry> {
        self.entries[..self.len].iter().flatten()
    }
}

impl Default for PeerBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a compact batch
///
/// Decoding stops at the first tuple that fails to parse; tuples before it
/// are kept. Returns `None` for a bad header or when no tuple decoded.
pub fn decode_batch(payload: &[u8]) -> Option<PeerBatch> {
    let mut cursor = Cursor::new(payload);
    if cursor.take(1)? != b"[" || !payload.contains(&b']') {
        return None;
    }

    let count: i64 = cursor.parse()?;
    if count <= 0 || count > PEER_CAPACITY as i64 {
        log::debug!("Broadcast batch with count {} rejected", count);
        return None;
    }

    let mut batch = PeerBatch::new();
    for _ in 0..count {
        match decode_tuple(&mut cursor) {
            Some(entry) => {
                batch.push(entry);
            }
            None => {
                log::debug!(
                    "Broadcast tuple {} of {} malformed, batch truncated",
                    batch.len() + 1,
                    count
                );
                break;
            }
        }
    }

    (!batch.is_empty()).then_some(batch)
}

fn decode_tuple(cursor: &mut Cursor<'_>) -> Option<PeerEntry> {
    let id = VehicleId::from_short(cursor.token()?)?;
    let mut values = [0.0f32; 6];
    for value in values.iter_mut() {
        *value = cursor.parse()?;
        if !value.is_finite() {
            return None;
        }
    }
    let [x, y, heading, vx, vy, vz] = values;
    Some(PeerEntry {
        id,
        pose: Pose2D::new(x, y, heading),
        velocity: BodyVelocity { vx, vy, vz },
    })
}

/// Encode entries in the compact wire form
pub fn encode_batch<'a>(entries: impl IntoIterator<Item = &'a PeerEntry>) -> String {
    let mut body = String::new();
    let mut count = 0;
    for entry in entries {
        let _ = write!(
            body,
            " {} {:.2} {:.2} {:.1} {:.3} {:.3} {:.3}",
            entry.id.short(),
            entry.pose.x,
            entry.pose.y,
            entry.pose.yaw,
            entry.velocity.vx,
            entry.velocity.vy,
            entry.velocity.vz
        );
        count += 1;
    }
    format!("[{}{}]", count, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_decode_two_vehicles() {
        let batch =
            decode_batch(b"[2 C1 1.0 2.0 90.0 0.1 0.0 0.0 C2 3.0 4.0 180.0 0.0 0.1 0.0]").unwrap();
        let entries: Vec<_> = batch.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, VehicleId::car(1));
        assert_relative_eq!(entries[0].pose.yaw, 90.0);
        assert_relative_eq!(entries[0].velocity.vx, 0.1);
        assert_eq!(entries[1].id, VehicleId::car(2));
        assert_relative_eq!(entries[1].pose.x, 3.0);
        assert_relative_eq!(entries[1].velocity.vy, 0.1);
    }

    #[test]
    fn test_variable_width_fields() {
        let batch = decode_batch(b"[1   C4 -12.375 0 359.95 -0.25 1e-3 0.000]").unwrap();
        let entry = batch.iter().next().unwrap();
        assert_relative_eq!(entry.pose.x, -12.375);
        assert_relative_eq!(entry.velocity.vy, 0.001);
    }

    #[test]
    fn test_bad_tuple_stops_without_partial_record() {
        let batch =
            decode_batch(b"[3 C1 1.0 2.0 90.0 0.1 0.0 0.0 C2 3.0 oops 180.0 0.0 0.1 0.0 C3 1 1 1 1 1 1]")
                .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.iter().next().unwrap().id, VehicleId::car(1));

        // Count promises more tuples than present
        let batch = decode_batch(b"[2 C1 1.0 2.0 90.0 0.1 0.0 0.0]").unwrap();
        assert_eq!(batch.len(), 1);

        // Short tuple ended by the bracket
        assert!(decode_batch(b"[1 C1 1.0 2.0 90.0]").is_none());
    }

    #[test]
    fn test_header_rejections() {
        assert!(decode_batch(b"[0]").is_none());
        assert!(decode_batch(b"[-1 C1 0 0 0 0 0 0]").is_none());
        assert!(decode_batch(b"[11 C1 0 0 0 0 0 0]").is_none());
        assert!(decode_batch(b"[1 C1 0 0 0 0 0 0").is_none());
        assert!(decode_batch(b"").is_none());
    }

    #[test]
    fn test_heading_normalized_on_decode() {
        let batch = decode_batch(b"[1 C2 0 0 -90 0 0 0]").unwrap();
        assert_relative_eq!(batch.iter().next().unwrap().pose.yaw, 270.0);
    }

    #[test]
    fn test_encode_compact_form() {
        let entry = PeerEntry {
            id: VehicleId::car(3),
            pose: Pose2D::new(1.0, -2.5, 45.0),
            velocity: BodyVelocity {
                vx: 0.1,
                vy: 0.0,
                vz: 0.0,
            },
        };
        let wire = encode_batch([&entry]);
        assert_eq!(wire, "[1 C3 1.00 -2.50 45.0 0.100 0.000 0.000]");
        assert_eq!(decode_batch(wire.as_bytes()).unwrap().len(), 1);
    }
}
