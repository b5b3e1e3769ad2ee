//! Bounded table of last-known peer states

use super::ids::VehicleId;
use crate::core::types::{BodyVelocity, Pose2D};

/// Maximum number of tracked peers
pub const PEER_CAPACITY: usize = 10;

/// Last broadcast state of one peer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerRecord {
    pub id: VehicleId,
    pub pose: Pose2D,
    pub velocity: BodyVelocity,
    pub last_update_ms: u64,
    pub valid: bool,
}

impl PeerRecord {
    /// Known but offline placeholder
    pub fn offline(id: VehicleId) -> Self {
        Self {
            id,
            pose: Pose2D::default(),
            velocity: BodyVelocity::default(),
            last_update_ms: 0,
            valid: false,
        }
    }

    #[inline]
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_update_ms)
    }
}

/// Fixed-capacity peer table keyed by vehicle id
///
/// Records are only invalidated by [`PeerStore::evict`] or dropped by
/// [`PeerStore::reset`]; a valid record is never displaced by a newcomer.
#[derive(Debug, Clone)]
pub struct PeerStore {
    slots: [Option<PeerRecord>; PEER_CAPACITY],
    timeout_ms: u64,
}

impl PeerStore {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            slots: [None; PEER_CAPACITY],
            timeout_ms,
        }
    }

    /// Clear the table and pre-seed `roster` as known, offline peers
    pub fn reset(&mut self, roster: &[VehicleId]) {
        self.slots = [None; PEER_CAPACITY];
        for (slot, id) in self.slots.iter_mut().zip(roster) {
            *slot = Some(PeerRecord::offline(*id));
        }
    }

    /// Record a broadcast from `id`
    ///
    /// Overwrites the matching valid record, or claims the first free slot.
    /// Returns `false` when the table is full.
    pub fn upsert(
        &mut self,
        id: VehicleId,
        pose: Pose2D,
        velocity: BodyVelocity,
        now_ms: u64,
    ) -> bool {
        let record = PeerRecord {
            id,
            pose,
            velocity,
            last_update_ms: now_ms,
            valid: true,
        };

        let existing = self
            .slots
            .iter()
            .position(|s| matches!(s, Some(r) if r.valid && r.id == id));
        let free = || {
            self.slots
                .iter()
                .position(|s| !matches!(s, Some(r) if r.valid))
        };

        match existing.or_else(free) {
            Some(i) => {
                if existing.is_none() {
                    log::debug!("Peer {} came online", id);
                }
                self.slots[i] = Some(record);
                true
            }
            None => {
                log::debug!("Peer table full, dropping update from {}", id);
                false
            }
        }
    }

    /// Invalidate records older than the timeout; returns how many went offline
    pub fn evict(&mut self, now_ms: u64) -> usize {
        let mut removed = 0;
        for record in self.slots.iter_mut().flatten() {
            if record.valid && record.age_ms(now_ms) > self.timeout_ms {
                log::info!("Peer {} offline (no update for {}ms)", record.id, record.age_ms(now_ms));
                record.valid = false;
                removed += 1;
            }
        }
        removed
    }

    /// Valid record for `id`
    pub fn lookup(&self, id: VehicleId) -> Option<&PeerRecord> {
        self.slots
            .iter()
            .flatten()
            .find(|r| r.valid && r.id == id)
    }

    /// All occupied slots, valid or not
    pub fn iter(&self) -> impl Iterator<Item = &PeerRecord> {
        self.slots.iter().flatten()
    }

    pub fn valid_count(&self) -> usize {
        self.iter().filter(|r| r.valid).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(x: f32) -> Pose2D {
        Pose2D::new(x, 0.0, 0.0)
    }

    #[test]
    fn test_reset_seeds_offline_roster() {
        let mut store = PeerStore::new(30_000);
        store.reset(&VehicleId::roster());
        assert_eq!(store.iter().count(), 4);
        assert_eq!(store.valid_count(), 0);
        assert!(store.lookup(VehicleId::car(1)).is_none());
    }

    #[test]
    fn test_upsert_overwrites_matching_record() {
        let mut store = PeerStore::new(30_000);
        store.reset(&VehicleId::roster());
        assert!(store.upsert(VehicleId::car(2), pose(1.0), BodyVelocity::default(), 100));
        assert!(store.upsert(VehicleId::car(2), pose(2.0), BodyVelocity::default(), 200));

        let record = store.lookup(VehicleId::car(2)).unwrap();
        assert_eq!(record.pose.x, 2.0);
        assert_eq!(record.last_update_ms, 200);
        assert_eq!(store.valid_count(), 1);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let mut store = PeerStore::new(30_000);
        for n in 1..=PEER_CAPACITY as u8 {
            assert!(store.upsert(VehicleId::car(n), pose(0.0), BodyVelocity::default(), 0));
        }
        assert!(!store.upsert(VehicleId::car(99), pose(0.0), BodyVelocity::default(), 0));
        assert_eq!(store.iter().count(), PEER_CAPACITY);
    }

    #[test]
    fn test_eviction_boundary() {
        let mut store = PeerStore::new(30_000);
        store.upsert(VehicleId::car(1), pose(0.0), BodyVelocity::default(), 1_000);

        assert_eq!(store.evict(31_000), 0);
        assert!(store.lookup(VehicleId::car(1)).is_some());

        assert_eq!(store.evict(31_001), 1);
        assert!(store.lookup(VehicleId::car(1)).is_none());

        // Evicted slot is reused
        assert!(store.upsert(VehicleId::car(3), pose(0.0), BodyVelocity::default(), 40_000));
        assert_eq!(store.iter().count(), 1);
    }
}
