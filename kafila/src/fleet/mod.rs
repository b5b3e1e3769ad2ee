//! Fleet state shared between the link loop and the formation loop
//!
//! The dispatcher is the only writer of peer records, the topology and the
//! formation configuration; the formation loop only reads them and consumes
//! navigation targets.

mod ids;
mod peers;
mod topology;

pub use ids::{FLEET_SIZE, VehicleId};
pub use peers::{PEER_CAPACITY, PeerRecord, PeerStore};
pub use topology::{TopologyFilter, TopologyMatrix};

use crate::core::types::NavigationTarget;
use crate::formation::FormationState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fleet state handle shared across threads
pub type SharedFleet = Arc<Mutex<Fleet>>;

/// Everything the local vehicle knows about the fleet
#[derive(Debug, Clone)]
pub struct Fleet {
    local_id: Option<VehicleId>,
    pub peers: PeerStore,
    pub topology: TopologyFilter,
    pub formation: FormationState,
    target: Option<NavigationTarget>,
    new_target: bool,
}

impl Fleet {
    pub fn new(peer_timeout_ms: u64) -> Self {
        let mut fleet = Self {
            local_id: None,
            peers: PeerStore::new(peer_timeout_ms),
            topology: TopologyFilter::new(),
            formation: FormationState::default(),
            target: None,
            new_target: false,
        };
        fleet.reset_tables();
        fleet
    }

    pub fn shared(peer_timeout_ms: u64) -> SharedFleet {
        Arc::new(Mutex::new(Self::new(peer_timeout_ms)))
    }

    /// Re-seed the peer roster and restore a fully connected, disabled topology
    pub fn reset_tables(&mut self) {
        self.peers.reset(&VehicleId::roster());
        self.topology = TopologyFilter::new();
    }

    pub fn local_id(&self) -> Option<VehicleId> {
        self.local_id
    }

    pub fn set_local_id(&mut self, id: VehicleId) {
        self.local_id = Some(id);
    }

    /// Whether `id` names this vehicle
    pub fn is_local(&self, id: VehicleId) -> bool {
        self.local_id == Some(id)
    }

    /// Store a navigation goal and raise the new-target flag
    pub fn set_target(&mut self, target: NavigationTarget) {
        self.target = Some(target);
        self.new_target = true;
    }

    /// Current navigation goal
    pub fn target(&self) -> Option<NavigationTarget> {
        self.target
    }

    /// Goal received since the last call, clearing the flag
    pub fn take_new_target(&mut self) -> Option<NavigationTarget> {
        if std::mem::take(&mut self.new_target) {
            self.target
        } else {
            None
        }
    }
}
