//! Formation role and offset configuration

use crate::fleet::VehicleId;
use crate::utils::normalize_heading_error;

/// Formation role of the local vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormationMode {
    #[default]
    None,
    Leader,
    Follower,
}

/// Desired pose relative to the leader, in the leader's frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormationOffset {
    /// Meters ahead of the leader
    pub dx: f32,
    /// Meters to the leader's left
    pub dy: f32,
    /// Heading offset in degrees, `[-180, 180]`
    pub dyaw: f32,
}

impl FormationOffset {
    pub fn new(dx: f32, dy: f32, dyaw: f32) -> Self {
        Self {
            dx,
            dy,
            dyaw: normalize_heading_error(dyaw),
        }
    }
}

/// Formation configuration written by inbound commands
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormationState {
    pub mode: FormationMode,
    pub leader_id: Option<VehicleId>,
    pub offset: FormationOffset,
}

impl FormationState {
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    pub fn lead(&mut self) {
        *self = Self {
            mode: FormationMode::Leader,
            ..Self::default()
        };
    }

    pub fn follow(&mut self, leader: VehicleId, offset: FormationOffset) {
        *self = Self {
            mode: FormationMode::Follower,
            leader_id: Some(leader),
            offset,
        };
    }

    /// Change the offset while following `leader`
    ///
    /// Ignored (returns `false`) unless currently following that exact leader.
    pub fn update_offset(&mut self, leader: VehicleId, offset: FormationOffset) -> bool {
        if self.mode == FormationMode::Follower && self.leader_id == Some(leader) {
            self.offset = offset;
            true
        } else {
            false
        }
    }
}
