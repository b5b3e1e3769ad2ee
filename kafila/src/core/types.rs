//! Core data types for poses, velocities and commands.
//!
//! Units: meters, meters per second, degrees for headings. Body-frame
//! vectors use X forward and Y to the left.

use crate::utils::normalize_heading;

/// World-frame pose of a vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose2D {
    pub x: f32,
    pub y: f32,
    /// Heading in degrees, `[0, 360)`
    pub yaw: f32,
}

impl Pose2D {
    /// Create a pose, normalizing the heading
    pub fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self {
            x,
            y,
            yaw: normalize_heading(yaw),
        }
    }

    /// Heading in radians
    #[inline]
    pub fn yaw_rad(&self) -> f32 {
        self.yaw.to_radians()
    }
}

/// Body-frame velocity estimate (vx, vy in m/s, vz yaw rate)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyVelocity {
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
}

/// Body-frame drive command issued to the chassis
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand {
    pub vx: f32,
    pub vy: f32,
    pub yaw_rate: f32,
}

impl DriveCommand {
    pub const STOP: DriveCommand = DriveCommand {
        vx: 0.0,
        vy: 0.0,
        yaw_rate: 0.0,
    };

    pub fn new(vx: f32, vy: f32, yaw_rate: f32) -> Self {
        Self { vx, vy, yaw_rate }
    }

    /// Planar speed of the command
    #[inline]
    pub fn speed(&self) -> f32 {
        self.vx.hypot(self.vy)
    }

    #[inline]
    pub fn is_stop(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.yaw_rate == 0.0
    }
}

/// Snapshot of the local vehicle pushed to the base station
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleStatus {
    pub pose: Pose2D,
    pub velocity: BodyVelocity,
    pub voltage: f32,
}

/// Navigation goal received through a control command
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavigationTarget {
    pub x: f32,
    pub y: f32,
    /// Heading in degrees, `[0, 360)`
    pub yaw: f32,
}

impl NavigationTarget {
    pub fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self {
            x,
            y,
            yaw: normalize_heading(yaw),
        }
    }
}
