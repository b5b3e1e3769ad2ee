//! Chassis trait definition

use crate::core::types::{BodyVelocity, DriveCommand, Pose2D};

/// Vehicle hardware abstraction consumed by the control loops
///
/// Attitude estimation, wheel speed loops and kinematics live behind this
/// trait. The formation loop reads pose and velocity from it and writes
/// body-frame velocity commands to it.
pub trait Chassis: Send {
    /// Current world pose (heading in degrees, `[0, 360)`)
    fn pose(&self) -> Pose2D;

    /// Current body-frame velocity estimate
    fn velocity(&self) -> BodyVelocity;

    /// Battery voltage in volts, reported in the status broadcast
    fn battery_voltage(&self) -> f32 {
        0.0
    }

    /// Apply a body-frame velocity command
    fn drive(&mut self, cmd: DriveCommand);

    /// Refresh internal estimates; called once at the start of every control tick
    fn poll(&mut self) {}
}
