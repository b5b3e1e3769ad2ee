//! Kinematic simulated vehicle
//!
//! Integrates body-frame velocity commands into a world pose so the daemon
//! can run end to end without drive hardware.

use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::core::chassis::Chassis;
use crate::core::types::{BodyVelocity, DriveCommand, Pose2D};
use crate::utils::{normalize_heading, rotate};
use std::sync::Arc;

/// Holonomic point vehicle following commands exactly
pub struct SimulatedChassis {
    clock: Arc<dyn Clock>,
    pose: Pose2D,
    command: DriveCommand,
    /// Yaw rate in degrees per second at a normalized command of 1.0
    max_yaw_rate_dps: f32,
    voltage: f32,
    last_ms: u64,
}

impl SimulatedChassis {
    pub fn new(config: &SimulationConfig, clock: Arc<dyn Clock>) -> Self {
        let last_ms = clock.now_ms();
        Self {
            clock,
            pose: Pose2D::new(config.start_x, config.start_y, config.start_yaw),
            command: DriveCommand::STOP,
            max_yaw_rate_dps: config.max_yaw_rate_dps,
            voltage: config.battery_voltage,
            last_ms,
        }
    }

    /// Advance the pose by `dt` seconds under the current command
    pub fn step(&mut self, dt: f32) {
        let (dx, dy) = rotate(self.command.vx, self.command.vy, self.pose.yaw_rad());
        self.pose = Pose2D::new(
            self.pose.x + dx * dt,
            self.pose.y + dy * dt,
            normalize_heading(self.pose.yaw + self.yaw_rate_dps() * dt),
        );
    }

    fn yaw_rate_dps(&self) -> f32 {
        self.command.yaw_rate.clamp(-1.0, 1.0) * self.max_yaw_rate_dps
    }
}

impl Chassis for SimulatedChassis {
    fn pose(&self) -> Pose2D {
        self.pose
    }

    fn velocity(&self) -> BodyVelocity {
        BodyVelocity {
            vx: self.command.vx,
            vy: self.command.vy,
            vz: self.command.yaw_rate,
        }
    }

    fn battery_voltage(&self) -> f32 {
        self.voltage
    }

    fn drive(&mut self, cmd: DriveCommand) {
        self.command = cmd;
    }

    fn poll(&mut self) {
        let now = self.clock.now_ms();
        let dt = now.saturating_sub(self.last_ms) as f32 / 1000.0;
        self.last_ms = now;
        if dt > 0.0 {
            self.step(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use approx::assert_relative_eq;

    fn chassis(yaw: f32) -> (Arc<ManualClock>, SimulatedChassis) {
        let clock = Arc::new(ManualClock::new(0));
        let config = SimulationConfig {
            start_yaw: yaw,
            ..SimulationConfig::default()
        };
        let sim = SimulatedChassis::new(&config, clock.clone());
        (clock, sim)
    }

    #[test]
    fn test_body_frame_motion() {
        let (clock, mut sim) = chassis(90.0);
        sim.drive(DriveCommand::new(0.2, 0.0, 0.0));
        clock.advance(1000);
        sim.poll();

        // Facing +Y, forward motion moves along world Y
        assert_relative_eq!(sim.pose().x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(sim.pose().y, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_yaw_rate_scaled_and_wrapped() {
        let (_clock, mut sim) = chassis(350.0);
        sim.drive(DriveCommand::new(0.0, 0.0, 0.5));
        sim.step(0.5);
        // 0.5 * 90 dps * 0.5 s = 22.5 degrees
        assert_relative_eq!(sim.pose().yaw, 12.5, epsilon = 1e-3);
    }

    #[test]
    fn test_stop_holds_pose() {
        let (clock, mut sim) = chassis(0.0);
        sim.drive(DriveCommand::STOP);
        clock.advance(5000);
        sim.poll();
        assert_eq!(sim.pose(), Pose2D::new(0.0, 0.0, 0.0));
        assert_eq!(sim.battery_voltage(), 12.0);
    }
}
