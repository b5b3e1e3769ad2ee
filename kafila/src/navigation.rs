//! Point-to-point navigation toward a commanded target

use crate::config::NavigationConfig;
use crate::core::types::{DriveCommand, NavigationTarget, Pose2D};
use crate::formation::HeadingPid;
use crate::utils::rotate;

/// Proportional approach to a world-frame target with heading hold
#[derive(Debug, Clone)]
pub struct Navigator {
    config: NavigationConfig,
    target: Option<NavigationTarget>,
    arrived: bool,
}

impl Navigator {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            target: None,
            arrived: false,
        }
    }

    /// Replace the active goal
    pub fn set_target(&mut self, target: NavigationTarget) {
        log::info!(
            "New navigation target ({:.2}, {:.2}) heading {:.1}",
            target.x,
            target.y,
            target.yaw
        );
        self.target = Some(target);
        self.arrived = false;
    }

    pub fn clear(&mut self) {
        self.target = None;
        self.arrived = false;
    }

    pub fn target(&self) -> Option<NavigationTarget> {
        self.target
    }

    pub fn has_arrived(&self) -> bool {
        self.arrived
    }

    /// Body-frame command for this tick; stop when there is no goal
    pub fn command(&mut self, pose: Pose2D, heading: &mut HeadingPid) -> DriveCommand {
        let Some(target) = self.target else {
            return DriveCommand::STOP;
        };

        let yaw_rate = heading.update(pose.yaw, target.yaw);
        let (ex, ey) = (target.x - pose.x, target.y - pose.y);
        let distance = ex.hypot(ey);

        if distance < self.config.arrival_tolerance || distance <= f32::EPSILON {
            if !self.arrived {
                log::info!("Navigation target reached, holding heading");
                self.arrived = true;
            }
            return DriveCommand::new(0.0, 0.0, yaw_rate);
        }
        self.arrived = false;

        let mut speed = (self.config.position_gain * distance).min(self.config.max_speed);
        if distance < self.config.slowdown_radius {
            speed *= distance / self.config.slowdown_radius;
        }

        let scale = speed / distance;
        let (vx, vy) = rotate(ex * scale, ey * scale, -pose.yaw_rad());
        DriveCommand::new(vx, vy, yaw_rate)
    }
}
