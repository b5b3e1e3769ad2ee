//! Heading PID shared by navigation and formation following

use crate::config::HeadingPidConfig;
use crate::utils::normalize_heading_error;

/// PID on heading error in degrees, output in normalized yaw rate `[-1, 1]`
///
/// The integral is clamped to `±1/ki` so the integral term alone can never
/// exceed full output.
#[derive(Debug, Clone)]
pub struct HeadingPid {
    kp: f32,
    ki: f32,
    kd: f32,
    integral: f32,
    last_error: f32,
}

impl HeadingPid {
    pub fn new(config: &HeadingPidConfig) -> Self {
        Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    /// One control step toward `target_yaw` (both in degrees)
    pub fn update(&mut self, current_yaw: f32, target_yaw: f32) -> f32 {
        let error = normalize_heading_error(target_yaw - current_yaw);
        let derivative = error - self.last_error;

        let integral_max = 1.0 / self.ki;
        self.integral = (self.integral + error).clamp(-integral_max, integral_max);
        self.last_error = error;

        (self.kp * error + self.ki * self.integral + self.kd * derivative).clamp(-1.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }
}
