//! Outbound status report

use crate::core::types::VehicleStatus;
use crate::fleet::VehicleId;

/// `<id>:<x>,<y>,<yaw>,<voltage>,<vx>,<vy>,<vz>`
pub fn encode_status(id: VehicleId, status: &VehicleStatus) -> String {
    format!(
        "{}:{:.2},{:.2},{:.1},{:.1},{:.3},{:.3},{:.3}",
        id,
        status.pose.x,
        status.pose.y,
        status.pose.yaw,
        status.voltage,
        status.velocity.vx,
        status.velocity.vy,
        status.velocity.vz
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BodyVelocity, Pose2D};

    #[test]
    fn test_status_format() {
        let status = VehicleStatus {
            pose: Pose2D::new(1.234, -0.5, 90.04),
            velocity: BodyVelocity {
                vx: 0.1,
                vy: -0.02,
                vz: 0.0,
            },
            voltage: 12.26,
        };
        assert_eq!(
            encode_status(VehicleId::car(2), &status),
            "CAR2:1.23,-0.50,90.0,12.3,0.100,-0.020,0.000"
        );
    }
}
