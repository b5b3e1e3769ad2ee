//! Leader/follower control law
//!
//! Followers blend two strategies. Velocity-follow feeds the leader's
//! velocity forward with a bounded position correction; it is used while the
//! leader moves and the follower is close to its slot, or lagging along the
//! leader's direction of travel. Position-correct is a PD loop on the slot
//! error, used otherwise.

use super::motion::MotionDetector;
use super::pid::HeadingPid;
use super::state::{FormationMode, FormationOffset};
use crate::config::{FormationConfig, NavigationConfig};
use crate::core::types::{DriveCommand, Pose2D};
use crate::fleet::{Fleet, PeerRecord, VehicleId};
use crate::navigation::Navigator;
use crate::utils::{clamp_magnitude, normalize_angle, normalize_heading, normalize_heading_error, rotate};
use std::f32::consts::FRAC_PI_4;

/// Radius inside which position-correct decelerates
const DECEL_RADIUS: f32 = 0.5;
/// Fraction of the PD output kept at zero distance
const DECEL_FLOOR: f32 = 0.2;
/// Velocity-follow correction gain: base plus slope times the excess over
/// tolerance, saturating beyond 1m
const CORRECTION_BASE_GAIN: f32 = 0.05;
const CORRECTION_SLOPE: f32 = 0.1;
const CORRECTION_MAX_EXTRA: f32 = 0.15;

/// Follower strategy chosen for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowMode {
    VelocityFollow,
    PositionCorrect,
}

/// Choose the follower strategy
///
/// `error` is the world-frame vector from the follower to its slot and
/// `leader_course` the world-frame direction of the leader's velocity in
/// radians.
pub fn select_mode(
    tolerance: f32,
    leader_moving: bool,
    distance: f32,
    error: (f32, f32),
    leader_course: f32,
) -> FollowMode {
    if !leader_moving {
        return FollowMode::PositionCorrect;
    }
    if distance < 2.0 * tolerance {
        return FollowMode::VelocityFollow;
    }
    if distance < 3.0 * tolerance {
        let error_angle = error.1.atan2(error.0);
        if normalize_angle(leader_course - error_angle).abs() < FRAC_PI_4 {
            return FollowMode::VelocityFollow;
        }
    }
    FollowMode::PositionCorrect
}

/// Per-vehicle formation and navigation control
pub struct FormationController {
    config: FormationConfig,
    heading: HeadingPid,
    motion: MotionDetector,
    navigator: Navigator,
    prev_error: Option<(f32, f32)>,
    role: FormationMode,
    leader: Option<VehicleId>,
    last_mode: Option<FollowMode>,
}

impl FormationController {
    pub fn new(config: FormationConfig, navigation: NavigationConfig) -> Self {
        Self {
            heading: HeadingPid::new(&config.heading),
            motion: MotionDetector::new(
                config.motion_threshold,
                config.motion_window,
                config.stillness_debounce,
            ),
            navigator: Navigator::new(navigation),
            prev_error: None,
            role: FormationMode::None,
            leader: None,
            last_mode: None,
            config,
        }
    }

    /// Strategy used on the last follower tick, if it found its leader
    pub fn last_mode(&self) -> Option<FollowMode> {
        self.last_mode
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Compute this tick's drive command
    pub fn tick(&mut self, fleet: &mut Fleet, pose: Pose2D, now_ms: u64) -> DriveCommand {
        if let Some(target) = fleet.take_new_target() {
            self.navigator.set_target(target);
        }

        let state = fleet.formation;
        if state.mode != self.role {
            log::info!("Formation role {:?} -> {:?}", self.role, state.mode);
            self.role = state.mode;
            self.reset_follower();
            self.heading.reset();
        } else if state.leader_id != self.leader {
            log::info!("Following {:?} instead of {:?}", state.leader_id, self.leader);
            self.reset_follower();
        }
        self.leader = state.leader_id;

        match state.mode {
            FormationMode::None | FormationMode::Leader => {
                self.navigator.command(pose, &mut self.heading)
            }
            FormationMode::Follower => {
                let leader = state.leader_id.and_then(|id| fleet.peers.lookup(id)).copied();
                self.follow(leader.as_ref(), state.offset, pose, now_ms)
            }
        }
    }

    /// Follower step against a leader record
    pub fn follow(
        &mut self,
        leader: Option<&PeerRecord>,
        offset: FormationOffset,
        pose: Pose2D,
        now_ms: u64,
    ) -> DriveCommand {
        let Some(leader) = leader.filter(|l| l.age_ms(now_ms) <= self.config.leader_timeout_ms)
        else {
            if self.last_mode.is_some() {
                log::warn!("Leader lost or stale, stopping");
            }
            self.reset_follower();
            return DriveCommand::STOP;
        };

        let deadband = |v: f32| {
            if v.abs() < self.config.velocity_deadband { 0.0 } else { v }
        };
        let (lvx, lvy) = (deadband(leader.velocity.vx), deadband(leader.velocity.vy));
        let moving = self.motion.update(lvx, lvy);

        // Slot pose in the world frame
        let (ox, oy) = rotate(offset.dx, offset.dy, leader.pose.yaw_rad());
        let (target_x, target_y) = (leader.pose.x + ox, leader.pose.y + oy);
        let target_yaw = normalize_heading(leader.pose.yaw + offset.dyaw);

        let error = (target_x - pose.x, target_y - pose.y);
        let distance = error.0.hypot(error.1);
        let leader_course = leader.pose.yaw_rad() + lvy.atan2(lvx);

        let mode = select_mode(self.config.tolerance, moving, distance, error, leader_course);
        if self.last_mode != Some(mode) {
            log::debug!("Follower strategy {:?} (distance {:.3})", mode, distance);
            self.last_mode = Some(mode);
        }

        let (vx, vy, yaw_gain) = match mode {
            FollowMode::VelocityFollow => {
                let (vx, vy) = self.velocity_follow(leader, (lvx, lvy), pose, error, distance);
                (vx, vy, self.config.velocity_follow_heading_gain)
            }
            FollowMode::PositionCorrect => {
                let (vx, vy) = self.position_correct(pose, error, distance);
                (vx, vy, self.config.position_correct_heading_gain)
            }
        };
        self.prev_error = Some(error);

        let (vx, vy) = clamp_magnitude(vx, vy, self.config.max_speed);
        let yaw_rate = self.heading.update(pose.yaw, target_yaw) * yaw_gain;
        DriveCommand::new(vx, vy, yaw_rate)
    }

    fn velocity_follow(
        &self,
        leader: &PeerRecord,
        leader_velocity: (f32, f32),
        pose: Pose2D,
        error: (f32, f32),
        distance: f32,
    ) -> (f32, f32) {
        let gain = self.config.velocity_gain;
        let (mut vx, mut vy) = (leader_velocity.0 * gain, leader_velocity.1 * gain);

        // Leader body frame into ours
        let yaw_diff = normalize_heading_error(leader.pose.yaw - pose.yaw);
        if yaw_diff.abs() > self.config.heading_align_threshold_deg {
            (vx, vy) = rotate(vx, vy, yaw_diff.to_radians());
        }

        let tolerance = self.config.tolerance;
        if distance > tolerance {
            let extra = if distance < 1.0 {
                (distance - tolerance) * CORRECTION_SLOPE
            } else {
                CORRECTION_MAX_EXTRA
            };
            let magnitude = (CORRECTION_BASE_GAIN + extra) * distance;
            let bearing = error.1.atan2(error.0) - pose.yaw_rad();
            let (cx, cy) = clamp_magnitude(
                magnitude * bearing.cos(),
                magnitude * bearing.sin(),
                self.config.max_speed * self.config.correction_share,
            );
            vx += cx;
            vy += cy;
        }
        (vx, vy)
    }

    fn position_correct(&self, pose: Pose2D, error: (f32, f32), distance: f32) -> (f32, f32) {
        let (dx, dy) = match self.prev_error {
            Some((px, py)) => (error.0 - px, error.1 - py),
            None => (0.0, 0.0),
        };
        let mut wx = self.config.kp * error.0 + self.config.kd * dx;
        let mut wy = self.config.kp * error.1 + self.config.kd * dy;

        if distance < DECEL_RADIUS {
            let factor = DECEL_FLOOR + (1.0 - DECEL_FLOOR) * (distance / DECEL_RADIUS);
            wx *= factor;
            wy *= factor;
        }
        rotate(wx, wy, -pose.yaw_rad())
    }

    /// Derivative and motion state reset; called on leader loss, leader
    /// change and role change
    fn reset_follower(&mut self) {
        self.prev_error = None;
        self.motion.reset();
        self.last_mode = None;
    }
}
