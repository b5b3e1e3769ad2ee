//! Formation control: roles, leader motion detection and the follower law

mod controller;
pub mod motion;
mod pid;
mod state;

pub use controller::{FollowMode, FormationController, select_mode};
pub use motion::MotionDetector;
pub use pid::HeadingPid;
pub use state::{FormationMode, FormationOffset, FormationState};
