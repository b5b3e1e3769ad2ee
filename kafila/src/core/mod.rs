//! Core abstractions shared by the link and control loops.
//!
//! - [`chassis::Chassis`]: Trait to implement for the vehicle's drive and pose hardware
//! - [`types`]: Poses, velocities, drive commands and status reports

pub mod chassis;
pub mod types;
