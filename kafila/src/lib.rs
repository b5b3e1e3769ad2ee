//! Kafila - fleet coordination for small ground vehicles
//!
//! Keeps a radio link to peers and a base station alive through an
//! unreliable AT-command Wi-Fi modem, exchanges compact position/velocity
//! broadcasts over it, and drives followers in formation behind a leader.
//!
//! ## Layers
//!
//! - [`modem`] / [`transport`]: line commands over the modem's serial port
//! - [`link`]: supervision state machine with escalating recovery
//! - [`protocol`] / [`dispatch`]: frame extraction, message decoding, routing
//! - [`fleet`]: peer table, topology filter and formation configuration
//! - [`formation`] / [`navigation`]: control laws producing drive commands
//! - [`runtime`]: the link and formation loops of the daemon

pub mod clock;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod fleet;
pub mod formation;
pub mod link;
pub mod modem;
pub mod navigation;
pub mod protocol;
pub mod runtime;
pub mod sim;
pub mod transport;
pub mod utils;

pub use config::AppConfig;
pub use error::{Error, Result};
