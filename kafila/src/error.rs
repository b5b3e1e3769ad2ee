//! Error types for Kafila

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Kafila error types
///
/// Link-layer trouble is not reported through this type: modem exchanges are
/// classified into [`crate::modem::ModemResponse`] and drive the recovery
/// state machine instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A worker thread panicked before it could be joined
    #[error("Worker thread panicked: {0}")]
    ThreadPanic(&'static str),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
