//! Error types for VahanaIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// VahanaIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not bind the command socket (fatal at startup)
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind
        addr: String,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// GPIO backend failure
    #[error("GPIO error on pin {pin}: {source}")]
    Gpio {
        /// Pin number the write targeted
        pin: u8,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    /// Unknown GPIO backend name in config
    #[error("Unknown GPIO backend: {0}")]
    UnknownBackend(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
