//! Error types for the Talkwire client

use thiserror::Error;

/// Result type alias for Talkwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Talkwire client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture error
    #[error("audio error: {0}")]
    Audio(String),

    /// Push-to-talk input error
    #[error("button error: {0}")]
    Button(String),

    /// Backend discovery error
    #[error("resolve error: {0}")]
    Resolve(String),

    /// Network session error
    #[error("transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
