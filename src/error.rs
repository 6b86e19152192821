/// Error types shared by the monitor components
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Configuration values that cannot be used
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Config file present but not valid TOML for our layout
    #[error("Failed to parse config file {path}: {source}")]
    ConfigFile {
        path: String,
        source: toml::de::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Envelope body is not JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Event time that is neither ISO-8601 nor epoch seconds
    #[error("Unparseable event time: '{0}'")]
    Timestamp(String),

    #[error("Payload is not valid hex: {0}")]
    PayloadHex(#[from] hex::FromHexError),

    /// Payload shorter than the 8 interior data bytes
    #[error("Payload too short: {0} bytes, need 8")]
    PayloadLength(usize),

    /// Broker connection or subscription failure
    #[error("MQTT connection failed: {0}")]
    Connection(String),
}
