use thiserror::Error;

/// Errors that can occur in shellbridge
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Registries report absence of the launch target as a normal
    /// [`LaunchOutcome`](crate::LaunchOutcome); this variant is for
    /// embedders whose lookups treat absence as a fault.
    #[error("No launchable application matches '{0}'")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Battery subscription error: {0}")]
    Subscription(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for shellbridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        BridgeError::Config(err.to_string())
    }
}
