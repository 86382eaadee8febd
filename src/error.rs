/// Error taxonomy for the sensor node
///
/// Variants are split into recoverable conditions, which are contained inside
/// one loop iteration, and fatal conditions, which stop the node before the
/// sampling loop starts.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("No I2C device responded on the bus")]
    DeviceNotFound,

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl NodeError {
    /// Fatal errors mean the node cannot produce valid requests at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, NodeError::InvalidKey(_) | NodeError::Config(_))
    }

    /// Whether a failed submission is worth another attempt
    ///
    /// Transport failures, throttling and server errors are retried. Other
    /// client errors would be rejected again with the same payload.
    pub fn is_retryable(&self) -> bool {
        match self {
            NodeError::Http(_) => true,
            NodeError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for NodeError {
    fn from(e: reqwest::Error) -> Self {
        NodeError::Http(e.to_string())
    }
}
