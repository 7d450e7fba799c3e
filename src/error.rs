use thiserror::Error;

/// Client-wide error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Key checksum mismatch: declared {declared:#010x}, computed {computed:#010x}")]
    KeyIntegrity { declared: u32, computed: u32 },

    #[error("Invalid public key: {0}")]
    KeyFormat(String),

    #[error("Plaintext of {len} bytes exceeds RSA-OAEP capacity of {capacity} bytes")]
    EncryptionCapacity { len: usize, capacity: usize },

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server rejected request with status {status}: {body}")]
    ServerRejected { status: u16, body: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ClientError {
    pub fn key_format<S: Into<String>>(msg: S) -> Self {
        Self::KeyFormat(msg.into())
    }

    pub fn rejected<S: Into<String>>(status: u16, body: S) -> Self {
        Self::ServerRejected {
            status,
            body: body.into(),
        }
    }

    /// Whether a retry policy may attempt the operation again.
    ///
    /// Only connection-level failures and 5xx rejections qualify. Key and
    /// encryption failures are deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::ServerRejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using ClientError
pub type ClientResult<T> = Result<T, ClientError>;
