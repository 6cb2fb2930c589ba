use thiserror::Error;
use triprotocol_core::ServiceError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} timeout exceeded")]
    Timeout(&'static str),

    #[error("Connection closed before a complete response arrived")]
    ConnectionClosed,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Corrupted data: {0}")]
    Corrupted(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protobuf error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error(transparent)]
    Model(#[from] triprotocol_core::Error),

    #[error("Server error: {0}")]
    Service(ServiceError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Server-reported failure, if that is what this is.
    pub fn service(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
