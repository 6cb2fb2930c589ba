use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("literal syntax error at byte {position}: {reason}")]
    Literal { position: usize, reason: String },

    #[error("cannot bind field `{field}`: {reason}")]
    Bind { field: String, reason: String },

    #[error("property `{0}` not found")]
    MissingField(String),

    #[error("invalid timestamp `{value}`: {reason}")]
    Timestamp { value: String, reason: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn mismatch(expected: &str, found: &str) -> Self {
        Self::Custom(format!("expected {expected}, found {found}"))
    }

    /// Attributes the error to `field`, prefixing the path of nested fields.
    pub(crate) fn in_field(self, field: &str) -> Self {
        match self {
            Self::Bind {
                field: inner,
                reason,
            } => Self::Bind {
                field: format!("{field}.{inner}"),
                reason,
            },
            Self::MissingField(inner) => Self::MissingField(format!("{field}.{inner}")),
            other => Self::Bind {
                field: field.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
