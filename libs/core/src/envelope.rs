//! Protocol-independent envelopes around operation bodies.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope<Q> {
    pub token: Option<String>,
    pub body: Q,
}

impl<Q> RequestEnvelope<Q> {
    pub fn new(body: Q) -> Self {
        Self { token: None, body }
    }

    pub fn with_token(body: Q, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            body,
        }
    }

    /// The bearer token, treating an empty string as absent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    ClientError,
    ServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::ClientError => 422,
            Self::ServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::ClientError => "Unprocessable Entity",
            Self::ServerError => "Internal Server Error",
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// Domain-level failure reported by the server.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{status}: {message}")]
pub struct ServiceError {
    pub status: Status,
    pub message: String,
    pub details: BTreeMap<String, Value>,
}

impl ServiceError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_details(mut self, details: BTreeMap<String, Value>) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload<R> {
    Body(R),
    Error(ServiceError),
}

/// Status plus exactly one of body or error.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope<R> {
    status: Status,
    payload: Payload<R>,
}

impl<R> ResponseEnvelope<R> {
    pub fn success(body: R) -> Self {
        Self {
            status: Status::Ok,
            payload: Payload::Body(body),
        }
    }

    /// A failure never carries a success status.
    pub fn failure(mut error: ServiceError) -> Self {
        if error.status.is_success() {
            error.status = Status::ServerError;
        }
        Self {
            status: error.status,
            payload: Payload::Error(error),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn payload(&self) -> &Payload<R> {
        &self.payload
    }

    pub fn body(&self) -> Option<&R> {
        match &self.payload {
            Payload::Body(body) => Some(body),
            Payload::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ServiceError> {
        match &self.payload {
            Payload::Body(_) => None,
            Payload::Error(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<R, ServiceError> {
        match self.payload {
            Payload::Body(body) => Ok(body),
            Payload::Error(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_never_successful() {
        let envelope: ResponseEnvelope<()> =
            ResponseEnvelope::failure(ServiceError::new(Status::Ok, "boom"));
        assert_eq!(envelope.status(), Status::ServerError);
        assert!(envelope.body().is_none());
        assert_eq!(envelope.error().map(|e| e.message.as_str()), Some("boom"));
    }

    #[test]
    fn empty_token_is_absent() {
        let envelope = RequestEnvelope::with_token((), "");
        assert_eq!(envelope.token(), None);
    }

    #[test]
    fn service_error_display() {
        let err = ServiceError::new(Status::ClientError, "token inválido");
        assert_eq!(err.to_string(), "422 Unprocessable Entity: token inválido");
    }
}
