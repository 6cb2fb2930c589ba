use serde::Serialize;

use crate::error::{Error, Result};
use crate::operation::{Command, OperationRequest, OperationResponse, RequestKind};
use crate::timestamp::{LocalTime, Rfc3339Time};
use crate::Record;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct AuthRequest {
    #[serde(rename = "aluno_id")]
    pub student_id: String,
    /// Not every protocol carries it, so a decoded request may lack it.
    #[wire(omittable)]
    pub timestamp: Rfc3339Time,
}

impl AuthRequest {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            timestamp: Rfc3339Time::now(),
        }
    }
}

impl OperationRequest for AuthRequest {
    const COMMAND: Command = Command::Auth;

    fn kind(&self) -> RequestKind<'_> {
        RequestKind::Auth {
            student_id: &self.student_id,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.student_id.trim().is_empty() {
            return Err(Error::validation("student id is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[wire(omittable)]
    #[serde(rename = "matricula")]
    pub enrollment: String,
    pub timestamp: LocalTime,
}

impl OperationResponse for AuthResponse {
    const COMMAND: Command = Command::Auth;
}

/// The token travels in the envelope, so the body is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Record)]
pub struct LogoutRequest;

impl OperationRequest for LogoutRequest {
    const COMMAND: Command = Command::Logout;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct LogoutResponse {
    #[wire(name = "msg")]
    #[serde(rename = "mensagem")]
    pub message: String,
    pub timestamp: LocalTime,
}

impl OperationResponse for LogoutResponse {
    const COMMAND: Command = Command::Logout;
}
