use serde::Serialize;

use crate::error::{Error, Result};
use crate::operation::{Command, OperationRequest, OperationResponse};
use crate::timestamp::LocalTime;
use crate::Record;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct EchoRequest {
    #[serde(rename = "mensagem")]
    pub message: String,
}

impl EchoRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl OperationRequest for EchoRequest {
    const COMMAND: Command = Command::Echo;

    fn validate(&self) -> Result<()> {
        if self.message.is_empty() {
            return Err(Error::validation("echo message must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct EchoResponse {
    #[serde(rename = "mensagem_original")]
    pub original_message: String,
    #[serde(rename = "mensagem_eco")]
    pub echo_message: String,
    #[serde(rename = "timestamp_servidor")]
    pub server_timestamp: LocalTime,
    #[serde(rename = "tamanho_mensagem")]
    pub message_size: i64,
    #[serde(rename = "hash_md5")]
    pub md5: String,
    pub timestamp: LocalTime,
}

impl OperationResponse for EchoResponse {
    const COMMAND: Command = Command::Echo;
}
