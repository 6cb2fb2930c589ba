use serde::Serialize;

use crate::operation::{Command, OperationRequest, OperationResponse};
use crate::timestamp::{LocalTime, UnixTime};
use crate::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Record)]
pub struct TimestampRequest;

impl OperationRequest for TimestampRequest {
    const COMMAND: Command = Command::Timestamp;
}

/// The server clock broken down the ways it reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct TimestampResponse {
    #[serde(rename = "timestamp_unix")]
    pub unix: UnixTime,
    #[serde(rename = "timestamp_iso")]
    pub iso: LocalTime,
    #[serde(rename = "timestamp_formatado")]
    pub formatted: String,
    #[serde(rename = "ano")]
    pub year: i64,
    #[serde(rename = "mes")]
    pub month: i64,
    #[serde(rename = "dia")]
    pub day: i64,
    #[serde(rename = "hora")]
    pub hour: i64,
    #[serde(rename = "minuto")]
    pub minute: i64,
    #[serde(rename = "segundo")]
    pub second: i64,
    #[serde(rename = "microsegundo")]
    pub microsecond: i64,
    pub timestamp: LocalTime,
}

impl OperationResponse for TimestampResponse {
    const COMMAND: Command = Command::Timestamp;
}
