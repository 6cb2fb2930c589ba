use serde::Serialize;

use crate::error::{Error, Result};
use crate::operation::{Command, OperationRequest, OperationResponse};
use crate::timestamp::LocalTime;
use crate::Record;

/// Largest batch a server accepts in one `soma` call.
pub const MAX_SUM_NUMBERS: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct SumRequest {
    #[serde(rename = "numeros")]
    pub numbers: Vec<i64>,
}

impl SumRequest {
    pub fn new(numbers: Vec<i64>) -> Self {
        Self { numbers }
    }
}

impl OperationRequest for SumRequest {
    const COMMAND: Command = Command::Sum;

    fn validate(&self) -> Result<()> {
        match self.numbers.len() {
            0 => Err(Error::validation("at least one number is required")),
            n if n > MAX_SUM_NUMBERS => Err(Error::validation(format!(
                "at most {MAX_SUM_NUMBERS} numbers are accepted, got {n}"
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct SumResponse {
    #[serde(rename = "numeros_originais")]
    pub original_numbers: Vec<f64>,
    #[serde(rename = "soma")]
    pub sum: f64,
    #[serde(rename = "media")]
    pub mean: f64,
    #[serde(rename = "maximo")]
    pub maximum: f64,
    #[serde(rename = "minimo")]
    pub minimum: f64,
    #[serde(rename = "quantidade")]
    pub count: i64,
    #[serde(rename = "timestamp_calculo")]
    pub calculated_at: LocalTime,
    pub timestamp: LocalTime,
}

impl OperationResponse for SumResponse {
    const COMMAND: Command = Command::Sum;
}
