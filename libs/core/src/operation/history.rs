use serde::Serialize;

use crate::error::{Error, Result};
use crate::operation::{Command, OperationRequest, OperationResponse};
use crate::timestamp::LocalTime;
use crate::value::Value;
use crate::Record;

pub const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Record)]
pub struct HistoryRequest {
    #[serde(rename = "limite")]
    pub limit: i64,
}

impl HistoryRequest {
    pub fn new(limit: i64) -> Self {
        Self { limit }
    }
}

impl OperationRequest for HistoryRequest {
    const COMMAND: Command = Command::History;

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_HISTORY_LIMIT).contains(&self.limit) {
            return Err(Error::validation(format!(
                "history limit must be between 1 and {MAX_HISTORY_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct HistoryResponse {
    #[serde(rename = "aluno_id")]
    pub student_id: String,
    #[serde(rename = "limite_solicitado")]
    pub requested_limit: i64,
    #[serde(rename = "total_encontrado")]
    pub total_found: i64,
    #[serde(rename = "historico")]
    pub entries: Vec<HistoryEntry>,
    #[serde(rename = "timestamp_consulta")]
    pub queried_at: LocalTime,
    #[serde(rename = "estatisticas")]
    pub stats: HistoryStats,
    /// `[name, count]` pairs, most used first.
    #[serde(rename = "operacoes_mais_usadas")]
    pub most_used: Vec<Vec<Value>>,
    pub timestamp: LocalTime,
}

impl OperationResponse for HistoryResponse {
    const COMMAND: Command = Command::History;
}

/// One past call. Parameters and results keep whatever shape the server
/// recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct HistoryEntry {
    #[serde(rename = "operacao")]
    pub operation: String,
    #[serde(rename = "parametros")]
    pub parameters: Value,
    #[serde(rename = "resultado")]
    pub result: Value,
    pub timestamp: LocalTime,
    #[serde(rename = "sucesso")]
    pub success: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Record)]
pub struct HistoryStats {
    #[serde(rename = "total_operacoes")]
    pub total_operations: i64,
    #[serde(rename = "operacoes_sucesso")]
    pub successful: i64,
    #[serde(rename = "operacoes_erro")]
    pub failed: i64,
    #[serde(rename = "taxa_sucesso")]
    pub success_rate: f64,
}
