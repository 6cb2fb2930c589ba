use std::collections::BTreeMap;

use serde::Serialize;

use crate::operation::{Command, OperationRequest, OperationResponse};
use crate::timestamp::{LocalTime, UnixTime};
use crate::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Record)]
pub struct StatusRequest {
    #[serde(rename = "detalhado")]
    pub detailed: bool,
}

impl StatusRequest {
    pub fn new(detailed: bool) -> Self {
        Self { detailed }
    }
}

impl OperationRequest for StatusRequest {
    const COMMAND: Command = Command::Status;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct StatusResponse {
    pub status: String,
    #[serde(rename = "timestamp_consulta")]
    pub queried_at: LocalTime,
    #[serde(rename = "operacoes_processadas")]
    pub operations_processed: i64,
    #[serde(rename = "sessoes_ativas")]
    pub active_sessions: i64,
    #[serde(rename = "tempo_ativo")]
    pub uptime: UnixTime,
    #[serde(rename = "versao")]
    pub version: String,
    #[serde(rename = "metricas")]
    pub metrics: StatusMetrics,
    /// Only present on detailed queries.
    #[wire(omittable)]
    #[serde(rename = "estatisticas_banco", skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseStatistics>,
    #[wire(omittable)]
    #[serde(rename = "sessoes_detalhes", skip_serializing_if = "Option::is_none")]
    pub sessions: Option<BTreeMap<String, SessionDetails>>,
    pub timestamp: LocalTime,
}

impl OperationResponse for StatusResponse {
    const COMMAND: Command = Command::Status;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Record)]
pub struct StatusMetrics {
    #[serde(rename = "cpu_simulado")]
    pub cpu: f64,
    #[serde(rename = "memoria_simulada")]
    pub memory: f64,
    #[serde(rename = "latencia_simulada")]
    pub latency: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct DatabaseStatistics {
    #[serde(rename = "total_sessoes")]
    pub total_sessions: i64,
    #[serde(rename = "total_operacoes")]
    pub total_operations: i64,
    #[serde(rename = "operacoes_por_tipo")]
    pub operations_by_type: OperationCounts,
    #[serde(rename = "alunos_unicos")]
    pub unique_students: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Record)]
pub struct OperationCounts {
    #[serde(rename = "autenticacao")]
    pub authentication: i64,
    pub echo: i64,
    #[serde(rename = "historico")]
    pub history: i64,
    #[serde(rename = "soma")]
    pub sum: i64,
    pub status: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Record)]
pub struct SessionDetails {
    #[serde(rename = "timestamp_login")]
    pub logged_in_at: UnixTime,
    #[serde(rename = "ip_cliente")]
    pub client_ip: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "matricula")]
    pub enrollment: String,
}
