//! JSON envelope protocol.
//!
//! Requests are tagged by `tipo`; responses carry `sucesso` and, for generic
//! operations, their body under `resultado`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use triprotocol_core::{
    Command, FieldValue, LocalTime, Naming, OperationRequest, OperationResponse, Payload,
    RequestEnvelope, RequestKind, ResponseEnvelope, ServiceError, Status, Value,
};

use crate::codec::{Codec, Framing};
use crate::error::{Error, Result};

const OPERATION_SUCCEEDED: &str = "Operação realizada com sucesso";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "tipo")]
enum JsonRequest {
    #[serde(rename = "autenticar")]
    Auth { aluno_id: String },
    #[serde(rename = "logout")]
    Logout {
        #[serde(default)]
        token: String,
    },
    #[serde(rename = "operacao")]
    Operation {
        operacao: String,
        #[serde(default)]
        token: String,
        #[serde(default)]
        parametros: BTreeMap<String, serde_json::Value>,
    },
}

impl Codec for JsonCodec {
    fn framing(&self) -> Framing {
        Framing::JsonValue
    }

    fn encode<Q: OperationRequest>(&self, request: &RequestEnvelope<Q>) -> Result<Vec<u8>> {
        let token = request.token().unwrap_or_default().to_string();
        let message = match request.body.kind() {
            RequestKind::Auth { student_id } => JsonRequest::Auth {
                aluno_id: student_id.to_string(),
            },
            RequestKind::Logout => JsonRequest::Logout { token },
            RequestKind::Operation { name } => JsonRequest::Operation {
                operacao: name.to_string(),
                token,
                parametros: request
                    .body
                    .to_value_fields(Naming::Text)
                    .into_iter()
                    .map(|(name, value)| (name, value.into()))
                    .collect(),
            },
        };
        Ok(serde_json::to_vec(&message)?)
    }

    fn decode<R: OperationResponse>(&self, bytes: &[u8]) -> Result<ResponseEnvelope<R>> {
        let tree = Value::from(serde_json::from_slice::<serde_json::Value>(bytes)?);
        let mut top = match tree {
            Value::Map(top) => top,
            other => {
                return Err(Error::Decode(format!(
                    "expected a JSON object, found {}",
                    other.kind()
                )))
            }
        };

        let success = top
            .get("sucesso")
            .and_then(Value::as_bool)
            .ok_or_else(|| Error::Decode("response without a boolean `sucesso`".into()))?;
        if !success {
            let message = top
                .get("mensagem")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Ok(ResponseEnvelope::failure(ServiceError::new(
                Status::ServerError,
                message,
            )));
        }

        let timestamp = top.remove("timestamp");
        let mut source = match top.remove("resultado") {
            Some(Value::Map(result)) => result,
            Some(Value::Null) | None => {
                if let Some(Value::Map(student)) = top.remove("dados_aluno") {
                    top.extend(student);
                }
                top
            }
            Some(other) => {
                return Err(Error::Decode(format!(
                    "`resultado` must be an object, found {}",
                    other.kind()
                )))
            }
        };
        if let Some(timestamp) = timestamp {
            source.insert("timestamp".to_string(), timestamp);
        }

        Ok(ResponseEnvelope::success(R::bind(&source, Naming::Json)?))
    }

    fn decode_request<Q: OperationRequest>(&self, bytes: &[u8]) -> Result<RequestEnvelope<Q>> {
        let message: JsonRequest = serde_json::from_slice(bytes)?;
        let mismatch = |found: &str| {
            Error::Decode(format!("expected a `{}` request, found `{found}`", Q::COMMAND))
        };

        let (token, fields) = match message {
            JsonRequest::Auth { aluno_id } if Q::COMMAND == Command::Auth => {
                let mut fields = BTreeMap::new();
                fields.insert("aluno_id".to_string(), Value::String(aluno_id));
                (None, fields)
            }
            JsonRequest::Logout { token } if Q::COMMAND == Command::Logout => {
                (Some(token), BTreeMap::new())
            }
            JsonRequest::Operation {
                operacao,
                token,
                parametros,
            } if operacao == Q::COMMAND.wire_name() => {
                let fields = parametros
                    .into_iter()
                    .map(|(name, value)| (name, Value::from(value)))
                    .collect();
                (Some(token), fields)
            }
            JsonRequest::Auth { .. } => return Err(mismatch("autenticar")),
            JsonRequest::Logout { .. } => return Err(mismatch("logout")),
            JsonRequest::Operation { operacao, .. } => return Err(mismatch(&operacao)),
        };

        let body = Q::bind(&fields, Naming::Text)?;
        Ok(RequestEnvelope {
            token: token.filter(|t| !t.is_empty()),
            body,
        })
    }

    fn encode_response<R: OperationResponse>(&self, response: &ResponseEnvelope<R>) -> Result<Vec<u8>> {
        let mut top = BTreeMap::new();
        match response.payload() {
            Payload::Body(body) => {
                let mut fields = body.to_value_fields(Naming::Json);
                let timestamp = fields
                    .remove("timestamp")
                    .unwrap_or_else(|| LocalTime::now().to_value(Naming::Json));
                top.insert("sucesso".to_string(), Value::Bool(true));
                top.insert("timestamp".to_string(), timestamp);
                if R::COMMAND.is_session() {
                    top.entry("mensagem".to_string())
                        .or_insert_with(|| Value::from(OPERATION_SUCCEEDED));
                    top.extend(fields);
                } else {
                    top.insert("mensagem".to_string(), Value::from(OPERATION_SUCCEEDED));
                    top.insert("resultado".to_string(), Value::Map(fields));
                }
            }
            Payload::Error(err) => {
                top.insert("sucesso".to_string(), Value::Bool(false));
                top.insert("mensagem".to_string(), Value::from(err.message.as_str()));
                top.insert(
                    "timestamp".to_string(),
                    LocalTime::now().to_value(Naming::Json),
                );
            }
        }
        Ok(serde_json::to_vec(&Value::Map(top))?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use triprotocol_core::operation::*;
    use triprotocol_core::UnixTime;

    use super::*;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, micros: u32) -> LocalTime {
        let naive = NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_micro_opt(h, mi, s, micros))
            .unwrap();
        LocalTime::new(naive.and_utc())
    }

    fn encode<Q: OperationRequest>(body: Q, token: Option<&str>) -> String {
        let envelope = RequestEnvelope {
            token: token.map(str::to_string),
            body,
        };
        String::from_utf8(JsonCodec.encode(&envelope).unwrap()).unwrap()
    }

    fn decode<R: OperationResponse>(raw: &str) -> R {
        JsonCodec
            .decode::<R>(raw.as_bytes())
            .unwrap()
            .into_result()
            .unwrap()
    }

    #[test]
    fn encodes_requests() {
        assert_eq!(
            encode(AuthRequest::new("538349"), None),
            r#"{"tipo":"autenticar","aluno_id":"538349"}"#
        );
        assert_eq!(
            encode(LogoutRequest, Some("123")),
            r#"{"tipo":"logout","token":"123"}"#
        );
        assert_eq!(
            encode(EchoRequest::new("ola mundo"), Some("abcd")),
            r#"{"tipo":"operacao","operacao":"echo","token":"abcd","parametros":{"mensagem":"ola mundo"}}"#
        );
        assert_eq!(
            encode(SumRequest::new(vec![1, 2, 3]), Some("sumtoken")),
            r#"{"tipo":"operacao","operacao":"soma","token":"sumtoken","parametros":{"numeros":[1,2,3]}}"#
        );
        assert_eq!(
            encode(TimestampRequest, Some("t")),
            r#"{"tipo":"operacao","operacao":"timestamp","token":"t","parametros":{}}"#
        );
        assert_eq!(
            encode(HistoryRequest::new(1), Some("historytoken")),
            r#"{"tipo":"operacao","operacao":"historico","token":"historytoken","parametros":{"limite":1}}"#
        );
    }

    #[test]
    fn decodes_auth_response() {
        let auth: AuthResponse = decode(
            r#"{"sucesso": true, "mensagem": "Autenticação realizada com sucesso", "timestamp": "2025-11-01T13:18:04.381480", "token": "tokenauth", "dados_aluno": {"nome": "SAID CAVALCANTE RODRIGUES"}, "sessao_id": 15}"#,
        );
        assert_eq!(
            auth,
            AuthResponse {
                token: "tokenauth".into(),
                name: "SAID CAVALCANTE RODRIGUES".into(),
                enrollment: String::new(),
                timestamp: local(2025, 11, 1, 13, 18, 4, 381480),
            }
        );
    }

    #[test]
    fn decodes_logout_response() {
        let logout: LogoutResponse = decode(
            r#"{"sucesso": true, "mensagem": "Logout realizado com sucesso", "timestamp": "2025-11-01T15:00:29.804192"}"#,
        );
        assert_eq!(logout.message, "Logout realizado com sucesso");
        assert_eq!(logout.timestamp, local(2025, 11, 1, 15, 0, 29, 804192));
    }

    #[test]
    fn decodes_echo_response() {
        let echo: EchoResponse = decode(
            r#"{"sucesso": true, "mensagem": "Operação realizada com sucesso", "timestamp": "2025-11-01T14:59:47.312256", "resultado": {"mensagem_original": "ola mundo", "mensagem_eco": "ECO: ola mundo", "timestamp_servidor": "2025-11-01T14:59:47.312723", "tamanho_mensagem": 9, "hash_md5": "3b2613ff007c695c2d560d0e9c9ccbcf"}} "#,
        );
        assert_eq!(
            echo,
            EchoResponse {
                original_message: "ola mundo".into(),
                echo_message: "ECO: ola mundo".into(),
                server_timestamp: local(2025, 11, 1, 14, 59, 47, 312723),
                message_size: 9,
                md5: "3b2613ff007c695c2d560d0e9c9ccbcf".into(),
                timestamp: local(2025, 11, 1, 14, 59, 47, 312256),
            }
        );
    }

    #[test]
    fn decodes_sum_response() {
        let sum: SumResponse = decode(
            r#"{
              "sucesso": true,
              "mensagem": "Operação realizada com sucesso",
              "timestamp": "2025-11-01T16:04:20.875755",
              "resultado": {
                "numeros_originais": [1, 2, 3],
                "quantidade": 3,
                "soma": 6.0,
                "media": 2.0,
                "maximo": 3.0,
                "minimo": 1.0,
                "timestamp_calculo": "2025-11-01T16:04:20.876219"
              }
            }"#,
        );
        assert_eq!(
            sum,
            SumResponse {
                original_numbers: vec![1.0, 2.0, 3.0],
                sum: 6.0,
                mean: 2.0,
                maximum: 3.0,
                minimum: 1.0,
                count: 3,
                calculated_at: local(2025, 11, 1, 16, 4, 20, 876219),
                timestamp: local(2025, 11, 1, 16, 4, 20, 875755),
            }
        );
    }

    #[test]
    fn decodes_timestamp_response() {
        let clock: TimestampResponse = decode(
            r#"{"sucesso": true, "mensagem": "Operação realizada com sucesso",
            "timestamp": "2025-11-01T16:04:21.048770",
            "resultado": {"timestamp_unix": 1762013061.0492296, "timestamp_iso": "2025-11-01T16:04:21.049227", "timestamp_formatado": "01/11/2025 16:04:21", "ano": 2025, "mes": 11, "dia": 1, "hora": 16, "minuto": 4, "segundo": 21, "microsegundo": 49227}
            }"#,
        );
        assert_eq!(clock.unix, UnixTime::from_epoch_seconds(1762013061.0492296).unwrap());
        assert_eq!(clock.unix.instant().timestamp_subsec_micros(), 49229);
        assert_eq!(clock.iso, local(2025, 11, 1, 16, 4, 21, 49227));
        assert_eq!(clock.formatted, "01/11/2025 16:04:21");
        assert_eq!((clock.year, clock.month, clock.day), (2025, 11, 1));
        assert_eq!(clock.microsecond, 49227);
        assert_eq!(clock.timestamp, local(2025, 11, 1, 16, 4, 21, 48770));
    }

    const STATUS_RESULT: &str = r#"{
        "status": "ATIVO",
        "timestamp_consulta": "2025-11-01T16:04:21.221182",
        "operacoes_processadas": 76,
        "sessoes_ativas": 1,
        "tempo_ativo": 1762013061.221196,
        "versao": "1.0.0",
        "estatisticas_banco": {
            "total_sessoes": 18,
            "total_operacoes": 94,
            "operacoes_por_tipo": {
                "autenticacao": 19, "echo": 14, "historico": 19,
                "soma": 13, "status": 15, "timestamp": 14
            },
            "alunos_unicos": 2
        },
        "sessoes_detalhes": {
            "538349": {
                "timestamp_login": 1762013061,
                "ip_cliente": "191.6.14.5",
                "nome": "SAID CAVALCANTE RODRIGUES",
                "matricula": "538349"
            }
        },
        "metricas": {"cpu_simulado": 56.12, "memoria_simulada": 38.47, "latencia_simulada": 1.06}
    }"#;

    #[test]
    fn decodes_status_response() {
        let raw = format!(
            r#"{{"sucesso": true, "timestamp": "2025-11-01T16:04:21.220755", "resultado": {STATUS_RESULT}}}"#
        );
        let status: StatusResponse = decode(&raw);
        assert_eq!(status.status, "ATIVO");
        assert_eq!(status.operations_processed, 76);
        assert_eq!(status.active_sessions, 1);
        assert_eq!(status.uptime, UnixTime::from_epoch_seconds(1762013061.221196).unwrap());
        assert_eq!(status.version, "1.0.0");
        assert_eq!(
            status.metrics,
            StatusMetrics {
                cpu: 56.12,
                memory: 38.47,
                latency: 1.06,
            }
        );
        assert_eq!(
            status.database,
            Some(DatabaseStatistics {
                total_sessions: 18,
                total_operations: 94,
                operations_by_type: OperationCounts {
                    authentication: 19,
                    echo: 14,
                    history: 19,
                    sum: 13,
                    status: 15,
                    timestamp: 14,
                },
                unique_students: 2,
            })
        );
        let sessions = status.sessions.unwrap();
        let session = &sessions["538349"];
        assert_eq!(session.logged_in_at.instant().timestamp(), 1_762_013_061);
        assert_eq!(session.client_ip, "191.6.14.5");
        assert_eq!(session.name, "SAID CAVALCANTE RODRIGUES");
        assert_eq!(session.enrollment, "538349");
        assert_eq!(status.timestamp, local(2025, 11, 1, 16, 4, 21, 220755));
    }

    #[test]
    fn decodes_brief_status_response() {
        let status: StatusResponse = decode(
            r#"{"sucesso": true, "timestamp": "2025-11-01T16:04:21.220755", "resultado": {"status": "ATIVO", "operacoes_processadas": 76, "versao": "1.0.0"}}"#,
        );
        assert_eq!(status.database, None);
        assert_eq!(status.sessions, None);
        assert_eq!(status.metrics, StatusMetrics::default());
    }

    #[test]
    fn decodes_history_response() {
        let raw = format!(
            r#"{{
              "sucesso": true,
              "mensagem": "Operação realizada com sucesso",
              "timestamp": "2025-11-01T16:04:21.392632",
              "resultado": {{
                "aluno_id": "538349",
                "limite_solicitado": 2,
                "total_encontrado": 2,
                "historico": [
                  {{
                    "operacao": "status",
                    "parametros": {{ "detalhado": true }},
                    "resultado": {STATUS_RESULT},
                    "timestamp": "2025-11-01T16:04:21.221762",
                    "sucesso": true
                  }},
                  {{
                    "operacao": "timestamp",
                    "parametros": {{}},
                    "resultado": {{"timestamp_unix": 1762013061.0492296, "ano": 2025}},
                    "timestamp": "2025-11-01T16:04:21.049359",
                    "sucesso": true
                  }}
                ],
                "timestamp_consulta": "2025-11-01T16:04:21.393995",
                "estatisticas": {{
                  "total_operacoes": 2,
                  "operacoes_sucesso": 2,
                  "operacoes_erro": 0,
                  "taxa_sucesso": 100.0
                }},
                "operacoes_mais_usadas": [["status", 1], ["timestamp", 1]]
              }}
            }}"#
        );
        let history: HistoryResponse = decode(&raw);
        assert_eq!(history.student_id, "538349");
        assert_eq!(history.requested_limit, 2);
        assert_eq!(history.total_found, 2);
        assert_eq!(history.entries.len(), 2);

        let first = &history.entries[0];
        assert_eq!(first.operation, "status");
        assert_eq!(first.parameters.get("detalhado"), Some(&Value::Bool(true)));
        assert_eq!(first.result.get("versao"), Some(&Value::from("1.0.0")));
        assert_eq!(
            first.result.get("tempo_ativo"),
            Some(&Value::Float(1762013061.221196))
        );
        assert_eq!(first.timestamp, local(2025, 11, 1, 16, 4, 21, 221762));
        assert!(first.success);

        let second = &history.entries[1];
        assert_eq!(second.parameters, Value::Map(BTreeMap::new()));
        assert_eq!(second.result.get("ano"), Some(&Value::Integer(2025)));

        assert_eq!(
            history.stats,
            HistoryStats {
                total_operations: 2,
                successful: 2,
                failed: 0,
                success_rate: 100.0,
            }
        );
        assert_eq!(
            history.most_used,
            vec![
                vec![Value::from("status"), Value::Integer(1)],
                vec![Value::from("timestamp"), Value::Integer(1)],
            ]
        );
        assert_eq!(history.queried_at, local(2025, 11, 1, 16, 4, 21, 393995));
        assert_eq!(history.timestamp, local(2025, 11, 1, 16, 4, 21, 392632));
    }

    #[test]
    fn failure_yields_error_and_no_body() {
        let response: ResponseEnvelope<EchoResponse> = JsonCodec
            .decode(r#"{"sucesso": false, "mensagem": "Token inválido", "timestamp": "2025-11-01T15:00:29.804192"}"#.as_bytes())
            .unwrap();
        assert_eq!(response.status(), Status::ServerError);
        assert!(response.body().is_none());
        let err = response.error().unwrap();
        assert_eq!(err.message, "Token inválido");
        assert!(err.details.is_empty());
    }

    #[test]
    fn rejects_non_envelopes() {
        assert!(matches!(
            JsonCodec.decode::<EchoResponse>(b"[1, 2]"),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            JsonCodec.decode::<EchoResponse>(br#"{"mensagem": "x"}"#),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            JsonCodec.decode::<EchoResponse>(b"{not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn requests_round_trip_through_the_server_side() {
        let sent = RequestEnvelope::with_token(StatusRequest::new(true), "tok");
        let bytes = JsonCodec.encode(&sent).unwrap();
        assert_eq!(JsonCodec.decode_request::<StatusRequest>(&bytes).unwrap(), sent);

        let sent = RequestEnvelope::with_token(LogoutRequest, "tok");
        let bytes = JsonCodec.encode(&sent).unwrap();
        assert_eq!(JsonCodec.decode_request::<LogoutRequest>(&bytes).unwrap(), sent);

        let auth = RequestEnvelope::new(AuthRequest::new("538349"));
        let bytes = JsonCodec.encode(&auth).unwrap();
        let received = JsonCodec.decode_request::<AuthRequest>(&bytes).unwrap();
        assert_eq!(received.body.student_id, "538349");
        assert_eq!(received.token, None);

        assert!(JsonCodec.decode_request::<SumRequest>(&bytes).is_err());
    }

    #[test]
    fn responses_round_trip_through_the_server_side() {
        let auth = AuthResponse {
            token: "tokenauth".into(),
            name: "SAID".into(),
            enrollment: "538349".into(),
            timestamp: local(2025, 11, 1, 13, 18, 4, 381480),
        };
        let bytes = JsonCodec
            .encode_response(&ResponseEnvelope::success(auth.clone()))
            .unwrap();
        assert_eq!(decode::<AuthResponse>(std::str::from_utf8(&bytes).unwrap()), auth);

        let sum = SumResponse {
            original_numbers: vec![1.0, 2.0],
            sum: 3.0,
            count: 2,
            ..SumResponse::default()
        };
        let bytes = JsonCodec
            .encode_response(&ResponseEnvelope::success(sum.clone()))
            .unwrap();
        assert_eq!(decode::<SumResponse>(std::str::from_utf8(&bytes).unwrap()), sum);
    }

    #[test]
    fn every_request_variant_round_trips() {
        crate::codec::assert_requests_round_trip(&JsonCodec);
    }

    #[test]
    fn status_replies_round_trip_with_and_without_details() {
        crate::codec::assert_status_round_trip(&JsonCodec);
    }
}
