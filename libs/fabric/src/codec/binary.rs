//! Length-prefixed protocol-buffer protocol.
//!
//! Every message is a 4-byte big-endian length followed by a `Requisicao` or
//! `Resposta`. Parameters and result fields travel as strings in the same
//! text form the string protocol uses.

use std::collections::BTreeMap;

use prost::Message;
use triprotocol_core::{
    Command, Naming, OperationRequest, OperationResponse, Payload, Record, RequestEnvelope,
    RequestKind, ResponseEnvelope, ServiceError, Status, Value,
};

use crate::codec::proto::{
    requisicao, resposta, ComandoAuth, ComandoLogout, ComandoOperacao, Requisicao, Resposta,
    RespostaErro, RespostaOk,
};
use crate::codec::{Codec, Framing};
use crate::error::{Error, Result};

const PREFIX_LEN: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn framing(&self) -> Framing {
        Framing::LengthPrefixed
    }

    fn encode<Q: OperationRequest>(&self, request: &RequestEnvelope<Q>) -> Result<Vec<u8>> {
        let token = request.token().unwrap_or_default().to_string();
        let tipo = match request.body.kind() {
            RequestKind::Auth { student_id } => requisicao::Tipo::Auth(ComandoAuth {
                aluno_id: student_id.to_string(),
            }),
            RequestKind::Logout => requisicao::Tipo::Logout(ComandoLogout { token }),
            RequestKind::Operation { name } => requisicao::Tipo::Operacao(ComandoOperacao {
                token,
                operacao: name.to_string(),
                parametros: text_fields(&request.body),
            }),
        };
        frame(&Requisicao { tipo: Some(tipo) })
    }

    fn decode<R: OperationResponse>(&self, bytes: &[u8]) -> Result<ResponseEnvelope<R>> {
        let message = Resposta::decode(unframe(bytes)?)?;
        match message.tipo {
            Some(resposta::Tipo::Ok(ok)) => {
                let mut fields = ok.dados;
                if !ok.timestamp.is_empty() {
                    fields.insert("timestamp".to_string(), ok.timestamp);
                }
                Ok(ResponseEnvelope::success(R::bind(&fields, Naming::Text)?))
            }
            Some(resposta::Tipo::Erro(erro)) => {
                let details = erro
                    .detalhes
                    .into_iter()
                    .map(|(name, text)| (name, Value::String(text)))
                    .collect();
                Ok(ResponseEnvelope::failure(
                    ServiceError::new(Status::ServerError, erro.mensagem).with_details(details),
                ))
            }
            None => Err(Error::Decode("response carries neither `ok` nor `erro`".into())),
        }
    }

    fn decode_request<Q: OperationRequest>(&self, bytes: &[u8]) -> Result<RequestEnvelope<Q>> {
        let message = Requisicao::decode(unframe(bytes)?)?;
        let (token, fields) = match message.tipo {
            Some(requisicao::Tipo::Auth(auth)) if Q::COMMAND == Command::Auth => {
                let mut fields = BTreeMap::new();
                fields.insert("aluno_id".to_string(), auth.aluno_id);
                (String::new(), fields)
            }
            Some(requisicao::Tipo::Logout(logout)) if Q::COMMAND == Command::Logout => {
                (logout.token, BTreeMap::new())
            }
            Some(requisicao::Tipo::Operacao(op)) if op.operacao == Q::COMMAND.wire_name() => {
                (op.token, op.parametros)
            }
            other => {
                return Err(Error::Decode(format!(
                    "expected a `{}` request, found {}",
                    Q::COMMAND,
                    describe(other.as_ref())
                )))
            }
        };

        Ok(RequestEnvelope {
            token: Some(token).filter(|t| !t.is_empty()),
            body: Q::bind(&fields, Naming::Text)?,
        })
    }

    fn encode_response<R: OperationResponse>(&self, response: &ResponseEnvelope<R>) -> Result<Vec<u8>> {
        let tipo = match response.payload() {
            Payload::Body(body) => {
                let mut dados = text_fields(body);
                let timestamp = dados.remove("timestamp").unwrap_or_default();
                resposta::Tipo::Ok(RespostaOk {
                    comando: R::COMMAND.wire_name().to_string(),
                    dados,
                    timestamp,
                })
            }
            Payload::Error(err) => resposta::Tipo::Erro(RespostaErro {
                mensagem: err.message.clone(),
                detalhes: err
                    .details
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_string()))
                    .collect(),
            }),
        };
        frame(&Resposta { tipo: Some(tipo) })
    }
}

fn text_fields<T: Record>(record: &T) -> BTreeMap<String, String> {
    record
        .to_text_fields()
        .into_iter()
        .map(|(name, text)| (name.to_string(), text))
        .collect()
}

fn frame<M: Message>(message: &M) -> Result<Vec<u8>> {
    let len = message.encoded_len();
    let prefix = u32::try_from(len)
        .map_err(|_| Error::Encode(format!("message of {len} bytes does not fit the length prefix")))?;
    let mut out = Vec::with_capacity(PREFIX_LEN + len);
    out.extend_from_slice(&prefix.to_be_bytes());
    message
        .encode(&mut out)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(out)
}

/// The payload named by the length prefix, checked against what arrived.
fn unframe(bytes: &[u8]) -> Result<&[u8]> {
    let Some((prefix, rest)) = bytes.split_first_chunk::<PREFIX_LEN>() else {
        return Err(Error::Corrupted(format!(
            "{} bytes is shorter than the length prefix",
            bytes.len()
        )));
    };
    let declared = u32::from_be_bytes(*prefix) as usize;
    if declared > rest.len() {
        return Err(Error::Corrupted(format!(
            "length prefix says {declared} bytes but only {} follow",
            rest.len()
        )));
    }
    Ok(&rest[..declared])
}

fn describe(tipo: Option<&requisicao::Tipo>) -> String {
    match tipo {
        Some(requisicao::Tipo::Auth(_)) => "an auth command".to_string(),
        Some(requisicao::Tipo::Logout(_)) => "a logout command".to_string(),
        Some(requisicao::Tipo::Operacao(op)) => format!("operation `{}`", op.operacao),
        None => "an empty request".to_string(),
    }
}
