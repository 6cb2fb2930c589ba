//! Pipe-delimited text protocol.
//!
//! ```text
//! OP|token=abcd|operacao=echo|mensagem=Hello, world!|FIM\n
//! OK|msg=Logout realizado com sucesso|timestamp=2025-10-30T21:32:25.038812|FIM
//! ```

use std::collections::BTreeMap;

use triprotocol_core::{
    Naming, OperationRequest, OperationResponse, RequestEnvelope, RequestKind, ResponseEnvelope,
    ServiceError, Status, Value,
};

use crate::codec::{Codec, Framing};
use crate::error::{Error, Result};

const TERMINATOR: &str = "FIM";
const SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringCodec;

impl Codec for StringCodec {
    fn framing(&self) -> Framing {
        Framing::Terminated
    }

    fn encode<Q: OperationRequest>(&self, request: &RequestEnvelope<Q>) -> Result<Vec<u8>> {
        let kind = request.body.kind();
        let mut tokens = vec![match kind {
            RequestKind::Auth { .. } => Q::COMMAND.wire_name().to_string(),
            RequestKind::Logout => Q::COMMAND.wire_name().to_string(),
            RequestKind::Operation { .. } => "OP".to_string(),
        }];

        if let Some(token) = request.token() {
            tokens.push(property("token", token)?);
        }
        if let RequestKind::Operation { name } = kind {
            tokens.push(property("operacao", name)?);
        }
        for (name, text) in request.body.to_text_fields() {
            tokens.push(property(name, &text)?);
        }
        tokens.push(TERMINATOR.to_string());

        let mut line = tokens.join("|");
        line.push('\n');
        Ok(line.into_bytes())
    }

    fn decode<R: OperationResponse>(&self, bytes: &[u8]) -> Result<ResponseEnvelope<R>> {
        let (head, props) = split_message(bytes)?;
        let status = match head {
            "OK" => Status::Ok,
            "INVALIDO" => Status::ClientError,
            "ERROR" => Status::ServerError,
            other => return Err(Error::Decode(format!("unknown status `{other}`"))),
        };

        if !status.is_success() {
            let mut details = props;
            let message = details.remove("msg").unwrap_or_default();
            let details = details
                .into_iter()
                .map(|(name, text)| (name, Value::String(text)))
                .collect();
            return Ok(ResponseEnvelope::failure(
                ServiceError::new(status, message).with_details(details),
            ));
        }

        let body = R::bind(&props, Naming::Text)?;
        Ok(ResponseEnvelope::success(body))
    }

    fn decode_request<Q: OperationRequest>(&self, bytes: &[u8]) -> Result<RequestEnvelope<Q>> {
        let (head, mut props) = split_message(bytes)?;
        let expected = if Q::COMMAND.is_session() {
            Q::COMMAND.wire_name()
        } else {
            "OP"
        };
        if head != expected {
            return Err(Error::Decode(format!(
                "expected a `{expected}` message, found `{head}`"
            )));
        }
        if !Q::COMMAND.is_session() {
            let operation = props
                .remove("operacao")
                .ok_or_else(|| Error::Decode("operation message without `operacao`".into()))?;
            if operation != Q::COMMAND.wire_name() {
                return Err(Error::Decode(format!(
                    "expected operation `{}`, found `{operation}`",
                    Q::COMMAND
                )));
            }
        }

        let token = props.remove("token");
        let body = Q::bind(&props, Naming::Text)?;
        Ok(RequestEnvelope { token, body })
    }

    fn encode_response<R: OperationResponse>(&self, response: &ResponseEnvelope<R>) -> Result<Vec<u8>> {
        let mut tokens = Vec::new();
        match response.error() {
            None => {
                tokens.push("OK".to_string());
                if let Some(body) = response.body() {
                    for (name, text) in body.to_text_fields() {
                        tokens.push(property(name, &text)?);
                    }
                }
            }
            Some(err) => {
                tokens.push(
                    match err.status {
                        Status::ClientError => "INVALIDO",
                        _ => "ERROR",
                    }
                    .to_string(),
                );
                tokens.push(property("msg", &err.message)?);
                for (name, value) in &err.details {
                    tokens.push(property(name, &value.to_string())?);
                }
            }
        }
        tokens.push(TERMINATOR.to_string());
        Ok(tokens.join("|").into_bytes())
    }
}

/// `name=text`, refusing text that would break the framing.
fn property(name: &str, text: &str) -> Result<String> {
    if text.contains([SEPARATOR, '\n']) {
        return Err(Error::Encode(format!(
            "value of `{name}` contains a `|` or newline"
        )));
    }
    Ok(format!("{name}={text}"))
}

/// Splits a message into its leading token and its `name=value` properties.
fn split_message(bytes: &[u8]) -> Result<(&str, BTreeMap<String, String>)> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))?;
    let text = text.trim_end_matches(|c: char| c.is_whitespace() || c == '\0');

    let tokens: Vec<&str> = text.split(SEPARATOR).collect();
    if tokens.len() < 3 {
        return Err(Error::Decode(format!(
            "expected at least 3 `|`-separated tokens, found {}",
            tokens.len()
        )));
    }

    let [head, body @ .., TERMINATOR] = tokens.as_slice() else {
        return Err(Error::Decode(format!(
            "message does not end with `{TERMINATOR}`"
        )));
    };
    let mut props = BTreeMap::new();
    for token in body {
        let (name, value) = token
            .split_once('=')
            .ok_or_else(|| Error::Decode(format!("token `{token}` is not a `name=value` pair")))?;
        props.insert(name.to_string(), value.to_string());
    }
    Ok((*head, props))
}
