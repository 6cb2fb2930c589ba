use std::fmt;
use std::str::FromStr;

use serde::de::IgnoredAny;
use triprotocol_core::{OperationRequest, OperationResponse, RequestEnvelope, ResponseEnvelope};

use crate::error::{Error, Result};

pub mod binary;
pub mod json;
pub mod proto;
pub mod string;

pub use self::binary::BinaryCodec;
pub use self::json::JsonCodec;
pub use self::string::StringCodec;

/// Upper bound on a single response, prefix included.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Turns operation envelopes into wire bytes and back.
///
/// `encode`/`decode` are the client side. `decode_request`/`encode_response`
/// mirror them for servers and test doubles.
pub trait Codec: Send + Sync {
    /// How a reader knows a response is complete.
    fn framing(&self) -> Framing;

    fn encode<Q: OperationRequest>(&self, request: &RequestEnvelope<Q>) -> Result<Vec<u8>>;

    fn decode<R: OperationResponse>(&self, bytes: &[u8]) -> Result<ResponseEnvelope<R>>;

    fn decode_request<Q: OperationRequest>(&self, bytes: &[u8]) -> Result<RequestEnvelope<Q>>;

    fn encode_response<R: OperationResponse>(&self, response: &ResponseEnvelope<R>) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Text that ends with a `FIM` token, optionally followed by a newline.
    Terminated,
    /// 4-byte big-endian length followed by that many bytes.
    LengthPrefixed,
    /// Exactly one JSON value.
    JsonValue,
}

impl Framing {
    /// Length of the complete frame at the start of `buf`, or `None` while
    /// more bytes are needed.
    pub fn frame_len(self, buf: &[u8]) -> Result<Option<usize>> {
        match self {
            Self::Terminated => {
                let trimmed = buf.trim_ascii_end();
                let done = trimmed == b"FIM" || trimmed.ends_with(b"|FIM");
                Ok(done.then_some(buf.len()))
            }
            Self::LengthPrefixed => {
                let Some(prefix) = buf.first_chunk::<4>() else {
                    return Ok(None);
                };
                let declared = u32::from_be_bytes(*prefix) as usize;
                if declared > MAX_FRAME_SIZE - 4 {
                    return Err(Error::InvalidFrame(format!(
                        "Message too large: {declared} bytes"
                    )));
                }
                Ok((buf.len() >= declared + 4).then_some(declared + 4))
            }
            Self::JsonValue => {
                let mut values = serde_json::Deserializer::from_slice(buf).into_iter::<IgnoredAny>();
                match values.next() {
                    Some(Ok(_)) => Ok(Some(values.byte_offset())),
                    Some(Err(err)) if err.is_eof() => Ok(None),
                    Some(Err(err)) => Err(err.into()),
                    None => Ok(None),
                }
            }
        }
    }
}

/// Incremental [`Framing::frame_len`] over a buffer that only grows.
///
/// JSON frames are tracked by nesting depth and string state, so each byte is
/// inspected once and the value is parsed once its closing byte arrives.
#[derive(Debug, Clone)]
pub struct FrameScanner {
    framing: Framing,
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl FrameScanner {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            scanned: 0,
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Same contract as [`Framing::frame_len`]; `buf` must extend the buffer
    /// passed to the previous call.
    pub fn frame_len(&mut self, buf: &[u8]) -> Result<Option<usize>> {
        match self.framing {
            Framing::JsonValue => self.json_frame_len(buf),
            framing => framing.frame_len(buf),
        }
    }

    fn json_frame_len(&mut self, buf: &[u8]) -> Result<Option<usize>> {
        let start = self.scanned.min(buf.len());
        self.scanned = buf.len();

        for (offset, &byte) in buf[start..].iter().enumerate() {
            let end = start + offset + 1;
            if self.in_string {
                match byte {
                    _ if self.escaped => self.escaped = false,
                    b'\\' => self.escaped = true,
                    b'"' => {
                        self.in_string = false;
                        if self.depth == 0 {
                            return Framing::JsonValue.frame_len(&buf[..end]);
                        }
                    }
                    _ => {}
                }
                continue;
            }
            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Framing::JsonValue.frame_len(&buf[..end]);
                    }
                }
                _ if byte.is_ascii_whitespace() || self.depth > 0 => {}
                // Bare top-level scalar: let the parser decide.
                _ => return Framing::JsonValue.frame_len(buf),
            }
        }
        Ok(None)
    }
}

/// Wire protocol selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    String,
    Json,
    Binary,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Self::String, Self::Json, Self::Binary];

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Json => "json",
            Self::Binary => "proto",
        }
    }

    pub fn codec(self) -> AnyCodec {
        match self {
            Self::String => AnyCodec::String(StringCodec),
            Self::Json => AnyCodec::Json(JsonCodec),
            Self::Binary => AnyCodec::Binary(BinaryCodec),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "json" => Ok(Self::Json),
            "proto" | "protobuf" | "binary" => Ok(Self::Binary),
            other => Err(Error::Custom(format!(
                "unknown protocol `{other}`, expected string, json or proto"
            ))),
        }
    }
}

/// A codec picked at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyCodec {
    String(StringCodec),
    Json(JsonCodec),
    Binary(BinaryCodec),
}

impl AnyCodec {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::String(_) => Protocol::String,
            Self::Json(_) => Protocol::Json,
            Self::Binary(_) => Protocol::Binary,
        }
    }
}

impl From<Protocol> for AnyCodec {
    fn from(protocol: Protocol) -> Self {
        protocol.codec()
    }
}

macro_rules! dispatch {
    ($self:ident, $codec:ident => $call:expr) => {
        match $self {
            AnyCodec::String($codec) => $call,
            AnyCodec::Json($codec) => $call,
            AnyCodec::Binary($codec) => $call,
        }
    };
}

impl Codec for AnyCodec {
    fn framing(&self) -> Framing {
        dispatch!(self, codec => codec.framing())
    }

    fn encode<Q: OperationRequest>(&self, request: &RequestEnvelope<Q>) -> Result<Vec<u8>> {
        dispatch!(self, codec => codec.encode(request))
    }

    fn decode<R: OperationResponse>(&self, bytes: &[u8]) -> Result<ResponseEnvelope<R>> {
        dispatch!(self, codec => codec.decode(bytes))
    }

    fn decode_request<Q: OperationRequest>(&self, bytes: &[u8]) -> Result<RequestEnvelope<Q>> {
        dispatch!(self, codec => codec.decode_request(bytes))
    }

    fn encode_response<R: OperationResponse>(&self, response: &ResponseEnvelope<R>) -> Result<Vec<u8>> {
        dispatch!(self, codec => codec.encode_response(response))
    }
}

/// Encodes every request variant and reads it back through the server side.
#[cfg(test)]
pub(crate) fn assert_requests_round_trip<C: Codec>(codec: &C) {
    use triprotocol_core::operation::*;
    use triprotocol_core::Rfc3339Time;

    fn check<C: Codec, Q: OperationRequest + PartialEq>(codec: &C, sent: RequestEnvelope<Q>) {
        let bytes = codec.encode(&sent).unwrap();
        let received: RequestEnvelope<Q> = codec.decode_request(&bytes).unwrap();
        assert_eq!(received, sent, "{} did not survive the round trip", Q::COMMAND);
    }

    // Only the text protocol carries the Auth timestamp, at whole seconds.
    check(
        codec,
        RequestEnvelope::new(AuthRequest {
            student_id: "538349".into(),
            timestamp: Rfc3339Time::default(),
        }),
    );
    check(codec, RequestEnvelope::with_token(LogoutRequest, "a1b2"));
    check(codec, RequestEnvelope::with_token(EchoRequest::new("Olá, mundo!"), "a1b2"));
    check(codec, RequestEnvelope::with_token(SumRequest::new(vec![4, -5, 600]), "a1b2"));
    check(codec, RequestEnvelope::with_token(TimestampRequest, "a1b2"));
    check(codec, RequestEnvelope::with_token(StatusRequest::new(false), "a1b2"));
    check(codec, RequestEnvelope::with_token(StatusRequest::new(true), "a1b2"));
    check(codec, RequestEnvelope::with_token(HistoryRequest::new(MAX_HISTORY_LIMIT), "a1b2"));
}

/// Status replies with and without the optional detail sections survive
/// the server side encoding and the client decoding.
#[cfg(test)]
pub(crate) fn assert_status_round_trip<C: Codec>(codec: &C) {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use triprotocol_core::operation::*;
    use triprotocol_core::{LocalTime, UnixTime};

    let at = |secs: i64, micros: u32| Utc.timestamp_opt(secs, micros * 1_000).unwrap();
    let brief = StatusResponse {
        status: "ATIVO".into(),
        queried_at: LocalTime::new(at(1_762_013_061, 221_196)),
        operations_processed: 94,
        active_sessions: 2,
        uptime: UnixTime::new(at(1_762_000_000, 0)),
        version: "1.0.0".into(),
        metrics: StatusMetrics {
            cpu: 56.12,
            memory: 38.47,
            latency: 1.06,
        },
        database: None,
        sessions: None,
        timestamp: LocalTime::new(at(1_762_013_061, 392_632)),
    };

    let mut sessions = BTreeMap::new();
    sessions.insert(
        "538349".to_string(),
        SessionDetails {
            logged_in_at: UnixTime::new(at(1_762_012_000, 0)),
            client_ip: "127.0.0.1".into(),
            name: "Tubias".into(),
            enrollment: "538349".into(),
        },
    );
    let detailed = StatusResponse {
        database: Some(DatabaseStatistics {
            total_sessions: 31,
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
        }),
        sessions: Some(sessions),
        ..brief.clone()
    };

    for sent in [brief, detailed] {
        let bytes = codec
            .encode_response(&ResponseEnvelope::success(sent.clone()))
            .unwrap();
        let decoded: ResponseEnvelope<StatusResponse> = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.into_result().unwrap(), sent);
    }
}
