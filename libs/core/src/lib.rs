//! Protocol-independent model of the session client.
//!
//! Holds the operation request/response types, the envelopes around them,
//! the wire timestamp encodings and the binding layer the codecs use to move
//! records in and out of their wire shapes.

// Lets `#[derive(Record)]` output resolve inside this crate too.
extern crate self as triprotocol_core;

pub mod envelope;
pub mod error;
pub mod field;
pub mod literal;
pub mod operation;
pub mod record;
pub mod timestamp;
pub mod value;

pub use envelope::{Payload, RequestEnvelope, ResponseEnvelope, ServiceError, Status};
pub use error::{Error, Result};
pub use field::FieldValue;
pub use operation::{Command, OperationRequest, OperationResponse, RequestKind};
pub use record::{FieldSource, FieldSpec, Naming, Record};
pub use timestamp::{LocalTime, Rfc3339Time, Stamp, TimestampRepr, UnixTime};
pub use value::Value;

/// Derive macro for [`record::Record`]; shares the trait's name.
pub use triprotocol_core_derive::Record;
