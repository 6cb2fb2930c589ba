//! Wire timestamps.
//!
//! The same instant travels in three encodings depending on the field it
//! fills. A field picks its encoding statically through the format parameter
//! of [`Stamp`]; all formatting and parsing dispatches on [`TimestampRepr`].

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const LOCAL_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const LOCAL_FALLBACK_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampRepr {
    /// `2025-10-10T14:30:00Z`
    Rfc3339,
    /// `2025-10-30T18:16:04.585339`, no zone, read as UTC.
    LocalMicrosecond,
    /// `1761859371.6872423` seconds since the epoch.
    UnixEpochFloat,
}

impl TimestampRepr {
    pub fn format(self, instant: &DateTime<Utc>) -> String {
        match self {
            Self::Rfc3339 => instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            Self::LocalMicrosecond => instant.naive_utc().format(LOCAL_FORMAT).to_string(),
            Self::UnixEpochFloat => epoch_seconds(instant).to_string(),
        }
    }

    pub fn parse(self, text: &str) -> Result<DateTime<Utc>> {
        let text = text.trim();
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| timestamp_error(text, e)),
            Self::LocalMicrosecond => NaiveDateTime::parse_from_str(text, LOCAL_PARSE_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(text, LOCAL_FALLBACK_FORMAT))
                .map(|naive| naive.and_utc())
                .map_err(|e| timestamp_error(text, e)),
            Self::UnixEpochFloat => {
                let seconds: f64 = text.parse().map_err(|e| timestamp_error(text, e))?;
                from_epoch_seconds(seconds)
            }
        }
    }
}

fn timestamp_error(text: &str, reason: impl fmt::Display) -> Error {
    Error::Timestamp {
        value: text.to_string(),
        reason: reason.to_string(),
    }
}

pub fn epoch_seconds(instant: &DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) / 1e9
}

/// Splits into floored whole seconds and truncated non-negative nanoseconds,
/// the same split [`epoch_seconds`] reads back.
pub fn from_epoch_seconds(seconds: f64) -> Result<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(timestamp_error(&seconds.to_string(), "not a finite number"));
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9) as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
        .ok_or_else(|| timestamp_error(&seconds.to_string(), "out of range"))
}

mod sealed {
    pub trait Sealed {}
}

pub trait TimestampFormat: sealed::Sealed + 'static {
    const REPR: TimestampRepr;
}

#[derive(Debug, Clone, Copy)]
pub struct Rfc3339Format;

#[derive(Debug, Clone, Copy)]
pub struct LocalMicrosFormat;

#[derive(Debug, Clone, Copy)]
pub struct UnixEpochFormat;

impl sealed::Sealed for Rfc3339Format {}
impl sealed::Sealed for LocalMicrosFormat {}
impl sealed::Sealed for UnixEpochFormat {}

impl TimestampFormat for Rfc3339Format {
    const REPR: TimestampRepr = TimestampRepr::Rfc3339;
}

impl TimestampFormat for LocalMicrosFormat {
    const REPR: TimestampRepr = TimestampRepr::LocalMicrosecond;
}

impl TimestampFormat for UnixEpochFormat {
    const REPR: TimestampRepr = TimestampRepr::UnixEpochFloat;
}

/// An instant tagged with the encoding its field uses on the wire.
pub struct Stamp<F> {
    instant: DateTime<Utc>,
    _format: PhantomData<fn() -> F>,
}

pub type Rfc3339Time = Stamp<Rfc3339Format>;
pub type LocalTime = Stamp<LocalMicrosFormat>;
pub type UnixTime = Stamp<UnixEpochFormat>;

impl<F: TimestampFormat> Stamp<F> {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            _format: PhantomData,
        }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn repr(&self) -> TimestampRepr {
        F::REPR
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn parse(text: &str) -> Result<Self> {
        F::REPR.parse(text).map(Self::new)
    }

    pub fn to_wire(&self) -> String {
        F::REPR.format(&self.instant)
    }

    pub fn from_epoch_seconds(seconds: f64) -> Result<Self> {
        from_epoch_seconds(seconds).map(Self::new)
    }

    pub fn epoch_seconds(&self) -> f64 {
        epoch_seconds(&self.instant)
    }

    /// Re-tags the same instant with another wire encoding.
    pub fn convert<G: TimestampFormat>(&self) -> Stamp<G> {
        Stamp::new(self.instant)
    }
}

impl<F: TimestampFormat> From<DateTime<Utc>> for Stamp<F> {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::new(instant)
    }
}

impl<F> Clone for Stamp<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Stamp<F> {}

impl<F> PartialEq for Stamp<F> {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl<F> Eq for Stamp<F> {}

impl<F> Default for Stamp<F> {
    fn default() -> Self {
        Self {
            instant: DateTime::UNIX_EPOCH,
            _format: PhantomData,
        }
    }
}

impl<F: TimestampFormat> fmt::Debug for Stamp<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stamp<{:?}>({})", F::REPR, self.instant.to_rfc3339())
    }
}

impl<F: TimestampFormat> fmt::Display for Stamp<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl<F: TimestampFormat> Serialize for Stamp<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match F::REPR {
            TimestampRepr::UnixEpochFloat => serializer.serialize_f64(self.epoch_seconds()),
            _ => serializer.collect_str(&self.to_wire()),
        }
    }
}
