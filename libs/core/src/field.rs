//! Per-type wire behavior for record fields.
//!
//! Text codecs carry every field as a string; JSON carries a [`Value`]
//! tree. [`FieldValue`] is the compile-time dispatch table that replaces
//! inspecting field types at run time.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::literal;
use crate::record::Naming;
use crate::timestamp::{Stamp, TimestampFormat, TimestampRepr};
use crate::value::Value;

pub trait FieldValue: Sized {
    /// Binds from the text form used by the string and binary protocols.
    fn from_text(text: &str) -> Result<Self>;

    /// Binds from an already structured value.
    fn from_value(value: &Value, naming: Naming) -> Result<Self>;

    /// Stringification for the text protocols.
    fn to_text(&self) -> String;

    fn to_value(&self, naming: Naming) -> Value;
}

impl FieldValue for String {
    fn from_text(text: &str) -> Result<Self> {
        Ok(text.to_string())
    }

    fn from_value(value: &Value, _naming: Naming) -> Result<Self> {
        Ok(match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn to_text(&self) -> String {
        self.clone()
    }

    fn to_value(&self, _naming: Naming) -> Value {
        Value::String(self.clone())
    }
}

impl FieldValue for i64 {
    fn from_text(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(i);
        }
        match text.parse::<f64>() {
            Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
            _ => Err(Error::mismatch("an integer", text)),
        }
    }

    fn from_value(value: &Value, _naming: Naming) -> Result<Self> {
        match value {
            Value::String(s) => Self::from_text(s),
            other => other
                .as_i64()
                .ok_or_else(|| Error::mismatch("an integer", other.kind())),
        }
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn to_value(&self, _naming: Naming) -> Value {
        Value::Integer(*self)
    }
}

impl FieldValue for f64 {
    fn from_text(text: &str) -> Result<Self> {
        let text = text.trim();
        text.parse::<f64>()
            .map_err(|_| Error::mismatch("a number", text))
    }

    fn from_value(value: &Value, _naming: Naming) -> Result<Self> {
        match value {
            Value::String(s) => Self::from_text(s),
            other => other
                .as_f64()
                .ok_or_else(|| Error::mismatch("a number", other.kind())),
        }
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn to_value(&self, _naming: Naming) -> Value {
        Value::Float(*self)
    }
}

impl FieldValue for bool {
    fn from_text(text: &str) -> Result<Self> {
        match text.trim() {
            "1" | "t" | "T" | "true" | "True" | "TRUE" => Ok(true),
            "0" | "f" | "F" | "false" | "False" | "FALSE" => Ok(false),
            other => Err(Error::mismatch("a boolean", other)),
        }
    }

    fn from_value(value: &Value, _naming: Naming) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => Self::from_text(s),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => Err(Error::mismatch("a boolean", other.kind())),
        }
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn to_value(&self, _naming: Naming) -> Value {
        Value::Bool(*self)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    /// Accepts both the comma-joined form and a bracketed literal.
    fn from_text(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        if trimmed.starts_with('[') || trimmed.starts_with('(') {
            return Self::from_value(&literal::parse(trimmed)?, Naming::Text);
        }
        trimmed
            .split(',')
            .enumerate()
            .map(|(i, item)| T::from_text(item.trim()).map_err(|e| e.in_field(&i.to_string())))
            .collect()
    }

    fn from_value(value: &Value, naming: Naming) -> Result<Self> {
        match value {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item, naming).map_err(|e| e.in_field(&i.to_string())))
                .collect(),
            Value::String(s) => Self::from_text(s),
            Value::Null => Ok(Vec::new()),
            other => Err(Error::mismatch("a list", other.kind())),
        }
    }

    /// Scalar lists are comma-joined; nested ones fall back to a literal.
    fn to_text(&self) -> String {
        let items: Vec<Value> = self.iter().map(|item| item.to_value(Naming::Text)).collect();
        if items.iter().all(Value::is_scalar) {
            self.iter().map(T::to_text).collect::<Vec<_>>().join(",")
        } else {
            literal::render(&Value::List(items))
        }
    }

    fn to_value(&self, naming: Naming) -> Value {
        Value::List(self.iter().map(|item| item.to_value(naming)).collect())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    /// Empty text and the null literals read as absent.
    fn from_text(text: &str) -> Result<Self> {
        match text.trim() {
            "" | "None" | "null" => Ok(None),
            _ => T::from_text(text).map(Some),
        }
    }

    fn from_value(value: &Value, naming: Naming) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, naming).map(Some),
        }
    }

    fn to_text(&self) -> String {
        self.as_ref().map(T::to_text).unwrap_or_default()
    }

    fn to_value(&self, naming: Naming) -> Value {
        self.as_ref()
            .map(|inner| inner.to_value(naming))
            .unwrap_or(Value::Null)
    }
}

impl<T: FieldValue> FieldValue for BTreeMap<String, T> {
    fn from_text(text: &str) -> Result<Self> {
        Self::from_value(&literal::parse(text)?, Naming::Text)
    }

    fn from_value(value: &Value, naming: Naming) -> Result<Self> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(key, item)| {
                    T::from_value(item, naming)
                        .map(|bound| (key.clone(), bound))
                        .map_err(|e| e.in_field(key))
                })
                .collect(),
            Value::String(s) => Self::from_text(s),
            Value::Null => Ok(Self::new()),
            other => Err(Error::mismatch("a map", other.kind())),
        }
    }

    fn to_text(&self) -> String {
        literal::render(&self.to_value(Naming::Text))
    }

    fn to_value(&self, naming: Naming) -> Value {
        Value::Map(
            self.iter()
                .map(|(key, item)| (key.clone(), item.to_value(naming)))
                .collect(),
        )
    }
}

impl FieldValue for Value {
    /// Open-ended fields take bare scalars as they are and only parse text
    /// that looks structural.
    fn from_text(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if is_integer(trimmed) {
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::Integer(i));
            }
        }
        if is_integer(trimmed) || is_decimal(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Ok(Value::Float(f));
            }
        }
        match trimmed {
            "true" | "True" => return Ok(Value::Bool(true)),
            "false" | "False" => return Ok(Value::Bool(false)),
            _ => {}
        }
        if !trimmed.contains(['{', '[', '(']) {
            return Ok(Value::String(text.to_string()));
        }
        literal::parse(trimmed)
    }

    fn from_value(value: &Value, _naming: Naming) -> Result<Self> {
        Ok(value.clone())
    }

    fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => literal::render(other),
        }
    }

    fn to_value(&self, _naming: Naming) -> Value {
        self.clone()
    }
}

impl<F: TimestampFormat> FieldValue for Stamp<F> {
    fn from_text(text: &str) -> Result<Self> {
        Self::parse(text)
    }

    fn from_value(value: &Value, _naming: Naming) -> Result<Self> {
        match (value, F::REPR) {
            (Value::String(s), _) => Self::parse(s),
            (Value::Float(f), TimestampRepr::UnixEpochFloat) => Self::from_epoch_seconds(*f),
            (Value::Integer(i), TimestampRepr::UnixEpochFloat) => {
                Self::from_epoch_seconds(*i as f64)
            }
            (other, repr) => Err(Error::mismatch(
                &format!("a {repr:?} timestamp"),
                other.kind(),
            )),
        }
    }

    fn to_text(&self) -> String {
        self.to_wire()
    }

    fn to_value(&self, _naming: Naming) -> Value {
        match F::REPR {
            TimestampRepr::UnixEpochFloat => Value::Float(self.epoch_seconds()),
            _ => Value::String(self.to_wire()),
        }
    }
}

/// `^[-+]?\d+$`
fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `^[-+]?\d*\.\d+$`
fn is_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    match unsigned.split_once('.') {
        Some((whole, fraction)) => {
            whole.bytes().all(|b| b.is_ascii_digit())
                && !fraction.is_empty()
                && fraction.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
