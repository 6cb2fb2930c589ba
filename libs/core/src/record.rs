//! Records: structs with a static per-field wire table.
//!
//! `#[derive(Record)]` emits [`Record::FIELDS`] in declaration order plus the
//! code that binds and stringifies each entry through [`FieldValue`]. The
//! codecs never look at a struct in any other way.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::field::FieldValue;
use crate::literal;
use crate::value::Value;

/// Which of a field's names a codec speaks, and how strictly it binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// Resolved wire name; a missing non-omittable property is an error.
    Text,
    /// Presentation name; missing properties take their default.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub ident: &'static str,
    pub wire_name: &'static str,
    pub json_name: &'static str,
    pub omittable: bool,
}

impl FieldSpec {
    pub fn name(&self, naming: Naming) -> &'static str {
        match naming {
            Naming::Text => self.wire_name,
            Naming::Json => self.json_name,
        }
    }
}

/// A single property as a codec found it.
#[derive(Debug, Clone, Copy)]
pub enum Wire<'a> {
    Text(&'a str),
    Tree(&'a Value),
}

pub trait FieldSource {
    fn lookup(&self, name: &str) -> Option<Wire<'_>>;
}

impl FieldSource for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<Wire<'_>> {
        self.get(name).map(|text| Wire::Text(text))
    }
}

impl FieldSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<Wire<'_>> {
        self.get(name).map(|text| Wire::Text(text))
    }
}

impl FieldSource for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Wire<'_>> {
        self.get(name).map(Wire::Tree)
    }
}

pub trait Record: FieldValue {
    const FIELDS: &'static [FieldSpec];

    fn bind(source: &dyn FieldSource, naming: Naming) -> Result<Self>;

    /// `(wire name, text)` pairs in declaration order.
    fn to_text_fields(&self) -> Vec<(&'static str, String)>;

    fn to_value_fields(&self, naming: Naming) -> BTreeMap<String, Value>;
}

pub fn bind_field<T: FieldValue + Default>(
    source: &dyn FieldSource,
    naming: Naming,
    spec: &FieldSpec,
) -> Result<T> {
    let name = spec.name(naming);
    match source.lookup(name) {
        Some(Wire::Text(text)) => T::from_text(text).map_err(|e| e.in_field(name)),
        Some(Wire::Tree(Value::Null)) | None if spec.omittable || naming == Naming::Json => {
            Ok(T::default())
        }
        Some(Wire::Tree(value)) => T::from_value(value, naming).map_err(|e| e.in_field(name)),
        None => Err(Error::MissingField(name.to_string())),
    }
}

pub fn record_from_text<R: Record>(text: &str) -> Result<R> {
    record_from_value(&literal::parse(text)?, Naming::Text)
}

pub fn record_from_value<R: Record>(value: &Value, naming: Naming) -> Result<R> {
    match value {
        Value::Map(map) => R::bind(map, naming),
        Value::String(text) => record_from_text(text),
        other => Err(Error::mismatch("a map", other.kind())),
    }
}

pub fn record_to_text<R: Record>(record: &R) -> String {
    literal::render(&Value::Map(record.to_value_fields(Naming::Text)))
}
