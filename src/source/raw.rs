//! Raw transfer objects returned by the monitoring API
//!
//! The API returns identifiers and numbers as strings (and occasionally as
//! bare JSON numbers), so these shapes stay permissive on input. Typed
//! domain values are produced by explicit conversion: `RawItem::value_kind`
//! decides whether an item is kept, and `RawSample::sanitize` turns a
//! sample into a `HistoryRecord` or a `SanitizationError`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{HistoryRecord, Host, Item, ValueKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHost {
    #[serde(deserialize_with = "lenient_string")]
    pub hostid: String,
    pub host: String,
}

impl RawHost {
    pub fn into_host(self) -> Host {
        Host {
            id: self.hostid,
            name: self.host,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(deserialize_with = "lenient_string")]
    pub itemid: String,
    #[serde(deserialize_with = "lenient_string")]
    pub hostid: String,
    pub name: String,
    #[serde(rename = "key_")]
    pub key: String,
    #[serde(deserialize_with = "lenient_string")]
    pub value_type: String,
}

impl RawItem {
    /// Numeric kind of this item, `None` for character, log and text items
    pub fn value_kind(&self) -> Option<ValueKind> {
        ValueKind::from_code(&self.value_type)
    }

    /// Convert into a domain item, classifying its key
    pub fn into_item(self, kind: ValueKind) -> Item {
        Item::new(self.itemid, self.hostid, self.name, self.key, kind)
    }
}

/// One history sample exactly as the API returned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub clock: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl RawSample {
    pub fn new(clock: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            clock: Some(clock.into()),
            value: Some(value.into()),
        }
    }

    /// Coerce the sample into a record for `item_id`
    ///
    /// `clock` must be an integer (JSON number or decimal string) and
    /// `value` a finite float (JSON number or numeric string).
    pub fn sanitize(&self, item_id: &str) -> Result<HistoryRecord, SanitizationError> {
        let clock = coerce_clock(self.clock.as_ref())
            .ok_or_else(|| SanitizationError::new(SampleField::Clock, self.clock.as_ref()))?;
        let value = coerce_value(self.value.as_ref())
            .ok_or_else(|| SanitizationError::new(SampleField::Value, self.value.as_ref()))?;

        Ok(HistoryRecord {
            item_id: item_id.to_string(),
            clock,
            value,
        })
    }
}

fn coerce_clock(raw: Option<&Value>) -> Option<i64> {
    match raw? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_value(raw: Option<&Value>) -> Option<f64> {
    let value = match raw? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Which field of a sample failed to coerce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleField {
    Clock,
    Value,
}

impl fmt::Display for SampleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleField::Clock => f.write_str("clock"),
            SampleField::Value => f.write_str("value"),
        }
    }
}

/// A single sample could not be coerced to the expected numeric types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationError {
    pub field: SampleField,
    /// The offending raw value, `None` when the field was missing or null
    pub raw: Option<String>,
}

impl SanitizationError {
    fn new(field: SampleField, raw: Option<&Value>) -> Self {
        Self {
            field,
            raw: raw.filter(|v| !v.is_null()).map(Value::to_string),
        }
    }
}

impl fmt::Display for SanitizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            Some(raw) => write!(f, "invalid {}: {}", self.field, raw),
            None => write!(f, "missing {}", self.field),
        }
    }
}

impl std::error::Error for SanitizationError {}

/// Outcome of sanitizing the samples of one item
#[derive(Debug, Default)]
pub struct SanitizedBatch {
    pub records: Vec<HistoryRecord>,
    pub rejected: Vec<SanitizationError>,
}

/// Sanitize every sample, keeping the good ones in their original order
pub fn sanitize_samples(
    item_id: &str,
    samples: impl IntoIterator<Item = RawSample>,
) -> SanitizedBatch {
    let mut batch = SanitizedBatch::default();
    for sample in samples {
        match sample.sanitize(item_id) {
            Ok(record) => batch.records.push(record),
            Err(e) => batch.rejected.push(e),
        }
    }
    batch
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
