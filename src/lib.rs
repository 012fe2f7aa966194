pub mod actors;
pub mod api;
pub mod classify;
pub mod config;
pub mod source;
pub mod storage;
pub mod sync;
pub mod util;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use classify::{Category, classify};

/// A monitored machine or service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    pub name: String,
}

/// A single numeric metric monitored on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub host_id: String,
    pub name: String,
    pub key: String,
    pub category: Category,
    pub value_kind: ValueKind,
}

impl Item {
    /// Build an item, deriving its category from the key
    pub fn new(
        id: impl Into<String>,
        host_id: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
        value_kind: ValueKind,
    ) -> Self {
        let key = key.into();
        Self {
            id: id.into(),
            host_id: host_id.into(),
            name: name.into(),
            category: classify(&key),
            key,
            value_kind,
        }
    }
}

/// One timestamped measurement of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub item_id: String,
    /// Unix seconds
    pub clock: i64,
    pub value: f64,
}

/// Free-form user annotation on a host (and optionally one of its items)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub host_id: String,
    pub item: Option<String>,
    pub feedback: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Numeric value types retained by the pipeline
///
/// The monitoring API encodes value types as small integers:
/// `0` float, `1` character, `2` log, `3` unsigned, `4` text.
/// Only the numeric ones have a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Float,
    UnsignedInt,
}

impl ValueKind {
    /// Map a raw `value_type` code, `None` for non-numeric or unknown codes
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().parse::<u8>().ok()? {
            0 => Some(ValueKind::Float),
            3 => Some(ValueKind::UnsignedInt),
            _ => None,
        }
    }

    /// The `value_type` code, which is also the history table selector
    pub fn code(&self) -> u8 {
        match self {
            ValueKind::Float => 0,
            ValueKind::UnsignedInt => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Float => "float",
            ValueKind::UnsignedInt => "unsigned",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float" => Ok(ValueKind::Float),
            "unsigned" => Ok(ValueKind::UnsignedInt),
            other => Err(format!("unknown value kind: {other}")),
        }
    }
}
