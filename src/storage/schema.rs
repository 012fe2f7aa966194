//! Schema constants and read-side row types
//!
//! ## Tables
//!
//! - `hosts(id, name)`
//! - `items(id, host_id -> hosts, name, item_key, category, value_kind)`
//! - `history(id, item_id -> items, clock, value)` append-only
//! - `feedbacks(id, host_id, item, feedback, comment, created_at)`
//!
//! ## Derived view
//!
//! `history_readable` joins history with items and adds a readable UTC
//! timestamp and the value converted from bytes to GiB (two decimals).
//! The history table may hold the same `(item_id, clock)` more than once
//! because every run re-reads an overlapping window; the view keeps only
//! the earliest written row of each pair.

use serde::{Deserialize, Serialize};

/// Drop statement issued before recreating the view
pub const DROP_HISTORY_VIEW: &str = "DROP VIEW IF EXISTS history_readable";

/// Definition of the derived view
pub const CREATE_HISTORY_VIEW: &str = r#"
CREATE VIEW history_readable AS
SELECT
    h.id,
    h.item_id,
    i.name,
    i.item_key,
    i.category,
    datetime(h.clock, 'unixepoch') AS time,
    ROUND(h.value / 1073741824.0, 2) AS value_in_gb
FROM history h
JOIN items i ON h.item_id = i.id
WHERE h.id = (
    SELECT MIN(d.id) FROM history d
    WHERE d.item_id = h.item_id AND d.clock = h.clock
)
"#;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Convert a raw byte value the way the view does
pub fn bytes_to_gib(value: f64) -> f64 {
    (value / BYTES_PER_GIB * 100.0).round() / 100.0
}

/// One point of a chart series, as served to dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Item name
    pub metric: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC
    pub time: String,
    /// Converted value
    pub value: f64,
}

/// Row counts of the entity tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTotals {
    pub hosts: u64,
    pub items: u64,
    pub history: u64,
}
