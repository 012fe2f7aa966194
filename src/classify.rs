//! Item key classification
//!
//! Every item is tagged with a coarse category derived from its key. The
//! rules are prefix checks evaluated in a fixed order, except for memory,
//! which also matches the substring `memory` anywhere in the key. That
//! broader match is relied upon by existing categorizations and must stay.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse classification of an item's metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "CPU")]
    Cpu,
    Memory,
    Disk,
    Network,
    Service,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Cpu,
        Category::Memory,
        Category::Disk,
        Category::Network,
        Category::Service,
        Category::Other,
    ];

    /// Name as stored in the `items.category` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cpu => "CPU",
            Category::Memory => "Memory",
            Category::Disk => "Disk",
            Category::Network => "Network",
            Category::Service => "Service",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCategoryError(pub String);

impl fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for ParseCategoryError {}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Classify an item key, first matching rule wins
pub fn classify(key: &str) -> Category {
    if key.starts_with("system.cpu") {
        Category::Cpu
    } else if key.starts_with("vm.memory") || key.contains("memory") {
        Category::Memory
    } else if key.starts_with("vfs.fs.") {
        Category::Disk
    } else if key.starts_with("net.if") || key.starts_with("net.") {
        Category::Network
    } else if key.starts_with("service.info") {
        Category::Service
    } else {
        Category::Other
    }
}
