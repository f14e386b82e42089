// targetry-core/src/domain/incremental.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a model refreshes its data, independent of the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementalKind {
    /// Merge rows by a unique key.
    UniqueKey,
    /// Append rows for a time range.
    TimeRange,
    Unmanaged,
}

impl IncrementalKind {
    pub const ALL: [IncrementalKind; 3] = [Self::UniqueKey, Self::TimeRange, Self::Unmanaged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UniqueKey => "unique_key",
            Self::TimeRange => "time_range",
            Self::Unmanaged => "unmanaged",
        }
    }
}

impl fmt::Display for IncrementalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IncrementalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "unique_key" | "incremental_by_unique_key" => Ok(Self::UniqueKey),
            "time_range" | "incremental_by_time_range" => Ok(Self::TimeRange),
            "unmanaged" | "incremental_unmanaged" => Ok(Self::Unmanaged),
            _ => Err(format!("Unknown incremental kind: {}", s)),
        }
    }
}
