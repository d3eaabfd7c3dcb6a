//! Statistic journal discriminator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::ValueError;

/// The type tag stored with every journal entry.
///
/// The tag is written once when the entry is created and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticJournalType {
    /// Untyped base case. Never carries a value.
    Statistic,
    Integer,
    Float,
    Text,
}

impl StatisticJournalType {
    /// Integer code stored in `statistic_journal.type`.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Statistic => 0,
            Self::Integer => 1,
            Self::Float => 2,
            Self::Text => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, ValueError> {
        match code {
            0 => Ok(Self::Statistic),
            1 => Ok(Self::Integer),
            2 => Ok(Self::Float),
            3 => Ok(Self::Text),
            _ => Err(ValueError::UnknownType {
                value: code.to_string(),
            }),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Statistic => "statistic",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for StatisticJournalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatisticJournalType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "statistic" => Ok(Self::Statistic),
            "integer" | "int" => Ok(Self::Integer),
            "float" | "real" => Ok(Self::Float),
            "text" | "str" => Ok(Self::Text),
            _ => Err(ValueError::UnknownType {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for StatisticJournalType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatisticJournalType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
