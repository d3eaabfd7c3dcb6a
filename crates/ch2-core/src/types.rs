//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation and parse errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The untyped base discriminator cannot carry a value.
    #[error("cannot create a value for the untyped statistic discriminator")]
    Untyped,

    /// A raw value could not be parsed as the requested type.
    #[error("cannot parse {raw:?} as {kind}")]
    Parse { kind: &'static str, raw: String },

    /// Unknown journal discriminator, either by name or stored code.
    #[error("unknown statistic journal type: {value}")]
    UnknownType { value: String },

    /// Unknown source kind.
    #[error("invalid source kind: {value}")]
    InvalidSourceKind { value: String },

    /// Unknown measure ordering.
    #[error("invalid measure order: {value} (expected higher or lower)")]
    InvalidMeasureOrder { value: String },
}

/// The kind of record that owns statistic journals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An imported activity file.
    Activity,
    /// A diary day.
    Diary,
    /// Continuous monitor data (daily steps, resting heart rate).
    Monitor,
    /// A computed interval tied to a schedule.
    Interval,
}

impl SourceKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Diary => "diary",
            Self::Monitor => "monitor",
            Self::Interval => "interval",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" => Ok(Self::Activity),
            "diary" => Ok(Self::Diary),
            "monitor" => Ok(Self::Monitor),
            "interval" => Ok(Self::Interval),
            _ => Err(ValueError::InvalidSourceKind {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValueError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValueError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// The producer that writes values under a statistic name.
    ///
    /// Two unrelated producers may pick the same human-readable name; the owner
    /// keeps them apart (e.g. "monitor", "diary", "activity.summary").
    Owner, "owner"
);

define_string_id!(
    /// A recurrence schedule, e.g. "m" for monthly.
    Schedule, "schedule"
);
