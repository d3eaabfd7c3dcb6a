//! Typed statistic values.

use serde_json::Value;

use crate::journal_type::StatisticJournalType;
use crate::types::ValueError;

/// A journal value, tagged with its type.
///
/// The inner `Option` is `None` when the producer recorded the statistic
/// without a value.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalValue {
    Integer(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
}

impl JournalValue {
    /// The discriminator this value is stored under.
    #[must_use]
    pub const fn kind(&self) -> StatisticJournalType {
        match self {
            Self::Integer(_) => StatisticJournalType::Integer,
            Self::Float(_) => StatisticJournalType::Float,
            Self::Text(_) => StatisticJournalType::Text,
        }
    }

    /// An absent value of the given type.
    pub fn empty(kind: StatisticJournalType) -> Result<Self, ValueError> {
        match kind {
            StatisticJournalType::Statistic => Err(ValueError::Untyped),
            StatisticJournalType::Integer => Ok(Self::Integer(None)),
            StatisticJournalType::Float => Ok(Self::Float(None)),
            StatisticJournalType::Text => Ok(Self::Text(None)),
        }
    }

    /// Parses raw text into a value of the given type.
    pub fn parse(kind: StatisticJournalType, raw: &str) -> Result<Self, ValueError> {
        let parse_err = || ValueError::Parse {
            kind: kind.as_str(),
            raw: raw.to_string(),
        };
        match kind {
            StatisticJournalType::Statistic => Err(ValueError::Untyped),
            StatisticJournalType::Integer => raw
                .trim()
                .parse()
                .map(|v| Self::Integer(Some(v)))
                .map_err(|_| parse_err()),
            StatisticJournalType::Float => raw
                .trim()
                .parse()
                .map(|v| Self::Float(Some(v)))
                .map_err(|_| parse_err()),
            StatisticJournalType::Text => Ok(Self::Text(Some(raw.to_string()))),
        }
    }

    /// Builds a value of the given type from decoded JSON.
    ///
    /// `null` produces an absent value. Integers are accepted for float
    /// statistics; floats are not accepted for integer statistics.
    pub fn from_json(kind: StatisticJournalType, raw: &Value) -> Result<Self, ValueError> {
        if raw.is_null() {
            return Self::empty(kind);
        }
        let parse_err = || ValueError::Parse {
            kind: kind.as_str(),
            raw: raw.to_string(),
        };
        match kind {
            StatisticJournalType::Statistic => Err(ValueError::Untyped),
            StatisticJournalType::Integer => raw
                .as_i64()
                .map(|v| Self::Integer(Some(v)))
                .ok_or_else(parse_err),
            StatisticJournalType::Float => raw
                .as_f64()
                .map(|v| Self::Float(Some(v)))
                .ok_or_else(parse_err),
            StatisticJournalType::Text => match raw {
                Value::String(s) => Ok(Self::Text(Some(s.clone()))),
                other => Ok(Self::Text(Some(other.to_string()))),
            },
        }
    }

    /// Numeric view used for ranking. Text and absent values have none.
    #[expect(
        clippy::cast_precision_loss,
        reason = "ranking tolerates precision loss above 2^53"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(Some(v)) => Some(*v as f64),
            Self::Float(Some(v)) => Some(*v),
            _ => None,
        }
    }
}
