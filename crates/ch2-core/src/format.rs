//! Unit-aware presentation of statistic values.

use crate::value::JournalValue;

/// Distances strictly above this many metres are shown in kilometres.
pub const DEFAULT_KM_THRESHOLD: f64 = 2000.0;

/// Display options that are not part of the stored data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatOptions {
    pub km_threshold: f64,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            km_threshold: DEFAULT_KM_THRESHOLD,
        }
    }
}

/// Renders a value using its statistic's units as a display hint.
///
/// Returns `None` when the value is absent.
pub fn format_value(
    value: &JournalValue,
    units: Option<&str>,
    options: &FormatOptions,
) -> Option<String> {
    let units = units.filter(|u| !u.is_empty());
    match value {
        JournalValue::Integer(v) => v.map(|v| format_integer(v, units, options)),
        JournalValue::Float(v) => v.map(|v| format_float(v, units, options)),
        JournalValue::Text(v) => v.as_ref().map(|v| match units {
            Some(units) => format!("{v}{units}"),
            None => v.clone(),
        }),
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "threshold comparison only"
)]
fn format_integer(value: i64, units: Option<&str>, options: &FormatOptions) -> String {
    match units {
        None => value.to_string(),
        Some("m") if value as f64 > options.km_threshold => format!("{}km", value / 1000),
        Some("s") => format_seconds(value),
        Some(units) => format!("{value}{units}"),
    }
}

fn format_float(value: f64, units: Option<&str>, options: &FormatOptions) -> String {
    match units {
        None => format!("{value:.6}"),
        Some("m") if value > options.km_threshold => format!("{:.1}km", value / 1000.0),
        Some("m") => format!("{}m", whole(value)),
        Some("s") => format_seconds(whole(value)),
        Some("km/h") => format!("{value:.1}km/h"),
        Some("%") => format!("{value:.1}%"),
        Some("bpm") => format!("{}bpm", whole(value)),
        Some(units) => format!("{value:?}{units}"),
    }
}

/// Truncates towards zero, saturating at the `i64` bounds.
#[expect(
    clippy::cast_possible_truncation,
    reason = "truncation is the intended display rounding"
)]
const fn whole(value: f64) -> i64 {
    value as i64
}

/// Formats a duration in seconds as `H:MM:SS`.
pub fn format_seconds(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{sign}{hours}:{minutes:02}:{seconds:02}")
}
