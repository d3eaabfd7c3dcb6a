//! Rank, percentile and quartile computation over a set of values.
//!
//! Rankings are computed without touching storage so a failure here leaves
//! any previously stored measures untouched.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ValueError;
use crate::value::JournalValue;

/// Quartile boundaries in write order. Later writes win when two boundaries
/// land on the same entry, so the extremes are always kept.
const QUARTILE_PRECEDENCE: [u8; 5] = [1, 3, 2, 0, 4];

/// Which direction counts as better for a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureOrder {
    /// Larger values rank first (distance, power).
    Higher,
    /// Smaller values rank first (time over a fixed distance).
    Lower,
}

impl MeasureOrder {
    /// Compares two values, best first. Absent and text values sort last.
    pub fn compare(self, a: &JournalValue, b: &JournalValue) -> Ordering {
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => match self {
                Self::Higher => y.total_cmp(&x),
                Self::Lower => x.total_cmp(&y),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Higher => "higher",
            Self::Lower => "lower",
        }
    }
}

impl fmt::Display for MeasureOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasureOrder {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "higher" => Ok(Self::Higher),
            "lower" => Ok(Self::Lower),
            _ => Err(ValueError::InvalidMeasureOrder {
                value: s.to_string(),
            }),
        }
    }
}

/// The ranking of one entry within its set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranking {
    /// Position of the entry in the input slice.
    pub index: usize,
    /// 1 is best.
    pub rank: usize,
    /// 100 is best.
    pub percentile: f64,
    /// 0 (worst) to 4 (best), only at the five quantile boundaries.
    pub quartile: Option<u8>,
}

/// Ranks `entries` using `better`, which must order the best entry first.
///
/// Ties keep input order, so the first-seen entry takes the better rank.
/// The result is in input order: `rankings[i].index == i`.
#[expect(
    clippy::cast_precision_loss,
    reason = "entry counts are far below 2^52"
)]
pub fn rank_by<T, F>(entries: &[T], mut better: F) -> Vec<Ranking>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let n = entries.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| better(&entries[a], &entries[b]));

    let mut rankings: Vec<Ranking> = (0..n)
        .map(|index| Ranking {
            index,
            rank: 0,
            percentile: 0.0,
            quartile: None,
        })
        .collect();

    for (position, &index) in order.iter().enumerate() {
        let rank = position + 1;
        rankings[index].rank = rank;
        rankings[index].percentile = 100.0 * (n - rank + 1) as f64 / n as f64;
    }

    if n > 0 {
        for quartile in QUARTILE_PRECEDENCE {
            // position counted from the worst entry
            let from_worst = (usize::from(quartile) * (n - 1) + 2) / 4;
            let index = order[n - 1 - from_worst];
            rankings[index].quartile = Some(quartile);
        }
    }

    rankings
}

/// Ranks journal values in the given direction.
pub fn rank_values(values: &[JournalValue], order: MeasureOrder) -> Vec<Ranking> {
    rank_by(values, |a, b| order.compare(a, b))
}
