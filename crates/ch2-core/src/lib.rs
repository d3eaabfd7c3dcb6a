//! Core domain logic for ch2 statistics.
//!
//! This crate contains the storage-independent pieces of the statistics engine:
//! - Typed values and the journal discriminator they are stored under
//! - Unit-aware formatting
//! - Content digests used to detect changed and duplicate files
//! - Rank/percentile/quartile computation for interval measures

pub mod digest;
pub mod format;
pub mod journal_type;
pub mod lookup;
pub mod measure;
pub mod types;
pub mod value;

pub use digest::content_hash;
pub use format::{FormatOptions, format_seconds, format_value};
pub use journal_type::StatisticJournalType;
pub use lookup::{NotFound, lookup_or_warn};
pub use measure::{MeasureOrder, Ranking, rank_by, rank_values};
pub use types::{Owner, Schedule, SourceKind, ValueError};
pub use value::JournalValue;
