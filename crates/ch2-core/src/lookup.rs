//! Keyed lookups that log before reporting a miss.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use thiserror::Error;

/// A key was not present in a lookup table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no {what} for {key}")]
pub struct NotFound {
    pub what: &'static str,
    pub key: String,
}

/// Looks up `key`, logging a warning and returning [`NotFound`] on a miss.
pub fn lookup_or_warn<'a, K, V, Q>(
    map: &'a HashMap<K, V>,
    key: &Q,
    what: &'static str,
) -> Result<&'a V, NotFound>
where
    K: Borrow<Q> + Eq + Hash,
    Q: Eq + Hash + fmt::Display + ?Sized,
{
    map.get(key).ok_or_else(|| {
        tracing::warn!(%key, what, "lookup miss");
        NotFound {
            what,
            key: key.to_string(),
        }
    })
}
