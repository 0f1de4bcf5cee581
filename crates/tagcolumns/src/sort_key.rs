//! Comparable sort keys produced by columns and sort adapters.
//!
//! [`SortKey`] is a closed sum type with a total [`Ord`]. Keys of the same
//! shape compare by value; keys of different shapes compare by a fixed rank
//! so that a sort can never fail half way through. Adapters still keep every
//! key they emit for a column in one shape (usually a `(category, value)`
//! tuple), since rank ordering between shapes carries no meaning for users.

use std::cmp::Ordering;

use crate::collate::{casefold, CollationKey, NaturalKey};

/// A totally ordered sort key.
#[derive(Debug, Clone)]
pub enum SortKey {
    /// Integer key (lengths, category flags).
    Int(i64),
    /// Floating point key, compared with [`f64::total_cmp`].
    Number(f64),
    /// Plain text key, compared by code point.
    Text(String),
    /// Caseless, accent-insensitive text key.
    Collated(CollationKey),
    /// Natural (alphanumeric) text key.
    Natural(NaturalKey),
    /// Lexicographically compared components.
    Tuple(Vec<SortKey>),
    /// The wrapped key with its ordering inverted.
    Reversed(Box<SortKey>),
}

impl SortKey {
    /// Creates a plain text key from casefolded text.
    pub fn casefolded(text: &str) -> Self {
        SortKey::Text(casefold(text))
    }

    /// Creates a collation key.
    pub fn collated(text: &str) -> Self {
        SortKey::Collated(CollationKey::new(text))
    }

    /// Creates a natural sort key.
    pub fn natural(text: &str) -> Self {
        SortKey::Natural(NaturalKey::new(text))
    }

    /// Creates a tuple key.
    pub fn tuple(parts: impl IntoIterator<Item = SortKey>) -> Self {
        SortKey::Tuple(parts.into_iter().collect())
    }

    /// Wraps a key so that it sorts in the opposite direction.
    pub fn reversed(self) -> Self {
        SortKey::Reversed(Box::new(self))
    }

    /// Returns `true` for structured (tuple) keys.
    pub fn is_tuple(&self) -> bool {
        matches!(self, SortKey::Tuple(_))
    }

    /// Returns the tuple components, if this is a tuple key.
    pub fn as_tuple(&self) -> Option<&[SortKey]> {
        match self {
            SortKey::Tuple(parts) => Some(parts),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Int(_) => 0,
            SortKey::Number(_) => 1,
            SortKey::Text(_) => 2,
            SortKey::Collated(_) => 3,
            SortKey::Natural(_) => 4,
            SortKey::Tuple(_) => 5,
            SortKey::Reversed(_) => 6,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Int(a), SortKey::Int(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Collated(a), SortKey::Collated(b)) => a.cmp(b),
            (SortKey::Natural(a), SortKey::Natural(b)) => a.cmp(b),
            (SortKey::Tuple(a), SortKey::Tuple(b)) => a.cmp(b),
            (SortKey::Reversed(a), SortKey::Reversed(b)) => b.cmp(a),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl From<i64> for SortKey {
    fn from(n: i64) -> Self {
        SortKey::Int(n)
    }
}

impl From<usize> for SortKey {
    fn from(n: usize) -> Self {
        SortKey::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<bool> for SortKey {
    fn from(b: bool) -> Self {
        SortKey::Int(i64::from(b))
    }
}

impl From<f64> for SortKey {
    fn from(n: f64) -> Self {
        SortKey::Number(n)
    }
}

impl From<String> for SortKey {
    fn from(s: String) -> Self {
        SortKey::Text(s)
    }
}

impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        SortKey::Text(s.to_string())
    }
}
