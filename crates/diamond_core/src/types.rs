//! Core type definitions for the diamond.

use std::fmt;

/// Name of the category used when a facet declares none.
pub const DEFAULT_CATEGORY: &str = "default";

/// A named partition of the facet space.
///
/// Each category has its own shard in the cache and is rebuilt independently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Category(String);

impl Category {
    /// Creates a category.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the category name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Category {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Sequence number of a committed cut.
///
/// Sequence numbers order cuts totally; every record emitted by a cut
/// carries its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CutSequence(pub u64);

impl CutSequence {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CutSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cut:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_category_name() {
        assert_eq!(Category::default().as_str(), "default");
        assert_eq!(Category::from("tokens").to_string(), "tokens");
    }

    #[test]
    fn categories_order_by_name() {
        assert!(Category::new("a") < Category::new("b"));
    }

    #[test]
    fn sequence_next() {
        let s = CutSequence::new(5);
        assert_eq!(s.next().as_u64(), 6);
        assert_eq!(format!("{}", s), "cut:5");
    }
}
