//! Entry filters for folder listings.
//!
//! A filter is a pass-through predicate applied to each hydrated entry name,
//! not an index: keys are still listed and envelopes still fetched, the
//! filter only decides what lands in the result. A folder that fails the
//! filter is dropped together with its subtree.

use glob::Pattern;

use crate::error::{Error, Result};

/// Predicate applied per entry during hydration.
#[derive(Debug, Clone, Default)]
pub enum EntryFilter {
    /// Accept every managed entry.
    #[default]
    All,
    /// Accept entries whose name matches the glob pattern.
    Glob(Pattern),
}

impl EntryFilter {
    /// Build a glob filter from a pattern like `*.txt`.
    pub fn glob(pattern: &str) -> Result<Self> {
        Pattern::new(pattern)
            .map(Self::Glob)
            .map_err(|e| Error::InvalidFilter(format!("{pattern}: {e}")))
    }

    /// Whether an entry with this name passes the filter.
    pub fn accepts(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Glob(pattern) => pattern.matches(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_accepts_everything() {
        assert!(EntryFilter::All.accepts("anything.bin"));
    }

    #[test]
    fn glob_matches_names() {
        let filter = EntryFilter::glob("*.txt").unwrap();
        assert!(filter.accepts("notes.txt"));
        assert!(!filter.accepts("notes.md"));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        assert!(matches!(EntryFilter::glob("[unclosed"), Err(Error::InvalidFilter(_))));
    }
}
