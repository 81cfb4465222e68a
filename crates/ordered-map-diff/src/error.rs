//! Error types for ordered-map-diff.

use thiserror::Error;

/// Errors that can occur while applying or pulling back map gradients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// A tangent names a key the primal map does not contain.
    #[error("missing component {key} in moved map")]
    MissingComponent { key: String },

    /// Offset outside `0..len`.
    #[error("index out of bounds: offset {index} is out of range for map with {len} entries")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A normalized accumulator lacks the key a write pullback must claim.
    #[error("accumulator with {len} entries has no slot for written key {key}")]
    MissingAccumulatorEntry { key: String, len: usize },

    /// Per-position gradient count does not match the captured key count.
    #[error("gradient count mismatch: expected {expected} values, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Seed attached to a node that was never recorded.
    #[error("node {index} is not recorded on this tape")]
    UnknownNode { index: usize },

    /// Seed shape does not fit the recorded operation.
    #[error("seed for node {index} does not match the recorded operation: expected {expected}")]
    SeedMismatch {
        index: usize,
        expected: &'static str,
    },
}

impl DiffError {
    pub(crate) fn missing_component<K: std::fmt::Debug>(key: &K) -> Self {
        DiffError::MissingComponent {
            key: format!("{key:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_component_message() {
        let err = DiffError::missing_component(&"s2");
        assert_eq!(err.to_string(), "missing component \"s2\" in moved map");
    }

    #[test]
    fn test_index_out_of_bounds_message() {
        let err = DiffError::IndexOutOfBounds { index: 3, len: 2 };
        assert!(err.to_string().contains("offset 3"));
        assert!(err.to_string().contains("2 entries"));
    }
}
