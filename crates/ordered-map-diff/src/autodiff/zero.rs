//! Deferred zero tangents built from a key snapshot.

use super::tangent::TangentVector;
use crate::differentiable::{AdditiveArithmetic, ZeroTangentInitializer};
use indexmap::IndexMap;
use std::hash::Hash;

/// Copy the key list of `map`, leaving the values behind.
pub fn snapshot_keys<K: Clone, V>(map: &IndexMap<K, V>) -> Vec<K> {
    map.keys().cloned().collect()
}

/// Deferred producer of a zero tangent with one explicit entry per key.
///
/// Only `keys` is captured, so the producer stays cheap to hold even when
/// the map it was taken from carries large values.
///
/// # Example
///
/// ```
/// use ordered_map_diff::autodiff::zero_initializer;
///
/// let init = zero_initializer::<&str, f64>(vec!["a", "b"]);
/// let zero = init();
/// assert_eq!(zero.len(), 2);
/// assert_eq!(zero[&"a"], 0.0);
/// ```
pub fn zero_initializer<K, T>(keys: Vec<K>) -> ZeroTangentInitializer<TangentVector<K, T>>
where
    K: Hash + Eq + Clone + 'static,
    T: AdditiveArithmetic + 'static,
{
    Box::new(move || TangentVector::zero_filled(&keys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_keys_order() {
        let mut map = IndexMap::new();
        map.insert("z", 1.0);
        map.insert("a", 2.0);
        map.insert("m", 3.0);

        assert_eq!(snapshot_keys(&map), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_initializer_outlives_map() {
        let init = {
            let map = IndexMap::from([("s1", vec![1.0; 1024]), ("s2", vec![2.0; 1024])]);
            zero_initializer::<_, f64>(snapshot_keys(&map))
        };

        let zero = init();
        assert_eq!(zero, TangentVector::from([("s1", 0.0), ("s2", 0.0)]));
    }

    #[test]
    fn test_initializer_is_reusable() {
        let init = zero_initializer::<&str, f64>(vec!["a"]);
        let mut first = init();
        first.accumulate("a", 5.0);

        assert_eq!(init()[&"a"], 0.0);
    }

    #[test]
    fn test_initializer_empty_keys() {
        let init = zero_initializer::<&str, f64>(Vec::new());
        assert!(init().is_empty());
    }
}
