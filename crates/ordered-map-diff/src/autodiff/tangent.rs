//! Tangent space of an ordered map.

use crate::differentiable::{AdditiveArithmetic, Differentiable, ZeroTangentInitializer};
use indexmap::IndexMap;
use indexmap::map::Entry;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{Add, AddAssign, Index, Neg, Sub, SubAssign};

/// Gradient of an `IndexMap<K, V>`, keyed like the primal.
///
/// A key absent from the tangent carries zero gradient. Sparse tangents are
/// the normal case: a keyed read produces a single entry and sums of such
/// tangents stay sparse.
///
/// # Equality
///
/// Three comparisons are available:
///
/// - `==` compares key-wise and ignores insertion order.
/// - [`eq_ordered`](Self::eq_ordered) compares position by position. Two
///   tangents built by merging contributions in different orders are not
///   `eq_ordered` even when they assign the same gradient to every key.
/// - [`equivalent`](Self::equivalent) compares as group elements: a missing
///   key and an explicit zero are interchangeable.
///
/// # Example
///
/// ```
/// use ordered_map_diff::autodiff::TangentVector;
///
/// let a = TangentVector::from([("a", 1.0), ("b", 2.0)]);
/// let b = TangentVector::from([("c", 3.0), ("a", 10.0)]);
///
/// let sum = a + b;
/// assert_eq!(sum, TangentVector::from([("a", 11.0), ("b", 2.0), ("c", 3.0)]));
/// ```
#[derive(Debug, Clone)]
pub struct TangentVector<K, T> {
    entries: IndexMap<K, T>,
}

impl<K, T> TangentVector<K, T> {
    /// Create an empty (zero) tangent.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Create an empty tangent with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Number of stored entries, explicit zeros included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, K, T> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, K, T> {
        self.entries.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, K, T> {
        self.entries.values()
    }

    /// Entry at insertion position `index`.
    pub fn get_index(&self, index: usize) -> Option<(&K, &T)> {
        self.entries.get_index(index)
    }

    pub fn as_map(&self) -> &IndexMap<K, T> {
        &self.entries
    }

    pub fn into_inner(self) -> IndexMap<K, T> {
        self.entries
    }
}

impl<K: Hash + Eq, T> TangentVector<K, T> {
    /// Get the gradient stored for `key`.
    pub fn get(&self, key: &K) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    /// Set the gradient for `key`, keeping its position if already present.
    pub fn insert(&mut self, key: K, grad: T) -> Option<T> {
        self.entries.insert(key, grad)
    }

    /// Remove and return the gradient for `key`, preserving the order of the rest.
    pub fn remove(&mut self, key: &K) -> Option<T> {
        self.entries.shift_remove(key)
    }

    /// Check if an entry exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }
}

impl<K: Hash + Eq + Clone, T: AdditiveArithmetic> TangentVector<K, T> {
    /// Tangent with an explicit zero for every key in `keys`.
    pub fn zero_filled(keys: &[K]) -> Self {
        let mut tangent = Self::with_capacity(keys.len());
        for key in keys {
            tangent.entries.insert(key.clone(), T::zero());
        }
        tangent
    }

    /// Accumulate gradient for `key`.
    ///
    /// If an entry already exists, adds to it (for multiple paths).
    pub fn accumulate(&mut self, key: K, grad: T) {
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => add_into(slot.get_mut(), grad),
            Entry::Vacant(slot) => {
                slot.insert(grad);
            }
        }
    }

    /// Make every key in `keys` explicit.
    ///
    /// The result lists `keys` first, in that order, keeping any gradient
    /// already stored and writing zero for the rest. Entries for keys outside
    /// `keys` follow in their previous order.
    pub fn densify(&mut self, keys: &[K]) {
        let mut previous = std::mem::take(&mut self.entries);
        let mut dense = IndexMap::with_capacity(previous.len().max(keys.len()));
        for key in keys {
            if dense.contains_key(key) {
                continue;
            }
            let grad = previous
                .get_mut(key)
                .map(|slot| std::mem::replace(slot, T::zero()))
                .unwrap_or_else(T::zero);
            dense.insert(key.clone(), grad);
        }
        for (key, grad) in previous {
            if !dense.contains_key(&key) {
                dense.insert(key, grad);
            }
        }
        self.entries = dense;
    }

    /// Positional comparison: same keys, same values, same order.
    pub fn eq_ordered(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }

    /// Group-level comparison where a missing key equals an explicit zero.
    pub fn equivalent(&self, other: &Self) -> bool {
        let zero = T::zero();
        self.iter()
            .all(|(key, grad)| other.get(key).unwrap_or(&zero) == grad)
            && other
                .iter()
                .all(|(key, grad)| self.get(key).unwrap_or(&zero) == grad)
    }
}

fn add_into<T: AdditiveArithmetic>(slot: &mut T, grad: T) {
    let current = std::mem::replace(slot, T::zero());
    *slot = current + grad;
}

impl<K, T> Default for TangentVector<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, T: PartialEq> PartialEq for TangentVector<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Hash + Eq + Clone, T: AdditiveArithmetic> AddAssign for TangentVector<K, T> {
    fn add_assign(&mut self, rhs: Self) {
        for (key, grad) in rhs.entries {
            self.accumulate(key, grad);
        }
    }
}

impl<K: Hash + Eq + Clone, T: AdditiveArithmetic> SubAssign for TangentVector<K, T> {
    fn sub_assign(&mut self, rhs: Self) {
        *self += -rhs;
    }
}

impl<K: Hash + Eq + Clone, T: AdditiveArithmetic> Add for TangentVector<K, T> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<K: Hash + Eq + Clone, T: AdditiveArithmetic> Sub for TangentVector<K, T> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl<K: Hash + Eq, T: AdditiveArithmetic> Neg for TangentVector<K, T> {
    type Output = Self;

    fn neg(self) -> Self {
        let entries = self
            .entries
            .into_iter()
            .map(|(key, grad)| (key, T::zero() - grad))
            .collect();
        Self { entries }
    }
}

impl<K, T> AdditiveArithmetic for TangentVector<K, T>
where
    K: Hash + Eq + Clone + Debug,
    T: AdditiveArithmetic,
{
    fn zero() -> Self {
        Self::new()
    }
}

impl<K, T> Differentiable for TangentVector<K, T>
where
    K: Hash + Eq + Clone + Debug + 'static,
    T: Differentiable<TangentVector = T> + AdditiveArithmetic + 'static,
{
    type TangentVector = Self;

    fn move_by(&mut self, direction: &Self) {
        self.entries.move_by(direction);
    }

    fn zero_tangent_vector_initializer(&self) -> ZeroTangentInitializer<Self> {
        self.entries.zero_tangent_vector_initializer()
    }
}

impl<K: Hash + Eq, T> Index<&K> for TangentVector<K, T> {
    type Output = T;

    fn index(&self, key: &K) -> &T {
        &self.entries[key]
    }
}

impl<K, T> From<IndexMap<K, T>> for TangentVector<K, T> {
    fn from(entries: IndexMap<K, T>) -> Self {
        Self { entries }
    }
}

impl<K: Hash + Eq, T, const N: usize> From<[(K, T); N]> for TangentVector<K, T> {
    fn from(pairs: [(K, T); N]) -> Self {
        Self {
            entries: IndexMap::from(pairs),
        }
    }
}

impl<K: Hash + Eq, T> FromIterator<(K, T)> for TangentVector<K, T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, T> IntoIterator for TangentVector<K, T> {
    type Item = (K, T);
    type IntoIter = indexmap::map::IntoIter<K, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, T> IntoIterator for &'a TangentVector<K, T> {
    type Item = (&'a K, &'a T);
    type IntoIter = indexmap::map::Iter<'a, K, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tangent_new() {
        let grads: TangentVector<&str, f64> = TangentVector::new();
        assert!(grads.is_empty());
        assert_eq!(grads.len(), 0);
        assert_eq!(grads, TangentVector::zero());
    }

    #[test]
    fn test_accumulate_single() {
        let mut grads = TangentVector::new();
        grads.accumulate("a", 1.5);

        assert!(grads.contains(&"a"));
        assert_eq!(grads.get(&"a"), Some(&1.5));
    }

    #[test]
    fn test_accumulate_multiple() {
        let mut grads = TangentVector::new();
        grads.accumulate("a", 1.0);
        grads.accumulate("b", 4.0);
        grads.accumulate("a", 2.5);

        assert_eq!(grads.len(), 2);
        assert_eq!(grads[&"a"], 3.5);
        assert_eq!(grads.get_index(0), Some((&"a", &3.5)));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut grads = TangentVector::from([("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        assert_eq!(grads.remove(&"a"), Some(1.0));
        assert!(!grads.contains(&"a"));
        assert_eq!(grads.keys().copied().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_add_merge_order() {
        let a = TangentVector::from([("x", 1.0), ("y", 2.0)]);
        let b = TangentVector::from([("z", 5.0), ("x", 3.0)]);

        let sum = a + b;
        let keys: Vec<_> = sum.keys().copied().collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
        assert_eq!(sum[&"x"], 4.0);
        assert_eq!(sum[&"z"], 5.0);
    }

    #[test]
    fn test_sub_appends_negated() {
        let a = TangentVector::from([("x", 1.0)]);
        let b = TangentVector::from([("x", 3.0), ("y", 2.0)]);

        let diff = a - b;
        assert_eq!(diff, TangentVector::from([("x", -2.0), ("y", -2.0)]));
    }

    #[test]
    fn test_neg() {
        let a = TangentVector::from([("x", 1.0), ("y", -2.0)]);
        assert_eq!(-a, TangentVector::from([("x", -1.0), ("y", 2.0)]));
    }

    #[test]
    fn test_equality_flavors() {
        let a = TangentVector::from([("a", 13.0), ("b", 17.0)]);
        let b = TangentVector::from([("b", 17.0), ("a", 13.0)]);

        assert_eq!(a, b);
        assert!(!a.eq_ordered(&b));
        assert!(a.eq_ordered(&a.clone()));

        let sparse = TangentVector::from([("a", 13.0)]);
        let explicit = TangentVector::from([("a", 13.0), ("b", 0.0)]);
        assert_ne!(sparse, explicit);
        assert!(sparse.equivalent(&explicit));
        assert!(explicit.equivalent(&sparse));
        assert!(!sparse.equivalent(&a));
    }

    #[test]
    fn test_zero_filled() {
        let zeros: TangentVector<&str, f64> = TangentVector::zero_filled(&["a", "b"]);
        assert_eq!(zeros, TangentVector::from([("a", 0.0), ("b", 0.0)]));
        assert!(zeros.equivalent(&TangentVector::zero()));
    }

    #[test]
    fn test_densify_keeps_contributions() {
        let mut grads = TangentVector::from([("extra", 9.0), ("c", 3.0), ("a", 1.0)]);
        grads.densify(&["a", "b", "c"]);

        let keys: Vec<_> = grads.keys().copied().collect();
        assert_eq!(keys, vec!["a", "b", "c", "extra"]);
        assert_eq!(grads[&"a"], 1.0);
        assert_eq!(grads[&"b"], 0.0);
        assert_eq!(grads[&"c"], 3.0);
        assert_eq!(grads[&"extra"], 9.0);
    }

    #[test]
    fn test_tangent_is_own_tangent_space() {
        let mut grads = TangentVector::from([("a", 1.0), ("b", 2.0)]);
        grads.move_by(&TangentVector::from([("b", 0.5)]));
        assert_eq!(grads, TangentVector::from([("a", 1.0), ("b", 2.5)]));

        let zero = grads.zero_tangent_vector();
        assert_eq!(zero, TangentVector::from([("a", 0.0), ("b", 0.0)]));
    }

    #[test]
    #[should_panic(expected = "missing component")]
    fn test_tangent_move_missing_component() {
        let mut grads = TangentVector::from([("a", 1.0)]);
        grads.move_by(&TangentVector::from([("z", 0.5)]));
    }
}
