//! Keyed, offset and bulk reads with their backward rules.

use super::tangent::TangentVector;
use crate::differentiable::{AdditiveArithmetic, Differentiable, KeyValuePair};
use crate::error::DiffError;
use indexmap::IndexMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Backward function for a keyed read.
///
/// The read produced an `Option<V>`; its output gradient is an
/// `Option<T>`. A present gradient lands on the read key only, every other
/// key stays implicitly zero.
#[derive(Debug, Clone)]
pub struct GetBackward<K, T> {
    key: K,
    _tangent: PhantomData<fn() -> T>,
}

impl<K: Hash + Eq + Clone, T: AdditiveArithmetic> GetBackward<K, T> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            _tangent: PhantomData,
        }
    }

    /// The key captured at forward time.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Compute the VJP for the read.
    ///
    /// Builds a single-entry tangent rather than a dense one: absent keys
    /// already mean zero under tangent addition.
    pub fn backward(&self, grad_output: Option<T>) -> TangentVector<K, T> {
        let mut grad = TangentVector::with_capacity(1);
        if let Some(value) = grad_output {
            grad.insert(self.key.clone(), value);
        }
        grad
    }
}

/// Backward function for an offset read.
#[derive(Debug, Clone)]
pub struct GetElementBackward<K, T> {
    key: K,
    _tangent: PhantomData<fn() -> T>,
}

impl<K: Hash + Eq + Clone, T: AdditiveArithmetic> GetElementBackward<K, T> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            _tangent: PhantomData,
        }
    }

    /// Key that occupied the offset at forward time.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Attribute the value gradient to the captured key. The key field of
    /// the pair is structural and contributes nothing.
    pub fn backward(&self, grad_value: T) -> TangentVector<K, T> {
        let mut grad = TangentVector::with_capacity(1);
        grad.insert(self.key.clone(), grad_value);
        grad
    }
}

/// Backward function for the values-array projection.
///
/// Holds one keyed-read backward per position.
#[derive(Debug, Clone)]
pub struct ValuesArrayBackward<K, T> {
    reads: Vec<GetBackward<K, T>>,
}

impl<K: Hash + Eq + Clone, T: AdditiveArithmetic> ValuesArrayBackward<K, T> {
    /// Number of positions captured at forward time.
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Compute the VJP for the projection.
    ///
    /// An empty gradient vector is the zero of the array tangent space.
    /// Otherwise one gradient per captured position is required.
    pub fn try_backward(&self, grad_output: Vec<T>) -> Result<TangentVector<K, T>, DiffError> {
        if grad_output.is_empty() {
            return Ok(TangentVector::new());
        }
        if grad_output.len() != self.reads.len() {
            return Err(DiffError::CountMismatch {
                expected: self.reads.len(),
                actual: grad_output.len(),
            });
        }

        let mut grad = TangentVector::with_capacity(self.reads.len());
        for (read, value) in self.reads.iter().zip(grad_output) {
            grad += read.backward(Some(value));
        }
        Ok(grad)
    }

    /// Panicking form of [`try_backward`](Self::try_backward).
    pub fn backward(&self, grad_output: Vec<T>) -> TangentVector<K, T> {
        match self.try_backward(grad_output) {
            Ok(grad) => grad,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Keyed read paired with its backward function.
pub fn vjp_get<K, V>(map: &IndexMap<K, V>, key: &K) -> (Option<V>, GetBackward<K, V::TangentVector>)
where
    K: Hash + Eq + Clone,
    V: Differentiable + Clone,
{
    (map.get(key).cloned(), GetBackward::new(key.clone()))
}

/// Entry at insertion position `offset`, or `IndexOutOfBounds`.
pub fn try_get_element<K, V>(
    map: &IndexMap<K, V>,
    offset: usize,
) -> Result<KeyValuePair<K, V>, DiffError>
where
    K: Clone,
    V: Clone,
{
    map.get_index(offset)
        .map(|(key, value)| KeyValuePair {
            key: key.clone(),
            value: value.clone(),
        })
        .ok_or(DiffError::IndexOutOfBounds {
            index: offset,
            len: map.len(),
        })
}

/// Entry at insertion position `offset`.
///
/// # Panics
///
/// Panics if `offset >= map.len()`.
pub fn get_element<K: Clone, V: Clone>(map: &IndexMap<K, V>, offset: usize) -> KeyValuePair<K, V> {
    match try_get_element(map, offset) {
        Ok(element) => element,
        Err(err) => panic!("{err}"),
    }
}

/// Offset read paired with its backward function.
///
/// # Panics
///
/// Panics if `offset >= map.len()`.
pub fn vjp_get_element<K, V>(
    map: &IndexMap<K, V>,
    offset: usize,
) -> (KeyValuePair<K, V>, GetElementBackward<K, V::TangentVector>)
where
    K: Hash + Eq + Clone,
    V: Differentiable + Clone,
{
    let element = get_element(map, offset);
    let backward = GetElementBackward::new(element.key.clone());
    (element, backward)
}

/// Values in insertion order.
pub fn values_array<K, V: Clone>(map: &IndexMap<K, V>) -> Vec<V> {
    map.values().cloned().collect()
}

/// Values in insertion order, composed from one keyed read per entry.
pub fn vjp_values_array<K, V>(
    map: &IndexMap<K, V>,
) -> (Vec<V>, ValuesArrayBackward<K, V::TangentVector>)
where
    K: Hash + Eq + Clone,
    V: Differentiable + Clone,
{
    let mut values = Vec::with_capacity(map.len());
    let mut reads = Vec::with_capacity(map.len());
    for (key, value) in map {
        values.push(value.clone());
        reads.push(GetBackward::new(key.clone()));
    }
    (values, ValuesArrayBackward { reads })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexMap<&'static str, f64> {
        IndexMap::from([("a", 3.0), ("b", 7.0)])
    }

    #[test]
    fn test_vjp_get_present() {
        let map = sample();
        let (value, pullback) = vjp_get(&map, &"b");

        assert_eq!(value, Some(7.0));
        assert_eq!(
            pullback.backward(Some(2.0)),
            TangentVector::from([("b", 2.0)])
        );
    }

    #[test]
    fn test_vjp_get_no_gradient_is_zero() {
        let map = sample();
        let (_, pullback) = vjp_get(&map, &"a");

        assert!(pullback.backward(None).is_empty());
    }

    #[test]
    fn test_vjp_get_absent_key() {
        let map = sample();
        let (value, pullback) = vjp_get(&map, &"missing");

        assert_eq!(value, None);
        assert!(pullback.backward(None).is_empty());
    }

    #[test]
    fn test_get_pullback_is_reentrant() {
        let map = sample();
        let (_, pullback) = vjp_get(&map, &"a");

        let first = pullback.backward(Some(1.0));
        let second = pullback.backward(Some(4.0));
        assert_eq!(first[&"a"], 1.0);
        assert_eq!(second[&"a"], 4.0);
    }

    #[test]
    fn test_get_element() {
        let map = sample();
        let element = get_element(&map, 1);
        assert_eq!(element.key, "b");
        assert_eq!(element.value, 7.0);
    }

    #[test]
    fn test_try_get_element_out_of_bounds() {
        let map = sample();
        let err = try_get_element(&map, 2).unwrap_err();
        assert_eq!(err, DiffError::IndexOutOfBounds { index: 2, len: 2 });
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_get_element_out_of_bounds_panics() {
        let map = sample();
        get_element(&map, 5);
    }

    #[test]
    fn test_vjp_get_element_attributes_captured_key() {
        let mut map = sample();
        let (element, pullback) = vjp_get_element(&map, 0);
        assert_eq!(element.key, "a");

        map.shift_remove(&"a");
        map.insert("c", 1.0);

        assert_eq!(pullback.key(), &"a");
        assert_eq!(pullback.backward(5.0), TangentVector::from([("a", 5.0)]));
    }

    #[test]
    fn test_values_array() {
        let map = IndexMap::from([("s2", 20.0), ("s1", 10.0)]);
        assert_eq!(values_array(&map), vec![20.0, 10.0]);
    }

    #[test]
    fn test_vjp_values_array() {
        let map = IndexMap::from([("s1", 10.0), ("s2", 20.0), ("s3", 30.0)]);
        let (values, pullback) = vjp_values_array(&map);

        assert_eq!(values, vec![10.0, 20.0, 30.0]);
        assert_eq!(pullback.len(), 3);

        let grad = pullback.backward(vec![1.0, 2.0, 3.0]);
        let expected = TangentVector::from([("s1", 1.0), ("s2", 2.0), ("s3", 3.0)]);
        assert!(grad.eq_ordered(&expected));
    }

    #[test]
    fn test_vjp_values_array_empty_gradient() {
        let map = sample();
        let (_, pullback) = vjp_values_array(&map);
        assert!(pullback.backward(Vec::new()).is_empty());
    }

    #[test]
    fn test_vjp_values_array_count_mismatch() {
        let map = sample();
        let (_, pullback) = vjp_values_array(&map);
        let err = pullback.try_backward(vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            DiffError::CountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}
