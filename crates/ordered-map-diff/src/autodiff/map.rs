//! `IndexMap` as a differentiable value.

use super::read::{
    self, GetBackward, GetElementBackward, ValuesArrayBackward, vjp_get, vjp_get_element,
    vjp_values_array,
};
use super::tangent::TangentVector;
use super::update::{self, UpdateBackward, UpdateConfig, vjp_update};
use super::zero::{snapshot_keys, zero_initializer};
use crate::differentiable::{Differentiable, KeyValuePair, ZeroTangentInitializer};
use crate::error::DiffError;
use indexmap::IndexMap;
use std::fmt::Debug;
use std::hash::Hash;

impl<K, V> Differentiable for IndexMap<K, V>
where
    K: Hash + Eq + Clone + Debug + 'static,
    V: Differentiable,
{
    type TangentVector = TangentVector<K, V::TangentVector>;

    /// Move every entry named by `direction` along its component.
    ///
    /// # Panics
    ///
    /// Panics if `direction` names a key absent from `self`. Nothing is
    /// moved in that case.
    fn move_by(&mut self, direction: &Self::TangentVector) {
        if let Err(err) = try_move_by(self, direction) {
            panic!("{err}");
        }
    }

    fn zero_tangent_vector_initializer(&self) -> ZeroTangentInitializer<Self::TangentVector> {
        zero_initializer(snapshot_keys(self))
    }
}

/// Fallible form of [`Differentiable::move_by`] for maps.
///
/// All keys are checked before any value moves.
pub fn try_move_by<K, V>(
    map: &mut IndexMap<K, V>,
    direction: &TangentVector<K, V::TangentVector>,
) -> Result<(), DiffError>
where
    K: Hash + Eq + Debug,
    V: Differentiable,
{
    if let Some(key) = direction.keys().find(|key| !map.contains_key(*key)) {
        return Err(DiffError::missing_component(key));
    }
    for (key, component) in direction {
        if let Some(value) = map.get_mut(key) {
            value.move_by(component);
        }
    }
    Ok(())
}

/// Differentiable operations on an ordered map.
///
/// Each `vjp_*` method performs the forward operation and returns the
/// matching backward function.
///
/// # Example
///
/// ```
/// use ordered_map_diff::{DifferentiableMap, IndexMap};
///
/// let map = IndexMap::from([("a", 3.0), ("b", 7.0)]);
///
/// let (a, pb_a) = map.vjp_get(&"a");
/// let (b, pb_b) = map.vjp_get(&"b");
/// let value = a.unwrap() * 13.0 + b.unwrap() * 17.0;
/// assert_eq!(value, 158.0);
///
/// let grad = pb_a.backward(Some(13.0)) + pb_b.backward(Some(17.0));
/// assert_eq!(grad[&"a"], 13.0);
/// assert_eq!(grad[&"b"], 17.0);
/// ```
pub trait DifferentiableMap<K, V: Differentiable> {
    /// Fallible move; see [`try_move_by`].
    fn try_move_by(
        &mut self,
        direction: &TangentVector<K, V::TangentVector>,
    ) -> Result<(), DiffError>;

    /// Keyed read.
    fn vjp_get(&self, key: &K) -> (Option<V>, GetBackward<K, V::TangentVector>);

    /// Entry at `offset`; panics when out of range.
    fn get_element(&self, offset: usize) -> KeyValuePair<K, V>;

    fn try_get_element(&self, offset: usize) -> Result<KeyValuePair<K, V>, DiffError>;

    /// Offset read; panics when out of range.
    fn vjp_get_element(
        &self,
        offset: usize,
    ) -> (KeyValuePair<K, V>, GetElementBackward<K, V::TangentVector>);

    /// Upsert `value` at `key`.
    fn update(&mut self, key: K, value: V);

    /// Keyed write with the default [`UpdateConfig`].
    fn vjp_update(&mut self, key: K, value: V) -> UpdateBackward<K, V::TangentVector> {
        self.vjp_update_with(key, value, UpdateConfig::default())
    }

    fn vjp_update_with(
        &mut self,
        key: K,
        value: V,
        config: UpdateConfig,
    ) -> UpdateBackward<K, V::TangentVector>;

    /// Values in insertion order.
    fn values_array(&self) -> Vec<V>;

    fn vjp_values_array(&self) -> (Vec<V>, ValuesArrayBackward<K, V::TangentVector>);
}

impl<K, V> DifferentiableMap<K, V> for IndexMap<K, V>
where
    K: Hash + Eq + Clone + Debug + 'static,
    V: Differentiable + Clone,
{
    fn try_move_by(
        &mut self,
        direction: &TangentVector<K, V::TangentVector>,
    ) -> Result<(), DiffError> {
        try_move_by(self, direction)
    }

    fn vjp_get(&self, key: &K) -> (Option<V>, GetBackward<K, V::TangentVector>) {
        vjp_get(self, key)
    }

    fn get_element(&self, offset: usize) -> KeyValuePair<K, V> {
        read::get_element(self, offset)
    }

    fn try_get_element(&self, offset: usize) -> Result<KeyValuePair<K, V>, DiffError> {
        read::try_get_element(self, offset)
    }

    fn vjp_get_element(
        &self,
        offset: usize,
    ) -> (KeyValuePair<K, V>, GetElementBackward<K, V::TangentVector>) {
        vjp_get_element(self, offset)
    }

    fn update(&mut self, key: K, value: V) {
        update::update(self, key, value);
    }

    fn vjp_update_with(
        &mut self,
        key: K,
        value: V,
        config: UpdateConfig,
    ) -> UpdateBackward<K, V::TangentVector> {
        vjp_update(self, key, value, config)
    }

    fn values_array(&self) -> Vec<V> {
        read::values_array(self)
    }

    fn vjp_values_array(&self) -> (Vec<V>, ValuesArrayBackward<K, V::TangentVector>) {
        vjp_values_array(self)
    }
}
