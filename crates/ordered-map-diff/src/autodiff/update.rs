//! Keyed write with a hand-written backward rule.
//!
//! Mutation is exposed as a single upsert call, never as a borrowed
//! in-place accessor, so that the write has exactly one backward rule.

use super::tangent::TangentVector;
use crate::differentiable::{AdditiveArithmetic, Differentiable};
use crate::error::DiffError;
use indexmap::IndexMap;
use log::{debug, trace, warn};
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

/// What a write pullback does when the normalized accumulator has no slot
/// for the written key.
///
/// The accumulator is total over the keys present after the write, so
/// hitting this case means its key set diverged from the forward one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Write an explicit zero slot and return a zero gradient.
    #[default]
    ZeroFill,
    /// Report `DiffError::MissingAccumulatorEntry`.
    Fail,
}

/// How an undersized accumulator is made total on first touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Replace the accumulator with a zero for every forward key. Any
    /// contribution already present is dropped, so a sparse seed loses
    /// its entries.
    #[default]
    Reset,
    /// Fill missing forward keys with explicit zeros, keeping contributions
    /// already present.
    Densify,
}

/// Settings for write pullbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateConfig {
    pub missing_key: MissingKeyPolicy,
    pub normalization: Normalization,
}

impl UpdateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_key(mut self, policy: MissingKeyPolicy) -> Self {
        self.missing_key = policy;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }
}

/// Upsert `value` at `key`.
///
/// An existing key keeps its position; a new key is appended.
pub fn update<K: Hash + Eq, V>(map: &mut IndexMap<K, V>, key: K, value: V) {
    map.insert(key, value);
}

/// Backward function for a keyed write.
///
/// Stores the written key and the key set right after the write. Values are
/// never captured.
#[derive(Debug, Clone)]
pub struct UpdateBackward<K, T> {
    key: K,
    forward_count: usize,
    forward_keys: Vec<K>,
    config: UpdateConfig,
    _tangent: PhantomData<fn() -> T>,
}

impl<K, T> UpdateBackward<K, T>
where
    K: Hash + Eq + Clone + Debug,
    T: AdditiveArithmetic,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Map size right after the write.
    pub fn forward_count(&self) -> usize {
        self.forward_count
    }

    pub fn forward_keys(&self) -> &[K] {
        &self.forward_keys
    }

    pub fn config(&self) -> UpdateConfig {
        self.config
    }

    /// Compute the VJP for the write.
    ///
    /// `grad` is the accumulator for the map and is updated in place: on
    /// return it is the gradient flowing to the map before the write. The
    /// returned value is the gradient flowing to the written value.
    ///
    /// The slot for the written key is claimed: its gradient is returned and
    /// the slot is zeroed, so an earlier write to the same key sees nothing.
    ///
    /// The slot is zeroed, not removed. When the write inserted a new key,
    /// the returned accumulator still names that key, so it is not a valid
    /// direction for [`Differentiable::move_by`] on the pre-write map. Use
    /// [`TangentVector::equivalent`] to compare it, or drop the key first.
    pub fn try_backward(&self, grad: &mut TangentVector<K, T>) -> Result<T, DiffError> {
        if grad.len() < self.forward_count {
            debug!(
                "normalizing accumulator ({} of {} keys) for write at {:?}",
                grad.len(),
                self.forward_count,
                self.key
            );
            match self.config.normalization {
                Normalization::Densify => grad.densify(&self.forward_keys),
                Normalization::Reset => *grad = TangentVector::zero_filled(&self.forward_keys),
            }
        }

        if let Some(slot) = grad.get_mut(&self.key) {
            trace!("claiming gradient slot for {:?}", self.key);
            return Ok(std::mem::replace(slot, T::zero()));
        }

        match self.config.missing_key {
            MissingKeyPolicy::ZeroFill => {
                warn!(
                    "accumulator with {} entries has no slot for {:?}; using zero",
                    grad.len(),
                    self.key
                );
                grad.insert(self.key.clone(), T::zero());
                Ok(T::zero())
            }
            MissingKeyPolicy::Fail => Err(DiffError::MissingAccumulatorEntry {
                key: format!("{:?}", self.key),
                len: grad.len(),
            }),
        }
    }

    /// Panicking form of [`try_backward`](Self::try_backward).
    ///
    /// Leaves an explicit zero for a newly inserted key in `grad`, as
    /// `try_backward` does.
    pub fn backward(&self, grad: &mut TangentVector<K, T>) -> T {
        match self.try_backward(grad) {
            Ok(value_grad) => value_grad,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Keyed write paired with its backward function.
///
/// # Example
///
/// ```
/// use ordered_map_diff::IndexMap;
/// use ordered_map_diff::autodiff::{TangentVector, UpdateConfig, vjp_update};
///
/// let mut map = IndexMap::from([("s1", 10.0), ("s2", 20.0), ("s3", 30.0)]);
/// let pullback = vjp_update(&mut map, "s1", 2.0, UpdateConfig::default());
/// assert_eq!(map[&"s1"], 2.0);
///
/// let mut grad = TangentVector::from([("s1", 0.0), ("s2", 1.0), ("s3", 0.0)]);
/// let value_grad = pullback.backward(&mut grad);
/// assert_eq!(value_grad, 0.0);
/// assert_eq!(grad, TangentVector::from([("s1", 0.0), ("s2", 1.0), ("s3", 0.0)]));
/// ```
pub fn vjp_update<K, V>(
    map: &mut IndexMap<K, V>,
    key: K,
    value: V,
    config: UpdateConfig,
) -> UpdateBackward<K, V::TangentVector>
where
    K: Hash + Eq + Clone,
    V: Differentiable,
{
    update(map, key.clone(), value);

    UpdateBackward {
        key,
        forward_count: map.len(),
        forward_keys: map.keys().cloned().collect(),
        config,
        _tangent: PhantomData,
    }
}
