//! Tape-based replay of map operations.
//!
//! A [`TrackedMap`] owns a primal map and records the backward function of
//! every read and write performed through it. [`TrackedMap::backward`]
//! replays them in reverse order, threading a single accumulator for the
//! map through the chain.

use super::read::{
    GetBackward, GetElementBackward, ValuesArrayBackward, try_get_element, vjp_get,
    vjp_values_array,
};
use super::tangent::TangentVector;
use super::update::{UpdateBackward, UpdateConfig, vjp_update};
use crate::differentiable::{Differentiable, KeyValuePair};
use crate::error::DiffError;
use indexmap::IndexMap;
use log::trace;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Identifier of a recorded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position on the tape.
    pub fn index(&self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone)]
enum Recorded<K, T> {
    Get(GetBackward<K, T>),
    GetElement(GetElementBackward<K, T>),
    ValuesArray(ValuesArrayBackward<K, T>),
    Update(UpdateBackward<K, T>),
}

/// Output gradient for a recorded read.
#[derive(Debug, Clone, PartialEq)]
pub enum Seed<T> {
    /// Gradient of a keyed or offset read.
    Value(T),
    /// Per-position gradients of a values-array read.
    Values(Vec<T>),
}

/// Output gradients keyed by read node.
///
/// Reads without a seed contribute nothing.
#[derive(Debug, Clone)]
pub struct Seeds<T> {
    seeds: HashMap<NodeId, Seed<T>>,
}

impl<T> Seeds<T> {
    pub fn new() -> Self {
        Self {
            seeds: HashMap::new(),
        }
    }

    /// Seed a keyed or offset read.
    pub fn with_value(mut self, id: NodeId, grad: T) -> Self {
        self.seeds.insert(id, Seed::Value(grad));
        self
    }

    /// Seed a values-array read.
    pub fn with_values(mut self, id: NodeId, grads: Vec<T>) -> Self {
        self.seeds.insert(id, Seed::Values(grads));
        self
    }

    pub fn get(&self, id: NodeId) -> Option<&Seed<T>> {
        self.seeds.get(&id)
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

impl<T> Default for Seeds<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a backward pass over a [`TrackedMap`].
#[derive(Debug, Clone)]
pub struct Gradients<K, T> {
    receiver: TangentVector<K, T>,
    values: HashMap<NodeId, T>,
}

impl<K, T> Gradients<K, T> {
    /// Gradient of the map as it was before the first recorded operation.
    ///
    /// This may name keys the initial map never had: a write that inserted
    /// a key leaves a zero entry for it, and a seeded read of an absent key
    /// leaves its seed. Moving the initial map along such a gradient fails
    /// with `DiffError::MissingComponent`; compare with
    /// [`TangentVector::equivalent`] or filter to the initial keys first.
    pub fn receiver(&self) -> &TangentVector<K, T> {
        &self.receiver
    }

    pub fn into_receiver(self) -> TangentVector<K, T> {
        self.receiver
    }

    /// Gradient of the value written by the write node `id`.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.values.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.values.contains_key(&id)
    }

    /// Number of write gradients.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &T)> {
        self.values.iter()
    }
}

/// An ordered map that records differentiable operations.
///
/// # Example
///
/// ```
/// use ordered_map_diff::IndexMap;
/// use ordered_map_diff::autodiff::{Seeds, TangentVector, TrackedMap};
///
/// let mut tracked = TrackedMap::new(IndexMap::from([("a", 1.0), ("b", 1.0)]));
/// let write_a = tracked.update("a", 3.0);
/// let write_b = tracked.update("b", 7.0);
/// let (a, read_a) = tracked.get(&"a");
/// let (b, read_b) = tracked.get(&"b");
/// assert_eq!(a.unwrap() * 13.0 + b.unwrap() * 17.0, 158.0);
///
/// let seeds = Seeds::new().with_value(read_a, 13.0).with_value(read_b, 17.0);
/// let grads = tracked.backward(&seeds, TangentVector::new()).unwrap();
///
/// assert_eq!(grads.receiver(), &TangentVector::from([("a", 0.0), ("b", 0.0)]));
/// assert_eq!(grads.get(write_a), Some(&13.0));
/// assert_eq!(grads.get(write_b), Some(&17.0));
/// ```
#[derive(Debug, Clone)]
pub struct TrackedMap<K, V: Differentiable> {
    map: IndexMap<K, V>,
    tape: Vec<Recorded<K, V::TangentVector>>,
    config: UpdateConfig,
}

impl<K, V> TrackedMap<K, V>
where
    K: Hash + Eq + Clone + Debug + 'static,
    V: Differentiable + Clone,
{
    /// Start recording on `map` with the default [`UpdateConfig`].
    pub fn new(map: IndexMap<K, V>) -> Self {
        Self::with_config(map, UpdateConfig::default())
    }

    /// Start recording on `map`; writes use `config`.
    pub fn with_config(map: IndexMap<K, V>, config: UpdateConfig) -> Self {
        Self {
            map,
            tape: Vec::new(),
            config,
        }
    }

    /// Current primal map.
    pub fn map(&self) -> &IndexMap<K, V> {
        &self.map
    }

    pub fn into_map(self) -> IndexMap<K, V> {
        self.map
    }

    pub fn config(&self) -> UpdateConfig {
        self.config
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.tape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tape.is_empty()
    }

    fn record(&mut self, op: Recorded<K, V::TangentVector>) -> NodeId {
        let id = NodeId(self.tape.len());
        self.tape.push(op);
        id
    }

    /// Tracked keyed read.
    pub fn get(&mut self, key: &K) -> (Option<V>, NodeId) {
        let (value, backward) = vjp_get(&self.map, key);
        (value, self.record(Recorded::Get(backward)))
    }

    /// Tracked offset read.
    pub fn get_element(
        &mut self,
        offset: usize,
    ) -> Result<(KeyValuePair<K, V>, NodeId), DiffError> {
        let element = try_get_element(&self.map, offset)?;
        let backward = GetElementBackward::new(element.key.clone());
        Ok((element, self.record(Recorded::GetElement(backward))))
    }

    /// Tracked values-array read.
    pub fn values_array(&mut self) -> (Vec<V>, NodeId) {
        let (values, backward) = vjp_values_array(&self.map);
        (values, self.record(Recorded::ValuesArray(backward)))
    }

    /// Tracked write.
    pub fn update(&mut self, key: K, value: V) -> NodeId {
        let backward = vjp_update(&mut self.map, key, value, self.config);
        self.record(Recorded::Update(backward))
    }

    /// Execute the backward pass.
    ///
    /// `output` is the gradient of the final map; `seeds` carries the
    /// gradient of each read result that was used. Recorded operations are
    /// replayed from last to first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a seed refers to a node not on this tape
    /// - a seed does not fit its operation (writes take no seed)
    /// - a values-array seed has the wrong length
    /// - a write pullback fails under `MissingKeyPolicy::Fail`
    pub fn backward(
        &self,
        seeds: &Seeds<V::TangentVector>,
        output: TangentVector<K, V::TangentVector>,
    ) -> Result<Gradients<K, V::TangentVector>, DiffError> {
        if let Some(id) = seeds.seeds.keys().find(|id| id.index() >= self.tape.len()) {
            return Err(DiffError::UnknownNode { index: id.index() });
        }

        let mut grad = output;
        let mut values = HashMap::new();

        for (index, op) in self.tape.iter().enumerate().rev() {
            let id = NodeId(index);
            trace!("replaying node {index}");
            match op {
                Recorded::Get(read) => match seeds.get(id) {
                    None => {}
                    Some(Seed::Value(seed)) => grad += read.backward(Some(seed.clone())),
                    Some(Seed::Values(_)) => return Err(seed_mismatch(index, "a single value")),
                },
                Recorded::GetElement(read) => match seeds.get(id) {
                    None => {}
                    Some(Seed::Value(seed)) => grad += read.backward(seed.clone()),
                    Some(Seed::Values(_)) => return Err(seed_mismatch(index, "a single value")),
                },
                Recorded::ValuesArray(read) => match seeds.get(id) {
                    None => {}
                    Some(Seed::Values(seed)) => grad += read.try_backward(seed.clone())?,
                    Some(Seed::Value(_)) => {
                        return Err(seed_mismatch(index, "a vector of values"));
                    }
                },
                Recorded::Update(write) => {
                    if seeds.get(id).is_some() {
                        return Err(seed_mismatch(index, "no seed"));
                    }
                    values.insert(id, write.try_backward(&mut grad)?);
                }
            }
        }

        Ok(Gradients {
            receiver: grad,
            values,
        })
    }
}

fn seed_mismatch(index: usize, expected: &'static str) -> DiffError {
    DiffError::SeedMismatch { index, expected }
}
