//! Reverse-mode differentiation rules for insertion-ordered maps.
//!
//! An `IndexMap<K, V>` with differentiable values is itself differentiable.
//! Its tangent is a [`TangentVector`]: a sparse map from keys to value
//! tangents, where an absent key means a zero component.
//!
//! # Architecture
//!
//! ```text
//! IndexMap<K, V>  ──vjp_get / vjp_get_element / vjp_values_array──►  read backward
//!        │                                                               │
//!        │ vjp_update                                                    ▼
//!        ▼                                                   TangentVector<K, V::TangentVector>
//!  UpdateBackward ◄──────────── &mut accumulator ──────────────────────┘
//!        │
//!        ▼
//!  value gradient (claimed slot)
//! ```
//!
//! [`TrackedMap`] records these operations on a tape and replays their
//! backward functions in reverse order, threading one accumulator.
//!
//! # Example
//!
//! ```
//! use ordered_map_diff::IndexMap;
//! use ordered_map_diff::autodiff::{Seeds, TangentVector, TrackedMap};
//!
//! let mut tracked = TrackedMap::new(IndexMap::from([("s1", 10.0), ("s2", 20.0), ("s3", 30.0)]));
//! let (values, read) = tracked.values_array();
//! assert_eq!(values.iter().sum::<f64>(), 60.0);
//!
//! let seeds = Seeds::new().with_values(read, vec![1.0, 2.0, 3.0]);
//! let grads = tracked.backward(&seeds, TangentVector::new()).unwrap();
//! assert_eq!(grads.receiver(), &TangentVector::from([("s1", 1.0), ("s2", 2.0), ("s3", 3.0)]));
//! ```
//!
//! # Key Types
//!
//! - [`TangentVector`]: tangent of a map, with union-merge addition
//! - [`DifferentiableMap`]: forward operations paired with backward functions
//! - [`UpdateBackward`]: write pullback that claims the written slot
//! - [`TrackedMap`]: tape-recording wrapper with [`TrackedMap::backward`]
//!
//! # Design Notes
//!
//! - Backward functions capture keys only, never values
//! - Writes are a single upsert call with one backward rule
//! - The write pullback makes the accumulator total on first touch

mod map;
mod read;
mod tangent;
mod tape;
mod update;
mod zero;

pub use map::{DifferentiableMap, try_move_by};
pub use read::{
    GetBackward, GetElementBackward, ValuesArrayBackward, get_element, try_get_element,
    values_array, vjp_get, vjp_get_element, vjp_values_array,
};
pub use tangent::TangentVector;
pub use tape::{Gradients, NodeId, Seed, Seeds, TrackedMap};
pub use update::{MissingKeyPolicy, Normalization, UpdateBackward, UpdateConfig, update, vjp_update};
pub use zero::{snapshot_keys, zero_initializer};
