//! ordered-map-diff - reverse-mode differentiation for insertion-ordered maps
//!
//! This crate makes `IndexMap<K, V>` a differentiable value whenever `V` is
//! differentiable, and provides backward rules for reading and writing
//! entries by key, by position, and in bulk.
//!
//! # Architecture
//!
//! ```text
//! differentiable  → AdditiveArithmetic, Differentiable (f32, f64, c64)
//!
//! autodiff        → TangentVector (sparse map tangent)
//!                 → read / update backward functions
//!                 → TrackedMap (tape + backward pass)
//!
//! random          → random tangents for tests
//! ```
//!
//! # Example
//!
//! ```
//! use ordered_map_diff::{Differentiable, DifferentiableMap, IndexMap, TangentVector};
//!
//! let mut map = IndexMap::from([("a", 3.0), ("b", 7.0)]);
//!
//! let (a, pullback) = map.vjp_get(&"a");
//! assert_eq!(a, Some(3.0));
//! assert_eq!(pullback.backward(Some(2.0)), TangentVector::from([("a", 2.0)]));
//!
//! map.move_by(&TangentVector::from([("b", 1.0)]));
//! assert_eq!(map[&"b"], 8.0);
//! ```

pub mod autodiff;
pub mod differentiable;
pub mod error;
pub mod random;

pub use autodiff::{DifferentiableMap, TangentVector, TrackedMap};
pub use differentiable::{
    AdditiveArithmetic, Differentiable, KeyValuePair, ZeroTangentInitializer, c64,
};
pub use error::DiffError;
pub use indexmap::IndexMap;
