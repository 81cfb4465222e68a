//! Differentiable and additive-group traits for map values.

use std::fmt::Debug;
use std::ops::{Add, Sub};

pub use faer::c64;

/// Deferred producer of a zero tangent.
pub type ZeroTangentInitializer<T> = Box<dyn Fn() -> T>;

/// Types forming an additive group.
///
/// Every tangent space implements this: `zero` is the identity,
/// `+` combines contributions and `-` adds the negation.
pub trait AdditiveArithmetic:
    Clone + PartialEq + Debug + Add<Output = Self> + Sub<Output = Self>
{
    /// Returns the additive identity.
    fn zero() -> Self;
}

/// Types with an attached tangent space.
///
/// `move_by` applies a tangent to the primal in place. The zero initializer
/// lets an engine produce a structurally matching zero gradient later
/// without holding on to the primal.
pub trait Differentiable {
    /// The gradient-space counterpart of `Self`.
    type TangentVector: AdditiveArithmetic + 'static;

    /// Moves `self` along `direction`.
    fn move_by(&mut self, direction: &Self::TangentVector);

    /// Returns a deferred producer of a zero tangent matching `self`.
    fn zero_tangent_vector_initializer(&self) -> ZeroTangentInitializer<Self::TangentVector> {
        Box::new(<Self::TangentVector as AdditiveArithmetic>::zero)
    }

    /// Returns a zero tangent matching `self`.
    fn zero_tangent_vector(&self) -> Self::TangentVector {
        (self.zero_tangent_vector_initializer())()
    }
}

impl AdditiveArithmetic for f64 {
    fn zero() -> Self {
        0.0
    }
}

impl Differentiable for f64 {
    type TangentVector = f64;

    fn move_by(&mut self, direction: &f64) {
        *self += *direction;
    }
}

impl AdditiveArithmetic for f32 {
    fn zero() -> Self {
        0.0
    }
}

impl Differentiable for f32 {
    type TangentVector = f32;

    fn move_by(&mut self, direction: &f32) {
        *self += *direction;
    }
}

impl AdditiveArithmetic for c64 {
    fn zero() -> Self {
        c64::new(0.0, 0.0)
    }
}

impl Differentiable for c64 {
    type TangentVector = c64;

    fn move_by(&mut self, direction: &c64) {
        *self += *direction;
    }
}

/// Entry read by offset from an ordered map.
///
/// `key` is structural and never receives a gradient; the tangent space
/// is that of `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValuePair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V: Differentiable> Differentiable for KeyValuePair<K, V> {
    type TangentVector = V::TangentVector;

    fn move_by(&mut self, direction: &V::TangentVector) {
        self.value.move_by(direction);
    }

    fn zero_tangent_vector_initializer(&self) -> ZeroTangentInitializer<V::TangentVector> {
        self.value.zero_tangent_vector_initializer()
    }
}
