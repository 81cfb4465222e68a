//! Random tangents over a fixed key list.
//!
//! Tests use these to exercise the additive-group laws on sparse tangents
//! with shuffled insertion orders, and to draw directions for
//! finite-difference checks.

use rand::Rng;
use rand::distr::StandardUniform;
use rand::seq::SliceRandom;
use rand_distr::StandardNormal;
use std::hash::Hash;

use crate::autodiff::TangentVector;
use crate::differentiable::{AdditiveArithmetic, c64};

/// A tangent component that can be drawn at random.
///
/// Implemented for the scalar tangent spaces. A map tangent is built by
/// drawing one component per key.
pub trait RandomComponent: AdditiveArithmetic {
    /// Component with every real part in [0, 1).
    fn uniform_component<R: Rng>(rng: &mut R) -> Self;

    /// Component with unit expected squared norm.
    fn normal_component<R: Rng>(rng: &mut R) -> Self;
}

impl RandomComponent for f64 {
    fn uniform_component<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }

    fn normal_component<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

impl RandomComponent for f32 {
    fn uniform_component<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }

    fn normal_component<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

impl RandomComponent for c64 {
    fn uniform_component<R: Rng>(rng: &mut R) -> Self {
        c64::new(rng.sample(StandardUniform), rng.sample(StandardUniform))
    }

    fn normal_component<R: Rng>(rng: &mut R) -> Self {
        // Each part is N(0, 1/2) so |z|^2 has mean 1
        let scale = std::f64::consts::FRAC_1_SQRT_2;
        let re: f64 = rng.sample(StandardNormal);
        let im: f64 = rng.sample(StandardNormal);
        c64::new(re * scale, im * scale)
    }
}

/// Tangent with a uniform random value for every key, in `keys` order.
///
/// # Example
///
/// ```
/// use ordered_map_diff::random::random_tangent;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let t = random_tangent::<_, f64, _>(&["a", "b"], &mut rng);
/// assert_eq!(t.len(), 2);
/// assert!(t.values().all(|v| (0.0..1.0).contains(v)));
/// ```
pub fn random_tangent<K, T, R>(keys: &[K], rng: &mut R) -> TangentVector<K, T>
where
    K: Hash + Eq + Clone,
    T: RandomComponent,
    R: Rng,
{
    keys.iter()
        .map(|key| (key.clone(), T::uniform_component(rng)))
        .collect()
}

/// Tangent with a standard normal value for every key, in `keys` order.
pub fn random_tangent_normal<K, T, R>(keys: &[K], rng: &mut R) -> TangentVector<K, T>
where
    K: Hash + Eq + Clone,
    T: RandomComponent,
    R: Rng,
{
    keys.iter()
        .map(|key| (key.clone(), T::normal_component(rng)))
        .collect()
}

/// Tangent over a random subset of `keys`.
///
/// Each key is kept with probability `density`; kept keys are inserted in
/// shuffled order, so two sparse tangents over the same keys rarely share
/// an insertion order.
pub fn random_sparse_tangent<K, T, R>(keys: &[K], density: f64, rng: &mut R) -> TangentVector<K, T>
where
    K: Hash + Eq + Clone,
    T: RandomComponent,
    R: Rng,
{
    let mut kept: Vec<&K> = keys.iter().filter(|_| rng.random_bool(density)).collect();
    kept.shuffle(rng);
    kept.into_iter()
        .map(|key| (key.clone(), T::normal_component(rng)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const KEYS: [&str; 4] = ["w", "x", "y", "z"];

    #[test]
    fn test_random_tangent_f64() {
        let t: TangentVector<&str, f64> = random_tangent(&KEYS, &mut rand::rng());
        assert_eq!(t.keys().copied().collect::<Vec<_>>(), KEYS.to_vec());

        for v in t.values() {
            assert!((0.0..1.0).contains(v), "value {} not in [0, 1)", v);
        }
    }

    #[test]
    fn test_random_tangent_c64() {
        let t: TangentVector<&str, c64> = random_tangent(&KEYS, &mut rand::rng());
        for v in t.values() {
            assert!(
                (0.0..1.0).contains(&v.re),
                "real part {} not in [0, 1)",
                v.re
            );
            assert!(
                (0.0..1.0).contains(&v.im),
                "imaginary part {} not in [0, 1)",
                v.im
            );
        }
    }

    #[test]
    fn test_random_tangent_reproducible() {
        let mut rng1 = StdRng::seed_from_u64(12345);
        let t1: TangentVector<&str, f64> = random_tangent(&KEYS, &mut rng1);

        let mut rng2 = StdRng::seed_from_u64(12345);
        let t2: TangentVector<&str, f64> = random_tangent(&KEYS, &mut rng2);

        assert!(t1.eq_ordered(&t2));
    }

    #[test]
    fn test_random_tangent_normal() {
        let keys: Vec<usize> = (0..100).collect();
        let t: TangentVector<usize, f64> = random_tangent_normal(&keys, &mut rand::rng());

        let mean = t.values().sum::<f64>() / 100.0;
        assert!(mean.abs() < 0.5, "mean {} too far from 0", mean);
    }

    #[test]
    fn test_random_tangent_f32() {
        let mut rng = StdRng::seed_from_u64(3);
        let t: TangentVector<&str, f32> = random_tangent(&KEYS, &mut rng);
        assert!(t.values().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_complex_normal_unit_norm() {
        let mut rng = StdRng::seed_from_u64(11);
        let keys: Vec<usize> = (0..2000).collect();
        let t: TangentVector<usize, c64> = random_tangent_normal(&keys, &mut rng);

        let mean_norm = t.values().map(|z| z.re * z.re + z.im * z.im).sum::<f64>() / 2000.0;
        assert!(
            (mean_norm - 1.0).abs() < 0.1,
            "mean |z|^2 {} too far from 1",
            mean_norm
        );
    }

    #[test]
    fn test_random_sparse_tangent_subset() {
        let mut rng = StdRng::seed_from_u64(7);
        let keys: Vec<usize> = (0..50).collect();
        let t: TangentVector<usize, f64> = random_sparse_tangent(&keys, 0.5, &mut rng);

        assert!(t.len() <= 50);
        assert!(t.keys().all(|k| keys.contains(k)));
    }

    #[test]
    fn test_random_sparse_tangent_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        let empty: TangentVector<&str, f64> = random_sparse_tangent(&KEYS, 0.0, &mut rng);
        let full: TangentVector<&str, f64> = random_sparse_tangent(&KEYS, 1.0, &mut rng);

        assert!(empty.is_empty());
        assert_eq!(full.len(), KEYS.len());
    }
}
