//! Helpers shared by the materializer and enrichment code.

pub mod config;

use rand::Rng;

/// Choose one element of a constant, non-empty table.
pub(crate) fn choose<R, T>(rng: &mut R, options: &[T]) -> T
where
    R: Rng + ?Sized,
    T: Copy,
{
    debug_assert!(!options.is_empty());
    options[rng.random_range(0..options.len())]
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
