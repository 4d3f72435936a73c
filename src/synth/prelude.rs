// Shared math constants and the noise source used by the oscillators.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// PI constant
pub use core::f64::consts::PI;

/// Builds a fast generator seeded once from the thread-local entropy source.
pub fn seeded_rng() -> SmallRng {
    SmallRng::from_rng(&mut rand::rng())
}

pub fn random_range(rng: &mut SmallRng, min: f64, max: f64) -> f64 {
    rng.random_range(min..=max)
}

/// Converts a frequency in hertz to angular velocity.
pub fn angular_velocity(hertz: f64) -> f64 {
    hertz * 2.0 * PI
}
