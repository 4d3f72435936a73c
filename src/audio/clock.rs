use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The pipeline's global time base, counted in generated samples.
///
/// Only the producer advances it; any thread may read it. Time is derived
/// from the sample count rather than accumulated, so it never drifts and
/// never decreases.
#[derive(Debug, Clone)]
pub struct Clock {
    samples: Arc<AtomicU64>,
    sample_rate: u32,
}

impl Clock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn time_step(&self) -> f64 {
        1.0 / f64::from(self.sample_rate)
    }

    /// Number of samples generated so far.
    pub fn sample_index(&self) -> u64 {
        self.samples.load(Ordering::Acquire)
    }

    /// Current time in seconds.
    pub fn time(&self) -> f64 {
        self.sample_index() as f64 / f64::from(self.sample_rate)
    }

    pub(crate) fn advance(&self) {
        self.samples.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn one_second_of_samples_is_one_second() {
        let clock = Clock::new(44100);
        for _ in 0..44100 {
            clock.advance();
        }
        assert_abs_diff_eq!(clock.time(), 1.0, epsilon = 1e-9);
        assert_eq!(clock.sample_index(), 44100);
    }

    #[test]
    fn clones_share_the_count() {
        let clock = Clock::new(48000);
        let reader = clock.clone();
        clock.advance();
        clock.advance();
        assert_eq!(reader.sample_index(), 2);
        assert_abs_diff_eq!(reader.time(), 2.0 / 48000.0, epsilon = 1e-15);
    }
}
