use crate::synth::prelude::{angular_velocity, random_range, seeded_rng, PI};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Number of harmonics summed by the analogue sawtooth.
const SAW_HARMONICS: u32 = 39;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    SawAnalogue,
    SawDigital,
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Forward,
    Backward,
}

impl Waveform {
    /// Cycling order used by the waveform selection keys.
    pub const ALL: [Waveform; 6] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::SawAnalogue,
        Waveform::SawDigital,
        Waveform::Noise,
    ];

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|w| *w == self)
            .unwrap_or_default()
    }

    /// Returns the waveform `steps` positions further along the cycle.
    pub fn shifted(self, steps: usize) -> Self {
        Self::ALL[(self.index() + steps) % Self::ALL.len()]
    }

    pub fn next(self) -> Self {
        self.shifted(1)
    }

    pub fn previous(self) -> Self {
        self.shifted(Self::ALL.len() - 1)
    }
}

/// Evaluates waveforms at an absolute time. Every waveform except noise is a
/// pure function of frequency and time and takes no lock.
///
/// Noise draws from one stream seeded when the generator is built. That
/// stream sits behind a mutex, so concurrent noise callers serialize on it
/// and each sample is still a distinct draw.
#[derive(Debug)]
pub struct WaveformGenerator {
    noise: Mutex<SmallRng>,
}

impl WaveformGenerator {
    pub fn new() -> Self {
        Self {
            noise: Mutex::new(seeded_rng()),
        }
    }

    /// Deterministic noise stream, for reproducible renders.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            noise: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    /// Returns the value of `waveform` at `time` seconds, in [-1, 1].
    pub fn oscillate(&self, frequency: f64, time: f64, waveform: Waveform) -> f64 {
        let phase = angular_velocity(frequency) * time;
        let value = match waveform {
            Waveform::Sine => phase.sin(),
            Waveform::Square => {
                if phase.sin() >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => phase.sin().asin() * (2.0 / PI),
            Waveform::SawAnalogue => {
                let sum: f64 = (1..=SAW_HARMONICS)
                    .map(|harmonic| {
                        let harmonic = f64::from(harmonic);
                        (harmonic * phase).sin() / harmonic
                    })
                    .sum();
                sum * (2.0 / PI)
            }
            Waveform::SawDigital => {
                // A zero-length period has no ramp to follow.
                if frequency <= 0.0 {
                    0.0
                } else {
                    let period_position = time.rem_euclid(1.0 / frequency);
                    (2.0 / PI) * (frequency * PI * period_position - PI / 2.0)
                }
            }
            Waveform::Noise => {
                let mut rng = self.noise.lock().unwrap_or_else(PoisonError::into_inner);
                random_range(&mut rng, -1.0, 1.0)
            }
        };
        // The additive saw overshoots near its discontinuity (Gibbs).
        value.clamp(-1.0, 1.0)
    }
}

impl Default for WaveformGenerator {
    fn default() -> Self {
        Self::new()
    }
}
