//! Startup configuration, loaded from an optional JSON file.

use crate::error::{Error, Result};
use crate::synth::envelope::EnvelopeParams;
use crate::synth::generator::OscillatorMix;
use crate::synth::waveform::Waveform;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shape of the playback pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of blocks the handoff queue holds.
    pub block_count: usize,
    /// Samples per block (per channel).
    pub block_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            block_count: 8,
            block_samples: 512,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.channels == 0 {
            return Err(Error::InvalidConfig("channels must be positive".into()));
        }
        if self.block_count == 0 || self.block_samples == 0 {
            return Err(Error::InvalidConfig(format!(
                "need at least one block of one sample, got {} x {}",
                self.block_count, self.block_samples
            )));
        }
        Ok(())
    }

    /// Seconds between consecutive samples.
    pub fn time_step(&self) -> f64 {
        1.0 / f64::from(self.sample_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub audio: AudioConfig,
    pub envelope: EnvelopeParams,
    /// Frequency of the lowest key on the computer keyboard.
    pub base_frequency: f64,
    pub master_gain: f64,
    pub voice: Vec<OscillatorMix>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            envelope: EnvelopeParams::default(),
            base_frequency: 110.0,
            master_gain: 0.4,
            // Sub-octave sine under a bright saw.
            voice: vec![
                OscillatorMix::new(Waveform::Sine, 0.5, 1.0),
                OscillatorMix::new(Waveform::SawAnalogue, 1.0, 1.0),
            ],
        }
    }
}

impl SynthConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.envelope.validate()?;
        if !self.base_frequency.is_finite() || self.base_frequency <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "base_frequency must be positive, got {}",
                self.base_frequency
            )));
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "master_gain must be non-negative, got {}",
                self.master_gain
            )));
        }
        for osc in &self.voice {
            if !osc.ratio.is_finite() || osc.ratio < 0.0 || !osc.weight.is_finite() {
                return Err(Error::InvalidConfig(format!("bad oscillator {osc:?}")));
            }
        }
        Ok(())
    }
}
