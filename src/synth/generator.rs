use crate::config::SynthConfig;
use crate::error::Result;
use crate::synth::envelope::EnvelopeParams;
use crate::synth::note::NoteHandle;
use crate::synth::waveform::{CycleDirection, Waveform, WaveformGenerator};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A signal source: maps an absolute time in seconds to an amplitude.
///
/// The pipeline calls this once per sample on its producer thread.
pub trait Generator: Send + Sync {
    fn sample(&self, time: f64) -> f64;
}

impl<F> Generator for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn sample(&self, time: f64) -> f64 {
        self(time)
    }
}

/// The generator installed before any other.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl Generator for Silence {
    fn sample(&self, _time: f64) -> f64 {
        0.0
    }
}

/// One oscillator in the voice mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorMix {
    pub waveform: Waveform,
    /// Multiplier applied to the note frequency.
    pub ratio: f64,
    pub weight: f64,
}

impl OscillatorMix {
    pub fn new(waveform: Waveform, ratio: f64, weight: f64) -> Self {
        Self {
            waveform,
            ratio,
            weight,
        }
    }
}

/// Envelope-shaped oscillator mix driven by the shared note state.
#[derive(Debug)]
pub struct SynthGenerator {
    envelope: EnvelopeParams,
    note: NoteHandle,
    oscillators: Vec<OscillatorMix>,
    master_gain: f64,
    waveforms: WaveformGenerator,
    // How far every oscillator's waveform has been cycled.
    waveform_shift: AtomicUsize,
}

impl SynthGenerator {
    pub fn new(config: &SynthConfig, note: NoteHandle) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            envelope: config.envelope,
            note,
            oscillators: config.voice.clone(),
            master_gain: config.master_gain,
            waveforms: WaveformGenerator::new(),
            waveform_shift: AtomicUsize::new(0),
        })
    }

    /// Replaces the noise stream, for reproducible output.
    pub fn with_waveforms(mut self, waveforms: WaveformGenerator) -> Self {
        self.waveforms = waveforms;
        self
    }

    pub fn note(&self) -> &NoteHandle {
        &self.note
    }

    /// Moves every oscillator one step along [Waveform::ALL].
    pub fn cycle_waveforms(&self, direction: CycleDirection) {
        let step = match direction {
            CycleDirection::Forward => 1,
            CycleDirection::Backward => Waveform::ALL.len() - 1,
        };
        let previous = self
            .waveform_shift
            .fetch_add(step, Ordering::Relaxed);
        let shift = (previous + step) % Waveform::ALL.len();
        log::info!("Waveforms now {:?}", self.waveforms_with_shift(shift));
    }

    /// Current waveform of each oscillator.
    pub fn waveforms(&self) -> Vec<Waveform> {
        self.waveforms_with_shift(self.waveform_shift.load(Ordering::Relaxed))
    }

    fn waveforms_with_shift(&self, shift: usize) -> Vec<Waveform> {
        self.oscillators
            .iter()
            .map(|osc| osc.waveform.shifted(shift))
            .collect()
    }
}

impl Generator for SynthGenerator {
    fn sample(&self, time: f64) -> f64 {
        let note = self.note.snapshot();
        let amplitude = self.envelope.amplitude(time, &note);
        if amplitude == 0.0 {
            return 0.0;
        }
        let shift = self.waveform_shift.load(Ordering::Relaxed);
        let mix: f64 = self
            .oscillators
            .iter()
            .map(|osc| {
                osc.weight
                    * self.waveforms.oscillate(
                        note.frequency * osc.ratio,
                        time,
                        osc.waveform.shifted(shift),
                    )
            })
            .sum();
        (amplitude * mix * self.master_gain).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::prelude::angular_velocity;
    use approx::assert_abs_diff_eq;

    fn pure_sine_config() -> SynthConfig {
        SynthConfig {
            voice: vec![OscillatorMix::new(Waveform::Sine, 1.0, 1.0)],
            master_gain: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn closures_are_generators() {
        let constant = |_t: f64| 0.25;
        assert_eq!(constant.sample(12.0), 0.25);
        assert_eq!(Silence.sample(1.0), 0.0);
    }

    #[test]
    fn silent_until_a_note_is_played() {
        let synth = SynthGenerator::new(&SynthConfig::default(), NoteHandle::new()).unwrap();
        assert!((0..1000).all(|i| synth.sample(i as f64 / 1000.0) == 0.0));
    }

    #[test]
    fn sustained_note_follows_envelope_times_oscillator() {
        let config = pure_sine_config();
        let note = NoteHandle::new();
        let synth = SynthGenerator::new(&config, note.clone()).unwrap();
        note.note_on(440.0, 0.0);

        let sustain = config.envelope.sustain_level;
        for i in 0..100 {
            let t = 0.5 + i as f64 / 44100.0;
            let expected = sustain * (angular_velocity(440.0) * t).sin();
            assert_abs_diff_eq!(synth.sample(t), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn loud_mixes_are_clipped() {
        let config = SynthConfig {
            voice: vec![OscillatorMix::new(Waveform::Square, 1.0, 3.0)],
            master_gain: 1.0,
            ..Default::default()
        };
        let note = NoteHandle::new();
        let synth = SynthGenerator::new(&config, note.clone()).unwrap();
        note.note_on(100.0, 0.0);
        for i in 0..4410 {
            let value = synth.sample(0.5 + i as f64 / 44100.0);
            assert!((-1.0..=1.0).contains(&value));
        }
        assert_eq!(synth.sample(0.5 + 0.001), 1.0);
    }

    #[test]
    fn cycling_changes_every_oscillator() {
        let synth = SynthGenerator::new(&SynthConfig::default(), NoteHandle::new()).unwrap();
        let before = synth.waveforms();
        synth.cycle_waveforms(CycleDirection::Forward);
        let after = synth.waveforms();
        assert_eq!(
            after,
            before.iter().map(|w| w.next()).collect::<Vec<_>>()
        );
        synth.cycle_waveforms(CycleDirection::Backward);
        assert_eq!(synth.waveforms(), before);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SynthConfig {
            master_gain: f64::NAN,
            ..Default::default()
        };
        assert!(SynthGenerator::new(&config, NoteHandle::new()).is_err());
    }
}
