use crate::error::{Error, Result};
use crate::synth::note::{NoteHandle, NoteState};
use serde::{Deserialize, Serialize};

/// Amplitudes below this are forced to exact silence.
pub const SILENCE_FLOOR: f64 = 1e-4;

/// Linear ADSR shape. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeParams {
    pub attack_time: f64,
    pub decay_time: f64,
    pub sustain_level: f64,
    pub release_time: f64,
    /// Peak reached at the end of the attack.
    pub start_amplitude: f64,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack_time: 0.10,
            decay_time: 0.01,
            sustain_level: 0.8,
            release_time: 0.20,
            start_amplitude: 1.0,
        }
    }
}

impl EnvelopeParams {
    pub fn validate(&self) -> Result<()> {
        for (name, time) in [
            ("attack_time", self.attack_time),
            ("decay_time", self.decay_time),
            ("release_time", self.release_time),
        ] {
            if !time.is_finite() || time < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a non-negative number of seconds, got {time}"
                )));
            }
        }
        for (name, level) in [
            ("sustain_level", self.sustain_level),
            ("start_amplitude", self.start_amplitude),
        ] {
            if !(0.0..=1.0).contains(&level) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {level}"
                )));
            }
        }
        Ok(())
    }

    /// Amplitude multiplier at `time` for a note in state `note`.
    ///
    /// The stage is derived from `note.is_on` and the time elapsed since the
    /// relevant trigger. A zero-length stage is skipped, so its target is
    /// reached immediately.
    pub fn amplitude(&self, time: f64, note: &NoteState) -> f64 {
        let amplitude = if note.is_on {
            let lifetime = (time - note.trigger_on_time).max(0.0);
            if lifetime <= self.attack_time {
                if self.attack_time > 0.0 {
                    (lifetime / self.attack_time) * self.start_amplitude
                } else {
                    self.start_amplitude
                }
            } else if lifetime <= self.attack_time + self.decay_time {
                // Only reachable with a non-zero decay.
                let progress = (lifetime - self.attack_time) / self.decay_time;
                progress * (self.sustain_level - self.start_amplitude) + self.start_amplitude
            } else {
                self.sustain_level
            }
        } else {
            let released_for = time - note.trigger_off_time;
            if self.release_time <= 0.0 || released_for >= self.release_time {
                0.0
            } else {
                let progress = released_for.max(0.0) / self.release_time;
                self.sustain_level * (1.0 - progress)
            }
        };

        if amplitude < SILENCE_FLOOR {
            0.0
        } else {
            amplitude
        }
    }
}

/// An [EnvelopeParams] bound to the note it shapes.
#[derive(Debug, Clone)]
pub struct EnvelopeGenerator {
    params: EnvelopeParams,
    note: NoteHandle,
}

impl EnvelopeGenerator {
    pub fn new(params: EnvelopeParams, note: NoteHandle) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, note })
    }

    pub fn params(&self) -> &EnvelopeParams {
        &self.params
    }

    pub fn note_on(&self, time_on: f64) {
        self.note.trigger_on(time_on);
    }

    pub fn note_off(&self, time_off: f64) {
        self.note.note_off(time_off);
    }

    pub fn amplitude(&self, time: f64) -> f64 {
        self.params.amplitude(time, &self.note.snapshot())
    }
}
