use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, PoisonError};

/// Frequency and trigger times of the single sounding note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteState {
    pub frequency: f64,
    pub is_on: bool,
    pub trigger_on_time: f64,
    pub trigger_off_time: f64,
}

impl Default for NoteState {
    fn default() -> Self {
        // A note that never sounded has been releasing forever, so the
        // envelope reads silence before the first key press.
        Self {
            frequency: 0.0,
            is_on: false,
            trigger_on_time: 0.0,
            trigger_off_time: f64::NEG_INFINITY,
        }
    }
}

/// Shared, lock-guarded [NoteState]. Controllers write through it and the
/// producer thread reads a [NoteHandle::snapshot] per sample; a write that
/// returns before a snapshot is taken is always visible to that snapshot.
#[derive(Debug, Clone, Default)]
pub struct NoteHandle(Arc<Mutex<NoteState>>);

impl NoteHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(&mut NoteState)) {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    /// Starts sounding `frequency` at `time`.
    pub fn note_on(&self, frequency: f64, time: f64) {
        self.update(|state| {
            state.frequency = frequency;
            state.trigger_on_time = time;
            state.is_on = true;
        });
    }

    /// Retriggers the envelope without touching the frequency.
    pub fn trigger_on(&self, time: f64) {
        self.update(|state| {
            state.trigger_on_time = time;
            state.is_on = true;
        });
    }

    pub fn note_off(&self, time: f64) {
        self.update(|state| {
            state.trigger_off_time = time;
            state.is_on = false;
        });
    }

    pub fn snapshot(&self) -> NoteState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSource {
    Keyboard,
    Midi,
}

/// A key press or release reported by a controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// Key index for the computer keyboard, note number for MIDI.
    pub note_number: u8,
    pub frequency: f64,
    pub is_on: bool,
    pub source: NoteSource,
}

impl NoteEvent {
    /// Key `note_number` semitones above `base_frequency`.
    pub fn from_semitone(
        base_frequency: f64,
        note_number: u8,
        is_on: bool,
        source: NoteSource,
    ) -> Self {
        Self {
            note_number,
            frequency: base_frequency * 2f64.powf(f64::from(note_number) / 12.0),
            is_on,
            source,
        }
    }

    /// Equal-tempered MIDI note, A4 (69) = 440 Hz.
    pub fn from_midi(note_number: u8, is_on: bool) -> Result<Self> {
        if note_number > 127 {
            return Err(Error::Midi(format!("note number {note_number} out of range")));
        }
        Ok(Self {
            note_number,
            frequency: 440.0 * 2f64.powf((f64::from(note_number) - 69.0) / 12.0),
            is_on,
            source: NoteSource::Midi,
        })
    }
}

/// Applies controller events to a [NoteHandle] monophonically: the most
/// recent note on wins, and a note off only releases the note that is
/// actually sounding.
#[derive(Debug)]
pub struct NoteRouter {
    note: NoteHandle,
    sounding: Option<(NoteSource, u8)>,
}

impl NoteRouter {
    pub fn new(note: NoteHandle) -> Self {
        Self {
            note,
            sounding: None,
        }
    }

    pub fn apply(&mut self, event: &NoteEvent, time: f64) {
        let key = (event.source, event.note_number);
        if event.is_on {
            if self.sounding != Some(key) {
                log::debug!("Note on: {:.2} Hz at {:.4}s", event.frequency, time);
                self.note.note_on(event.frequency, time);
                self.sounding = Some(key);
            }
        } else if self.sounding == Some(key) {
            log::debug!("Note off at {:.4}s", time);
            self.note.note_off(time);
            self.sounding = None;
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding.is_some()
    }
}
