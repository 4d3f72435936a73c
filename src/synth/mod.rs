pub mod envelope;
pub mod generator;
pub mod note;
pub mod prelude;
pub mod waveform;

pub use envelope::{EnvelopeGenerator, EnvelopeParams};
pub use generator::{Generator, OscillatorMix, Silence, SynthGenerator};
pub use note::{NoteEvent, NoteHandle, NoteRouter, NoteSource, NoteState};
pub use waveform::{CycleDirection, Waveform, WaveformGenerator};
