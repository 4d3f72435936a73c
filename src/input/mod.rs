mod keyboard;
mod midi;
pub use self::keyboard::KeyboardHandler;
pub use self::midi::MidiHandler;

use crate::synth::waveform::CycleDirection;

/// Non-note requests from a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    CycleWaveform { direction: CycleDirection },
    Quit,
}
