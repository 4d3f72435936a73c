use crate::input::ControlEvent;
use crate::synth::note::{NoteEvent, NoteSource};
use crate::synth::waveform::CycleDirection;
use device_query::{DeviceQuery, DeviceState, Keycode};
use std::collections::HashMap;
use std::sync::mpsc::Sender;

/// Keys laid out like a piano: the bottom row holds the white keys, the row
/// above the black ones. Index = semitones above the base frequency.
const NOTE_KEYS: [Keycode; 16] = [
    Keycode::Z,
    Keycode::S,
    Keycode::X,
    Keycode::C,
    Keycode::F,
    Keycode::V,
    Keycode::G,
    Keycode::B,
    Keycode::N,
    Keycode::J,
    Keycode::M,
    Keycode::K,
    Keycode::Comma,
    Keycode::L,
    Keycode::Dot,
    Keycode::Slash,
];

const CONTROL_KEYS: [Keycode; 3] = [Keycode::LeftBracket, Keycode::RightBracket, Keycode::Escape];

pub struct KeyboardHandler {
    device_state: DeviceState,
    base_frequency: f64,
    key_states: HashMap<Keycode, bool>,
    control_keys: HashMap<Keycode, bool>,
    note_sender: Sender<NoteEvent>,
    control_sender: Sender<ControlEvent>,
}

impl KeyboardHandler {
    pub fn new(
        base_frequency: f64,
        note_sender: Sender<NoteEvent>,
        control_sender: Sender<ControlEvent>,
    ) -> Self {
        Self {
            device_state: DeviceState::new(),
            base_frequency,
            key_states: NOTE_KEYS.iter().map(|key| (*key, false)).collect(),
            control_keys: CONTROL_KEYS.iter().map(|key| (*key, false)).collect(),
            note_sender,
            control_sender,
        }
    }

    /// Polls the keyboard and sends an event for every key that changed
    /// since the previous poll.
    pub fn update(&mut self) {
        let keys: Vec<Keycode> = self.device_state.get_keys();

        for (semitone, key) in NOTE_KEYS.iter().enumerate() {
            let is_pressed = keys.contains(key);
            let was_pressed = self.key_states.get(key).cloned().unwrap_or(false);

            if is_pressed != was_pressed {
                let event = NoteEvent::from_semitone(
                    self.base_frequency,
                    semitone as u8,
                    is_pressed,
                    NoteSource::Keyboard,
                );
                log::debug!("Key '{:?}' {}", key, if is_pressed { "pressed" } else { "released" });
                if let Err(e) = self.note_sender.send(event) {
                    log::error!("Error sending note event: {}", e);
                }
                self.key_states.insert(*key, is_pressed);
            }
        }

        for key in CONTROL_KEYS.iter() {
            let is_pressed = keys.contains(key);
            let was_pressed = self.control_keys.get(key).cloned().unwrap_or(false);

            if is_pressed && !was_pressed {
                let event = match key {
                    Keycode::LeftBracket => ControlEvent::CycleWaveform {
                        direction: CycleDirection::Backward,
                    },
                    Keycode::RightBracket => ControlEvent::CycleWaveform {
                        direction: CycleDirection::Forward,
                    },
                    _ => ControlEvent::Quit,
                };
                if let Err(e) = self.control_sender.send(event) {
                    log::error!("Error sending control event: {}", e);
                }
            }

            self.control_keys.insert(*key, is_pressed);
        }
    }
}
