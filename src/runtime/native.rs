use crate::audio::{Audio, CpalSink};
use crate::config::SynthConfig;
use crate::error::Result;
use crate::input::{ControlEvent, KeyboardHandler, MidiHandler};
use crate::synth::generator::SynthGenerator;
use crate::synth::note::{NoteEvent, NoteHandle, NoteRouter};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "NOISEMAKER_CONFIG";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Native runtime: the cpal-backed pipeline plus the controller events that
/// drive it.
pub struct NativeSynth {
    audio: Audio,
    synth: Arc<SynthGenerator>,
    router: NoteRouter,
    note_receiver: Receiver<NoteEvent>,
    control_receiver: Receiver<ControlEvent>,
}

impl NativeSynth {
    pub fn new(
        config: &SynthConfig,
        note_receiver: Receiver<NoteEvent>,
        control_receiver: Receiver<ControlEvent>,
    ) -> Result<Self> {
        let note = NoteHandle::new();
        let synth = Arc::new(SynthGenerator::new(config, note.clone())?);
        let audio = Audio::create(&config.audio, CpalSink::open)?;
        audio.set_shared_generator(synth.clone());
        Ok(Self {
            audio,
            synth,
            router: NoteRouter::new(note),
            note_receiver,
            control_receiver,
        })
    }

    /// Applies pending controller events. Returns false once quit was asked.
    pub fn process(&mut self) -> bool {
        self.process_note_events();
        self.process_control_events()
    }

    fn process_note_events(&mut self) {
        while let Ok(event) = self.note_receiver.try_recv() {
            self.router.apply(&event, self.audio.time());
        }
    }

    fn process_control_events(&mut self) -> bool {
        while let Ok(event) = self.control_receiver.try_recv() {
            match event {
                ControlEvent::CycleWaveform { direction } => self.synth.cycle_waveforms(direction),
                ControlEvent::Quit => return false,
            }
        }
        true
    }

    pub fn stop(&mut self) -> Result<()> {
        self.audio.stop()
    }

    pub fn time(&self) -> f64 {
        self.audio.time()
    }
}

/// Config from the first argument, else from [CONFIG_ENV], else defaults.
fn load_config() -> Result<SynthConfig> {
    match std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
    {
        Some(path) => {
            log::info!("Loading config from {}", path);
            SynthConfig::load(path)
        }
        None => Ok(SynthConfig::default()),
    }
}

pub fn start() -> Result<()> {
    let config = load_config()?;
    let (note_tx, note_rx) = channel();
    let (control_tx, control_rx) = channel();

    let mut synth = NativeSynth::new(&config, note_rx, control_rx)?;

    let mut keyboard_handler = KeyboardHandler::new(config.base_frequency, note_tx.clone(), control_tx);
    let mut midi_handler = MidiHandler::new(note_tx);

    println!("Play with Z S X C F V G B N J M K , L . /  ([ ] change waveform, Esc quits)");
    loop {
        keyboard_handler.update();
        midi_handler.update();
        if !synth.process() {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    synth.stop()?;
    log::info!("Global time: {:.4}s", synth.time());
    Ok(())
}
