use crate::error::{Error, Result};
use crate::synth::note::NoteEvent;
use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use std::io::{stdin, stdout, Write};
use std::sync::mpsc::Sender;
use std::sync::mpsc::{self, Receiver};

fn midi_error(e: impl std::fmt::Display) -> Error {
    Error::Midi(e.to_string())
}

/// Decodes a channel voice message into a note event, if it is one.
/// A note on with zero velocity is a note off.
pub(crate) fn decode(status: u8, data1: u8, data2: u8) -> Option<Result<NoteEvent>> {
    let note_on = status & 0xF0 == 0x90 && data2 > 0;
    let note_off = (status & 0xF0 == 0x80) || (status & 0xF0 == 0x90 && data2 == 0);
    if note_on || note_off {
        Some(NoteEvent::from_midi(data1, note_on))
    } else {
        None
    }
}

pub struct MidiHandler {
    /// Holds the connection to keep it alive
    #[allow(dead_code)]
    connection: Option<MidiInputConnection<()>>,
    receiver: Option<Receiver<(u8, u8, u8)>>, // (status, data1, data2)
    note_sender: Sender<NoteEvent>,
}

impl MidiHandler {
    /// Connects to a user-selected input port. MIDI is disabled, not fatal,
    /// when no port can be opened.
    pub fn new(note_sender: Sender<NoteEvent>) -> Self {
        match Self::try_new(note_sender.clone()) {
            Ok(handler) => handler,
            Err(e) => {
                log::info!("{}. MIDI input is disabled.", e);
                Self {
                    connection: None,
                    receiver: None,
                    note_sender,
                }
            }
        }
    }

    fn try_new(note_sender: Sender<NoteEvent>) -> Result<Self> {
        let midi_in = MidiInput::new("NoiseMaker Input").map_err(midi_error)?;
        let port = Self::select_input_port(&midi_in)?;
        let port_name = midi_in.port_name(&port).map_err(midi_error)?;

        let (sender, receiver) = mpsc::channel();

        let connection = midi_in
            .connect(
                &port,
                "noisemaker-read-input",
                move |_, message, _| {
                    if message.len() >= 3 {
                        let _ = sender.send((message[0], message[1], message[2]));
                    }
                },
                (),
            )
            .map_err(midi_error)?;

        log::info!("Opened MIDI port: {}", port_name);

        Ok(Self {
            connection: Some(connection),
            receiver: Some(receiver),
            note_sender,
        })
    }

    fn select_input_port(midi_in: &MidiInput) -> Result<MidiInputPort> {
        let in_ports = midi_in.ports();
        if in_ports.is_empty() {
            return Err(Error::Midi("No MIDI input ports found".into()));
        }

        println!("Available MIDI input ports:");
        for (i, port) in in_ports.iter().enumerate() {
            println!("{}: {}", i, midi_in.port_name(port).map_err(midi_error)?);
        }

        print!("Select MIDI input port: ");
        stdout().flush()?;
        let mut input = String::new();
        stdin().read_line(&mut input)?;
        let selection = input.trim().parse::<usize>().unwrap_or(0);

        in_ports
            .get(selection)
            .cloned()
            .ok_or_else(|| Error::Midi("Invalid MIDI port selection".into()))
    }

    /// Forwards every note message received since the last call.
    pub fn update(&mut self) {
        if let Some(receiver) = &self.receiver {
            while let Ok((status, data1, data2)) = receiver.try_recv() {
                match decode(status, data1, data2) {
                    Some(Ok(event)) => {
                        if let Err(e) = self.note_sender.send(event) {
                            log::error!("Failed to send MIDI NoteEvent: {}", e);
                        }
                    }
                    Some(Err(e)) => log::warn!("Ignoring MIDI message: {}", e),
                    None => {}
                }
            }
        }
    }
}
