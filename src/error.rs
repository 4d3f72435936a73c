//! Error types for noisemaker.

use thiserror::Error;

/// Result type alias for noisemaker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running the synth.
#[derive(Debug, Error)]
pub enum Error {
    /// The audio output device could not be opened.
    #[error("Sink initialization failed: {0}")]
    SinkInit(String),

    /// The audio output device rejected a buffer.
    #[error("Sink write failed: {0}")]
    SinkWrite(String),

    /// A block was pushed after the queue was closed.
    #[error("Block queue is closed")]
    QueueClosed,

    /// A pipeline thread panicked before it could hand back its resources.
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// MIDI input setup failed.
    #[error("MIDI error: {0}")]
    Midi(String),

    /// I/O error (config files, stdin prompts).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
