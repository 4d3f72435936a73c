mod block;
mod clock;
mod consumer;
#[cfg(feature = "native")]
mod cpal_sink;
mod pipeline;
mod producer;

pub use self::block::{AudioBlock, BlockQueue};
pub use self::clock::Clock;
pub use self::consumer::{encode_pcm16, SampleConsumer};
#[cfg(feature = "native")]
pub use self::cpal_sink::CpalSink;
pub use self::pipeline::Audio;
pub use self::producer::{clip, GeneratorSlot, SampleProducer};

use crate::error::Result;

/// Bits per sample of the PCM written to a [Sink].
pub const BIT_DEPTH: u16 = 16;

/// Parameters a [Sink] is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkParams {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    /// Size of one converted block in bytes.
    pub buffer_size_bytes: usize,
}

/// An audio output device fed with interleaved little-endian PCM.
pub trait Sink: Send {
    /// Blocks until the device has accepted `bytes`.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
