use crate::audio::block::BlockQueue;
use crate::audio::producer::clip;
use crate::audio::Sink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Converts mono samples to interleaved 16-bit little-endian PCM, repeating
/// each sample across `channels`. Reuses `out`'s allocation.
pub fn encode_pcm16(samples: &[f32], channels: u16, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(samples.len() * usize::from(channels) * 2);
    for sample in samples {
        let value = (clip(f64::from(*sample)) * f64::from(i16::MAX)).round() as i16;
        for _ in 0..channels {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Pops blocks in order and writes them to the [Sink] until the queue is
/// closed and drained.
pub struct SampleConsumer<S: Sink> {
    queue: Arc<BlockQueue>,
    sink: S,
    channels: u16,
    write_errors: Arc<AtomicU64>,
    buffer: Vec<u8>,
}

impl<S: Sink> SampleConsumer<S> {
    pub fn new(queue: Arc<BlockQueue>, sink: S, channels: u16, write_errors: Arc<AtomicU64>) -> Self {
        Self {
            queue,
            sink,
            channels,
            write_errors,
            buffer: Vec::new(),
        }
    }

    /// Plays until end of stream, then hands the sink back for closing.
    ///
    /// A failed write is counted and logged, and playback carries on with
    /// the next block.
    pub fn run(mut self) -> S {
        while let Some(block) = self.queue.pop() {
            encode_pcm16(block.samples(), self.channels, &mut self.buffer);
            self.queue.recycle(block);
            if let Err(e) = self.sink.write(&self.buffer) {
                let count = self.write_errors.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!("Dropped a block ({count} so far): {e}");
            }
        }
        log::debug!("Consumer reached end of stream");
        self.sink
    }
}
