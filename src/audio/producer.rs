use crate::audio::block::{AudioBlock, BlockQueue};
use crate::audio::clock::Clock;
use crate::synth::generator::{Generator, Silence};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Limits a generated value to [-1, 1]; non-finite values become silence.
pub fn clip(sample: f64) -> f64 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// The replaceable signal source read by the producer.
pub struct GeneratorSlot(RwLock<Arc<dyn Generator>>);

impl GeneratorSlot {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self(RwLock::new(generator))
    }

    pub fn current(&self) -> Arc<dyn Generator> {
        Arc::clone(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn replace(&self, generator: Arc<dyn Generator>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = generator;
    }
}

impl Default for GeneratorSlot {
    fn default() -> Self {
        Self::new(Arc::new(Silence))
    }
}

impl std::fmt::Debug for GeneratorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GeneratorSlot").field(&"(dyn Generator)").finish()
    }
}

/// Fills blocks from the generator and pushes them onto the queue.
///
/// The producer is the only writer of the [Clock]. It checks the active flag
/// between blocks, never inside one, so a block that has started is always
/// finished.
#[derive(Debug)]
pub struct SampleProducer {
    clock: Clock,
    queue: Arc<BlockQueue>,
    generator: Arc<GeneratorSlot>,
    active: Arc<AtomicBool>,
}

impl SampleProducer {
    pub fn new(
        clock: Clock,
        queue: Arc<BlockQueue>,
        generator: Arc<GeneratorSlot>,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            clock,
            queue,
            generator,
            active,
        }
    }

    /// Evaluates the generator once per sample of `block`, advancing the
    /// clock by one step after each. A generator swap takes effect at the
    /// next block.
    pub fn fill_block(&self, block: &mut AudioBlock) {
        let generator = self.generator.current();
        for sample in block.samples_mut() {
            *sample = clip(generator.sample(self.clock.time())) as f32;
            self.clock.advance();
        }
    }

    pub fn run(self) {
        while self.active.load(Ordering::Acquire) {
            let mut block = self.queue.acquire();
            self.fill_block(&mut block);
            if self.queue.push(block).is_err() {
                break;
            }
        }
        log::debug!(
            "Producer finished at {:.4}s ({} samples)",
            self.clock.time(),
            self.clock.sample_index()
        );
    }
}
