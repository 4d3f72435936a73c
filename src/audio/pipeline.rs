use crate::audio::block::BlockQueue;
use crate::audio::clock::Clock;
use crate::audio::consumer::SampleConsumer;
use crate::audio::producer::{GeneratorSlot, SampleProducer};
use crate::audio::{Sink, SinkParams, BIT_DEPTH};
use crate::config::AudioConfig;
use crate::error::{Error, Result};
use crate::synth::generator::Generator;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A running playback session: a producer thread filling blocks from the
/// installed [Generator], a consumer thread writing them to a [Sink], and the
/// bounded [BlockQueue] between them.
///
/// Dropping an [Audio] stops it.
#[derive(Debug)]
pub struct Audio {
    params: SinkParams,
    clock: Clock,
    queue: Arc<BlockQueue>,
    generator: Arc<GeneratorSlot>,
    active: Arc<AtomicBool>,
    write_errors: Arc<AtomicU64>,
    producer: Option<JoinHandle<()>>,
    consumer: Option<JoinHandle<Box<dyn Sink>>>,
}

impl Audio {
    /// Opens a sink through `open` and starts playback of silence.
    ///
    /// If the sink cannot be opened no thread is started and the error is
    /// returned.
    pub fn create<S, F>(config: &AudioConfig, open: F) -> Result<Self>
    where
        S: Sink + 'static,
        F: FnOnce(&SinkParams) -> Result<S>,
    {
        config.validate()?;
        let params = SinkParams {
            sample_rate: config.sample_rate,
            channels: config.channels,
            bit_depth: BIT_DEPTH,
            buffer_size_bytes: config.block_samples
                * usize::from(config.channels)
                * usize::from(BIT_DEPTH / 8),
        };
        let sink: Box<dyn Sink> = Box::new(open(&params)?);

        let clock = Clock::new(config.sample_rate);
        let queue = Arc::new(BlockQueue::new(config.block_count, config.block_samples));
        let generator = Arc::new(GeneratorSlot::default());
        let active = Arc::new(AtomicBool::new(true));
        let write_errors = Arc::new(AtomicU64::new(0));

        let consumer = SampleConsumer::new(
            Arc::clone(&queue),
            sink,
            config.channels,
            Arc::clone(&write_errors),
        );
        let consumer = thread::Builder::new()
            .name("noisemaker-consumer".into())
            .spawn(move || consumer.run())?;

        let producer = SampleProducer::new(
            clock.clone(),
            Arc::clone(&queue),
            Arc::clone(&generator),
            Arc::clone(&active),
        );
        let producer = match thread::Builder::new()
            .name("noisemaker-producer".into())
            .spawn(move || producer.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                queue.close();
                if let Ok(mut sink) = consumer.join() {
                    sink.close()?;
                }
                return Err(e.into());
            }
        };

        log::info!(
            "Audio started: {} Hz, {} channel(s), {} blocks of {} samples",
            config.sample_rate,
            config.channels,
            config.block_count,
            config.block_samples
        );
        Ok(Self {
            params,
            clock,
            queue,
            generator,
            active,
            write_errors,
            producer: Some(producer),
            consumer: Some(consumer),
        })
    }

    /// Installs the signal source. Safe while running; the producer picks it
    /// up at its next block.
    pub fn set_generator(&self, generator: impl Generator + 'static) {
        self.set_shared_generator(Arc::new(generator));
    }

    pub fn set_shared_generator(&self, generator: Arc<dyn Generator>) {
        self.generator.replace(generator);
    }

    /// Current global time in seconds.
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    /// A handle for reading the global time from other threads.
    pub fn clock(&self) -> Clock {
        self.clock.clone()
    }

    pub fn params(&self) -> &SinkParams {
        &self.params
    }

    /// Number of blocks the sink failed to accept.
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.producer.is_some() || self.consumer.is_some()
    }

    /// Stops generation, plays out the blocks already queued, joins both
    /// threads and closes the sink. Calling it again does nothing.
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.active.store(false, Ordering::Release);
        self.queue.close();

        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                log::error!("Producer thread panicked");
            }
        }
        let mut sink = match self.consumer.take() {
            Some(consumer) => consumer.join().map_err(|_| {
                log::error!("Consumer thread panicked; the sink was dropped unclosed");
                Error::ThreadPanicked("consumer")
            })?,
            None => return Ok(()),
        };
        sink.close()?;
        log::info!("Audio stopped at {:.4}s", self.clock.time());
        Ok(())
    }
}

impl Drop for Audio {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("While stopping audio: {e}");
        }
    }
}
