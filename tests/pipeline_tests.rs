use approx::assert_abs_diff_eq;
use crossbeam_channel::{unbounded, Receiver};
use noisemaker::audio::{Audio, Sink, SinkParams};
use noisemaker::config::AudioConfig;
use noisemaker::{Error, Result};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// In-memory sink recording every byte written to it.
#[derive(Clone, Default)]
struct RecordingSink {
    bytes: Arc<Mutex<Vec<u8>>>,
    closes: Arc<AtomicUsize>,
    // When set, each write waits for a permit (or for the sender to go away).
    gate: Option<Receiver<()>>,
    fail_writes: bool,
    panic_on_write: bool,
}

impl RecordingSink {
    fn gated(gate: Receiver<()>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    fn samples(&self) -> Vec<i16> {
        self.bytes
            .lock()
            .unwrap()
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    fn sample_count(&self) -> usize {
        self.bytes.lock().unwrap().len() / 2
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Sink for RecordingSink {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        if self.panic_on_write {
            panic!("sink driver crashed");
        }
        if self.fail_writes {
            return Err(Error::SinkWrite("unplugged".into()));
        }
        self.bytes.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn config(block_count: usize, block_samples: usize) -> AudioConfig {
    AudioConfig {
        sample_rate: 44100,
        channels: 1,
        block_count,
        block_samples,
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn failed_sink_open_is_reported() {
    let result = Audio::create(&config(8, 512), |_params: &SinkParams| -> Result<RecordingSink> {
        Err(Error::SinkInit("no device".into()))
    });
    assert!(matches!(result, Err(Error::SinkInit(_))));
}

#[test]
fn sink_is_opened_with_matching_parameters() {
    let stereo = AudioConfig {
        channels: 2,
        ..config(4, 256)
    };
    let mut audio = Audio::create(&stereo, |params: &SinkParams| {
        assert_eq!(params.sample_rate, 44100);
        assert_eq!(params.channels, 2);
        assert_eq!(params.bit_depth, 16);
        assert_eq!(params.buffer_size_bytes, 256 * 2 * 2);
        Ok(RecordingSink::default())
    })
    .unwrap();
    audio.stop().unwrap();
}

#[test]
fn sine_plays_continuously_across_blocks() {
    let sink = RecordingSink::default();
    let mut audio = Audio::create(&config(8, 512), |_: &SinkParams| Ok(sink.clone())).unwrap();
    audio.set_generator(|t: f64| (2.0 * PI * 440.0 * t).sin());

    // The generator may have been installed a few blocks in; the sine starts
    // at the first block holding a non-zero sample.
    let sine_start = |samples: &[i16]| {
        samples
            .iter()
            .position(|s| *s != 0)
            .map(|first| first - first % 512)
    };
    wait_until(|| {
        let samples = sink.samples();
        sine_start(&samples).is_some_and(|start| samples.len() >= start + 44100)
    });
    audio.stop().unwrap();

    let samples = sink.samples();
    let generated = audio.clock().sample_index() as usize;
    assert_eq!(samples.len() % 512, 0);
    assert!(samples.len() <= generated);

    let start = sine_start(&samples).unwrap();
    for (n, sample) in samples[start..start + 44100].iter().enumerate() {
        let t = (start + n) as f64 / 44100.0;
        let expected = ((2.0 * PI * 440.0 * t).sin() * 32767.0).round();
        assert!(
            (f64::from(*sample) - expected).abs() <= 1.0,
            "sample {} is {} but expected {}",
            start + n,
            sample,
            expected
        );
    }
    assert_abs_diff_eq!(
        audio.time(),
        generated as f64 / 44100.0,
        epsilon = 1e-9
    );
}

#[test]
fn one_second_of_generated_samples_reads_as_one_second() {
    let (permits, gate) = unbounded();
    let sink = RecordingSink::gated(gate);
    // A stalled sink lets the producer run exactly (8 + 2) blocks of 4410.
    let mut audio = Audio::create(&config(8, 4410), |_: &SinkParams| Ok(sink.clone())).unwrap();
    let clock = audio.clock();
    wait_until(|| clock.sample_index() == 44100);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(clock.sample_index(), 44100);
    assert_abs_diff_eq!(audio.time(), 1.0, epsilon = 1e-9);

    drop(permits);
    audio.stop().unwrap();
}

#[test]
fn producer_is_held_back_by_a_slow_sink() {
    let (permits, gate) = unbounded();
    let sink = RecordingSink::gated(gate);
    let block_count = 2;
    let block_samples = 64;
    let mut audio = Audio::create(&config(block_count, block_samples), |_: &SinkParams| {
        Ok(sink.clone())
    })
    .unwrap();
    let clock = audio.clock();

    // One block stuck in the sink, a full queue, one more filled and waiting.
    let limit = ((block_count + 2) * block_samples) as u64;
    wait_until(|| clock.sample_index() == limit);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(clock.sample_index(), limit);
    assert_eq!(sink.sample_count(), 0);

    permits.send(()).unwrap();
    wait_until(|| clock.sample_index() == limit + block_samples as u64);

    drop(permits);
    audio.stop().unwrap();
}

#[test]
fn stop_flushes_queued_blocks() {
    let (permits, gate) = unbounded();
    let sink = RecordingSink::gated(gate);
    let block_samples = 128;
    let mut audio = Audio::create(&config(4, block_samples), |_: &SinkParams| Ok(sink.clone())).unwrap();
    let clock = audio.clock();
    wait_until(|| clock.sample_index() == (6 * block_samples) as u64);

    drop(permits);
    audio.stop().unwrap();

    // Everything generated reaches the sink except, at most, the block the
    // producer was holding when the queue closed.
    let generated = clock.sample_index() as usize;
    let written = sink.sample_count();
    assert!(generated - written == 0 || generated - written == block_samples);
    assert!(written >= 5 * block_samples);
}

#[test]
fn stop_is_idempotent() {
    let sink = RecordingSink::default();
    let mut audio = Audio::create(&config(8, 512), |_: &SinkParams| Ok(sink.clone())).unwrap();
    assert!(audio.is_running());
    audio.stop().unwrap();
    let time = audio.time();
    audio.stop().unwrap();
    assert!(!audio.is_running());
    assert_eq!(audio.time(), time);
    assert_eq!(sink.closes(), 1);
    drop(audio);
    assert_eq!(sink.closes(), 1);
}

#[test]
fn dropping_the_pipeline_stops_it() {
    let sink = RecordingSink::default();
    let audio = Audio::create(&config(8, 512), |_: &SinkParams| Ok(sink.clone())).unwrap();
    wait_until(|| sink.sample_count() > 0);
    drop(audio);
    assert_eq!(sink.closes(), 1);
}

#[test]
fn write_errors_are_counted_and_playback_continues() {
    let sink = RecordingSink {
        fail_writes: true,
        ..Default::default()
    };
    let mut audio = Audio::create(&config(2, 32), |_: &SinkParams| Ok(sink.clone())).unwrap();
    wait_until(|| audio.write_errors() >= 10);
    audio.stop().unwrap();
    assert_eq!(sink.closes(), 1);
    assert_eq!(sink.sample_count(), 0);
}

#[test]
fn consumer_panic_is_reported_by_stop() {
    let sink = RecordingSink {
        panic_on_write: true,
        ..Default::default()
    };
    let mut audio = Audio::create(&config(2, 32), |_: &SinkParams| Ok(sink.clone())).unwrap();
    let clock = audio.clock();
    wait_until(|| clock.sample_index() > 0);
    assert!(matches!(audio.stop(), Err(Error::ThreadPanicked("consumer"))));
    assert!(!audio.is_running());
    assert_eq!(sink.closes(), 0);
    audio.stop().unwrap();
}

#[test]
fn generator_can_be_replaced_while_running() {
    let sink = RecordingSink::default();
    let mut audio = Audio::create(&config(4, 64), |_: &SinkParams| Ok(sink.clone())).unwrap();
    wait_until(|| sink.sample_count() > 0);
    audio.set_generator(|_t: f64| 0.5);
    wait_until(|| sink.samples().contains(&16384));
    audio.set_generator(|_t: f64| -2.0);
    wait_until(|| sink.samples().contains(&-32767));
    audio.stop().unwrap();
}

#[test]
fn synth_voice_follows_note_events() {
    use noisemaker::config::SynthConfig;
    use noisemaker::synth::{NoteHandle, SynthGenerator};

    let synth_config = SynthConfig::default();
    let note = NoteHandle::new();
    let synth = Arc::new(SynthGenerator::new(&synth_config, note.clone()).unwrap());
    let sink = RecordingSink::default();
    let mut audio = Audio::create(&config(4, 256), |_: &SinkParams| Ok(sink.clone())).unwrap();
    audio.set_shared_generator(synth);

    wait_until(|| sink.sample_count() > 4096);
    assert!(sink.samples().iter().all(|s| *s == 0));

    note.note_on(220.0, audio.time());
    wait_until(|| sink.samples().iter().any(|s| *s != 0));

    let released_at = audio.time();
    note.note_off(released_at);
    // Past the release the voice is silent again.
    let silent_from = ((released_at + synth_config.envelope.release_time) * 44100.0) as u64 + 1;
    wait_until(|| sink.sample_count() as u64 > silent_from + 44100);
    audio.stop().unwrap();

    let samples = sink.samples();
    let tail = &samples[silent_from as usize..silent_from as usize + 44100];
    assert!(tail.iter().all(|s| *s == 0));
}
