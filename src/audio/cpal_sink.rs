use crate::audio::{Sink, SinkParams};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};

fn init_error(e: impl std::fmt::Display) -> Error {
    Error::SinkInit(e.to_string())
}

/// A [Sink] backed by the default cpal output device.
///
/// cpal pulls samples from a callback, so writes go through a bounded
/// channel the callback drains; a write blocks while the device is a full
/// block behind. The stream itself lives on its own thread because it isn't
/// `Send`.
pub struct CpalSink {
    samples: Option<Sender<i16>>,
    quit: Option<Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    pub fn open(params: &SinkParams) -> Result<Self> {
        if params.bit_depth != 16 {
            return Err(Error::SinkInit(format!(
                "unsupported bit depth {}",
                params.bit_depth
            )));
        }
        let host = cpal::default_host();
        let device = select_output_device(&host)?;
        log::info!("Selected device: {}", device.name().unwrap_or_default());

        let sample_format = device
            .default_output_config()
            .map_err(init_error)?
            .sample_format();
        let frames = params.buffer_size_bytes / 2 / usize::from(params.channels.max(1));
        let config = StreamConfig {
            channels: params.channels,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: BufferSize::Fixed(frames as u32),
        };

        let (sample_sender, sample_receiver) = bounded::<i16>((params.buffer_size_bytes / 2).max(1));
        let (ready_sender, ready_receiver) = bounded::<Result<()>>(1);
        let (quit_sender, quit_receiver) = bounded::<()>(0);

        let stream_thread = thread::Builder::new()
            .name("noisemaker-cpal".into())
            .spawn(move || {
                let stream = build_stream(&device, &config, sample_format, sample_receiver)
                    .and_then(|stream| stream.play().map(|_| stream).map_err(init_error));
                match stream {
                    Ok(stream) => {
                        let _ = ready_sender.send(Ok(()));
                        // Parked until the sink closes.
                        let _ = quit_receiver.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_sender.send(Err(e));
                    }
                }
            })?;

        let ready = ready_receiver
            .recv()
            .map_err(|_| Error::SinkInit("audio stream thread exited".into()))
            .and_then(|ready| ready);
        if let Err(e) = ready {
            let _ = stream_thread.join();
            return Err(e);
        }

        Ok(Self {
            samples: Some(sample_sender),
            quit: Some(quit_sender),
            stream_thread: Some(stream_thread),
        })
    }
}

impl Sink for CpalSink {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let samples = self
            .samples
            .as_ref()
            .ok_or_else(|| Error::SinkWrite("sink is closed".into()))?;
        for pair in bytes.chunks_exact(2) {
            samples
                .send(i16::from_le_bytes([pair[0], pair[1]]))
                .map_err(|_| Error::SinkWrite("audio stream has stopped".into()))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.samples.take();
        self.quit.take();
        if let Some(stream_thread) = self.stream_thread.take() {
            stream_thread
                .join()
                .map_err(|_| Error::SinkWrite("audio stream thread panicked".into()))?;
        }
        Ok(())
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn select_output_device(host: &cpal::Host) -> Result<cpal::Device> {
    if cfg!(target_os = "linux") {
        select_linux_output_device(host)
    } else {
        host.default_output_device()
            .ok_or_else(|| Error::SinkInit("No output device available".into()))
    }
}

/// On Linux the default device list is long and mostly unusable; offer the
/// `default:` and PipeWire devices, and only ask when there is a choice.
fn select_linux_output_device(host: &cpal::Host) -> Result<cpal::Device> {
    let mut device_names = Vec::new();

    for device in host.devices().map_err(init_error)? {
        let name = device.name().unwrap_or_default();
        if name.to_lowercase().starts_with("default:") || name.to_lowercase().contains("pipewire")
        {
            device_names.push(name);
        }
    }

    if device_names.len() < 2 {
        return host
            .default_output_device()
            .ok_or_else(|| Error::SinkInit("No output device available".into()));
    }

    println!("Available output devices:");
    for (i, name) in device_names.iter().enumerate() {
        println!("{}. {}", i + 1, name);
    }

    println!("Select device (default 1): ");
    let mut choice = String::new();
    std::io::stdin().read_line(&mut choice)?;
    let choice = choice
        .trim()
        .parse::<usize>()
        .unwrap_or(1)
        .saturating_sub(1);

    let selected_name = device_names
        .get(choice)
        .ok_or_else(|| Error::SinkInit("Invalid device selection".into()))?;

    host.devices()
        .map_err(init_error)?
        .find(|d| d.name().map(|n| n == *selected_name).unwrap_or(false))
        .ok_or_else(|| Error::SinkInit("Selected output device not found".into()))
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    samples: Receiver<i16>,
) -> Result<Stream> {
    match sample_format {
        SampleFormat::I16 => stream_make::<i16>(device, config, samples),
        SampleFormat::I32 => stream_make::<i32>(device, config, samples),
        SampleFormat::U16 => stream_make::<u16>(device, config, samples),
        SampleFormat::F32 => stream_make::<f32>(device, config, samples),
        SampleFormat::F64 => stream_make::<f64>(device, config, samples),
        other => Err(Error::SinkInit(format!("Unsupported sample format {other:?}"))),
    }
}

fn stream_make<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Receiver<i16>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<i16>,
{
    device
        .build_output_stream(
            config,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                // Underruns play silence rather than stalling the device.
                for sample in output.iter_mut() {
                    *sample = T::from_sample(samples.try_recv().unwrap_or(0));
                }
            },
            |err| log::error!("Stream error: {}", err),
            None,
        )
        .map_err(init_error)
}
