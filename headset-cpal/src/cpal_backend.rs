//! cpal hardware backend.
//!
//! Opens the input device named by an [`InputRoute`] (or the default) and
//! the default output device. The route is read again on every `start`.
//! cpal streams are not `Send`, so both live on a dedicated I/O thread that
//! builds them, reports the outcome back to `start`, and holds them until
//! `stop` signals it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};

use headset_core::models::error::AudioError;
use headset_core::models::format::AudioFormat;
use headset_core::traits::audio_backend::{AudioBackend, InputCallback, RenderCallback};

use crate::input_route::InputRoute;

/// `AudioBackend` over cpal input and output streams.
pub struct CpalBackend {
    route: InputRoute,
    output_format: Option<AudioFormat>,
    output_name: String,
    running: Arc<AtomicBool>,
    stop_tx: Option<mpsc::Sender<()>>,
    io_handle: Option<thread::JoinHandle<()>>,
}

impl CpalBackend {
    /// Backend on the system default input and output devices.
    pub fn default_devices() -> Self {
        Self::with_input_route(InputRoute::new())
    }

    /// Backend capturing from whatever device `route` names when it starts,
    /// falling back to the default input when that device is not found.
    pub fn with_input_route(route: InputRoute) -> Self {
        let host = cpal::default_host();
        let output = host.default_output_device();
        let output_format = output
            .as_ref()
            .and_then(|d| d.default_output_config().ok())
            .map(|c| AudioFormat::float32(c.sample_rate().0, c.channels()));
        let output_name = output
            .and_then(|d| d.name().ok())
            .unwrap_or_else(|| "No output device".into());

        Self {
            route,
            output_format,
            output_name,
            running: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            io_handle: None,
        }
    }

    /// Input device the next `start` will try to open; `None` is the default.
    pub fn input_device_name(&self) -> Option<String> {
        self.route.device_name()
    }
}

impl AudioBackend for CpalBackend {
    fn is_available(&self) -> bool {
        self.output_format.is_some()
    }

    /// Resolved from the current route, so it tracks preferred-input changes.
    fn input_format(&self) -> Option<AudioFormat> {
        let host = cpal::default_host();
        find_input_device(&host, self.route.device_name().as_deref())
            .and_then(|d| d.default_input_config().ok())
            .map(|c| AudioFormat::float32(c.sample_rate().0, c.channels()))
    }

    fn output_format(&self) -> Result<AudioFormat, AudioError> {
        self.output_format.ok_or(AudioError::DeviceNotAvailable)
    }

    fn start(&mut self, input: InputCallback, render: RenderCallback) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(AudioError::EngineStartError("cpal streams already running".into()));
        }

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), AudioError>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let input_device = self.route.device_name();
        log::info!("Opening input {}", input_device.as_deref().unwrap_or("(default)"));
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("cpal-io".into())
            .spawn(move || {
                let streams = match open_streams(input_device.as_deref(), input, render) {
                    Ok(streams) => streams,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                running.store(true, Ordering::SeqCst);
                let _ = ready_tx.send(Ok(()));

                // Streams stay alive until stop is signalled or the backend is dropped
                let _ = stop_rx.recv();
                drop(streams);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| AudioError::EngineStartError(format!("failed to spawn I/O thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.stop_tx = Some(stop_tx);
                self.io_handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::EngineStartError("I/O thread exited during start".into()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.io_handle.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn device_name(&self) -> String {
        self.output_name.clone()
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

struct Streams {
    _output: Stream,
    _input: Option<Stream>,
}

fn find_input_device(host: &cpal::Host, name: Option<&str>) -> Option<cpal::Device> {
    if let Some(wanted) = name {
        let found = host
            .input_devices()
            .ok()
            .and_then(|mut devices| devices.find(|d| d.name().map(|n| n == wanted).unwrap_or(false)));
        if found.is_some() {
            return found;
        }
        log::warn!("Input device '{}' not found, using default", wanted);
    }
    host.default_input_device()
}

fn start_error(context: &str, err: impl std::fmt::Display) -> AudioError {
    AudioError::EngineStartError(format!("{}: {}", context, err))
}

fn open_streams(input_name: Option<&str>, input: InputCallback, render: RenderCallback) -> Result<Streams, AudioError> {
    let host = cpal::default_host();

    let output_device = host
        .default_output_device()
        .ok_or_else(|| AudioError::EngineStartError("no output device".into()))?;
    let supported = output_device
        .default_output_config()
        .map_err(|e| start_error("output config", e))?;
    let format = supported.sample_format();
    let config = supported.config();
    let output = match format {
        SampleFormat::F32 => build_output::<f32>(&output_device, &config, render)?,
        SampleFormat::I16 => build_output::<i16>(&output_device, &config, render)?,
        SampleFormat::U16 => build_output::<u16>(&output_device, &config, render)?,
        other => return Err(start_error("output", format!("unsupported sample format {:?}", other))),
    };
    output.play().map_err(|e| start_error("play output", e))?;

    let input = match find_input_device(&host, input_name) {
        Some(device) => {
            let supported = device
                .default_input_config()
                .map_err(|e| start_error("input config", e))?;
            let format = supported.sample_format();
            let config = supported.config();
            let stream = match format {
                SampleFormat::F32 => build_input::<f32>(&device, &config, input)?,
                SampleFormat::I16 => build_input::<i16>(&device, &config, input)?,
                SampleFormat::U16 => build_input::<u16>(&device, &config, input)?,
                other => return Err(start_error("input", format!("unsupported sample format {:?}", other))),
            };
            stream.play().map_err(|e| start_error("play input", e))?;
            Some(stream)
        }
        None => {
            log::warn!("No input device; running output only");
            None
        }
    };

    Ok(Streams {
        _output: output,
        _input: input,
    })
}

fn build_output<T>(device: &cpal::Device, config: &StreamConfig, render: RenderCallback) -> Result<Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() != data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                render(&mut scratch);
                for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(sample);
                }
            },
            |err| log::error!("Output stream error: {}", err),
            None,
        )
        .map_err(|e| start_error("build output stream", e))
}

fn build_input<T>(device: &cpal::Device, config: &StreamConfig, input: InputCallback) -> Result<Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| f32::from_sample(s)));
                input(&scratch);
            },
            |err| log::error!("Input stream error: {}", err),
            None,
        )
        .map_err(|e| start_error("build input stream", e))
}
