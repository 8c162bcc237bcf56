//! Hand-driven backend for headless runs and tests.
//!
//! No threads and no hardware: the caller pushes captured input with
//! [`OfflineBackend::push_input`] and pulls rendered output with
//! [`OfflineBackend::pull_output`]. Both are ignored while stopped.

use crate::models::error::AudioError;
use crate::models::format::AudioFormat;
use crate::traits::audio_backend::{AudioBackend, InputCallback, RenderCallback};

pub struct OfflineBackend {
    input_format: Option<AudioFormat>,
    output_format: Option<AudioFormat>,
    input: Option<InputCallback>,
    render: Option<RenderCallback>,
    fail_on_start: bool,
    start_count: usize,
}

impl OfflineBackend {
    /// Backend with both an input and an output device.
    pub fn new(input_rate: u32, input_channels: u16, output_rate: u32, output_channels: u16) -> Self {
        Self {
            input_format: Some(AudioFormat::float32(input_rate, input_channels)),
            output_format: Some(AudioFormat::float32(output_rate, output_channels)),
            input: None,
            render: None,
            fail_on_start: false,
            start_count: 0,
        }
    }

    /// Backend with an output device only.
    pub fn output_only(output_rate: u32, output_channels: u16) -> Self {
        Self {
            input_format: None,
            ..Self::new(output_rate, output_channels, output_rate, output_channels)
        }
    }

    /// Backend with no devices at all.
    pub fn unavailable() -> Self {
        Self {
            input_format: None,
            output_format: None,
            ..Self::new(48000, 1, 48000, 1)
        }
    }

    /// Make the next `start` calls fail with `EngineStartError`.
    pub fn fail_on_start(&mut self, fail: bool) {
        self.fail_on_start = fail;
    }

    /// Successful `start` calls so far.
    pub fn start_count(&self) -> usize {
        self.start_count
    }

    pub fn is_started(&self) -> bool {
        self.render.is_some()
    }

    /// Deliver interleaved input samples as if captured. Returns whether a
    /// capture callback consumed them.
    pub fn push_input(&self, samples: &[f32]) -> bool {
        match &self.input {
            Some(callback) if self.input_format.is_some() => {
                callback(samples);
                true
            }
            _ => false,
        }
    }

    /// Render `frames` frames of interleaved output. Silence while stopped.
    pub fn pull_output(&self, frames: usize) -> Vec<f32> {
        let channels = self.output_format.map(|f| f.channels as usize).unwrap_or(1);
        let mut out = vec![0.0; frames * channels];
        if let Some(render) = &self.render {
            render(&mut out);
        }
        out
    }
}

impl AudioBackend for OfflineBackend {
    fn is_available(&self) -> bool {
        self.output_format.is_some()
    }

    fn input_format(&self) -> Option<AudioFormat> {
        self.input_format
    }

    fn output_format(&self) -> Result<AudioFormat, AudioError> {
        self.output_format.ok_or(AudioError::DeviceNotAvailable)
    }

    fn start(&mut self, input: InputCallback, render: RenderCallback) -> Result<(), AudioError> {
        if self.fail_on_start {
            return Err(AudioError::EngineStartError("offline backend set to fail".into()));
        }
        if self.output_format.is_none() {
            return Err(AudioError::EngineStartError("no output device".into()));
        }
        self.input = Some(input);
        self.render = Some(render);
        self.start_count += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.input = None;
        self.render = None;
        Ok(())
    }

    fn device_name(&self) -> String {
        "Offline".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn ignores_io_while_stopped() {
        let backend = OfflineBackend::new(48000, 1, 48000, 2);
        assert!(!backend.push_input(&[0.1; 4]));
        assert_eq!(backend.pull_output(3), vec![0.0; 6]);
    }

    #[test]
    fn routes_io_to_callbacks_once_started() {
        let mut backend = OfflineBackend::new(48000, 1, 48000, 1);
        let captured = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&captured);
        backend
            .start(
                Arc::new(move |s: &[f32]| {
                    counter.fetch_add(s.len(), Ordering::SeqCst);
                }),
                Arc::new(|out: &mut [f32]| out.fill(0.5)),
            )
            .unwrap();

        assert!(backend.push_input(&[0.0; 10]));
        assert_eq!(captured.load(Ordering::SeqCst), 10);
        assert_eq!(backend.pull_output(2), vec![0.5, 0.5]);

        backend.stop().unwrap();
        assert!(!backend.is_started());
    }

    #[test]
    fn unavailable_backend_cannot_start() {
        let mut backend = OfflineBackend::unavailable();
        assert!(!backend.is_available());
        assert_eq!(backend.output_format(), Err(AudioError::DeviceNotAvailable));
        let err = backend
            .start(Arc::new(|_: &[f32]| {}), Arc::new(|_: &mut [f32]| {}))
            .unwrap_err();
        assert!(matches!(err, AudioError::EngineStartError(_)));
    }
}
