use std::sync::Arc;

use crate::models::error::AudioError;
use crate::models::format::AudioFormat;

/// Callback invoked with each captured input block.
///
/// `samples` is interleaved f32 in the backend's input format. Fires on the
/// backend's capture thread; keep processing minimal.
pub type InputCallback = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

/// Callback asked to fill one output block.
///
/// `out` is interleaved f32 in the backend's output format and must be fully
/// written (silence included). Fires on the backend's render thread.
pub type RenderCallback = Arc<dyn Fn(&mut [f32]) + Send + Sync + 'static>;

/// Hardware side of the audio graph: one input device and one output device.
///
/// Implemented by:
/// - `OfflineBackend` (headless, driven by hand)
/// - `CpalBackend` (headset-cpal)
pub trait AudioBackend: Send {
    /// Whether an output device is present.
    fn is_available(&self) -> bool;

    /// Negotiated input format, or `None` without an input device.
    ///
    /// Only rate and channel count are meaningful; captured samples are
    /// always delivered as interleaved f32.
    fn input_format(&self) -> Option<AudioFormat>;

    /// Negotiated output format (rate and channel count).
    fn output_format(&self) -> Result<AudioFormat, AudioError>;

    /// Start the device streams. Fails with `EngineStartError` when the
    /// hardware cannot be configured.
    fn start(&mut self, input: InputCallback, render: RenderCallback) -> Result<(), AudioError>;

    /// Stop the device streams and release them. Safe when not started.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Human-readable device description.
    fn device_name(&self) -> String;
}
