use std::sync::Arc;

use parking_lot::Mutex;

use crate::graph::input_node::{InputNode, TapBlock};
use crate::graph::player_node::PlayerNode;
use crate::models::error::AudioError;
use crate::models::format::AudioFormat;
use crate::models::state::EngineState;
use crate::processing::converter::FormatConverter;
use crate::traits::audio_backend::{AudioBackend, InputCallback, RenderCallback};

/// Name reported for the hardware output node.
pub const OUTPUT_NODE_NAME: &str = "AudioOutputNode";

/// The audio graph: input node (with taps) → player node → output, over an
/// injected hardware backend.
///
/// ```text
/// [Backend input] → [InputNode] → taps
///                                  ↓ (recorder, via controller)
///                   [PlayerNode] → [Backend output]
/// ```
///
/// Transitions hold the state lock across backend start/stop, so concurrent
/// `start`/`stop` calls are serialised. Realtime callbacks never touch it.
pub struct AudioEngine<B: AudioBackend> {
    backend: Mutex<B>,
    state: Mutex<EngineState>,
    player: Arc<PlayerNode>,
    input: Arc<InputNode>,
    attached: Mutex<Vec<String>>,
}

impl<B: AudioBackend> AudioEngine<B> {
    pub fn new(backend: B, converter: FormatConverter) -> Self {
        let input = Arc::new(InputNode::new(converter));
        input.set_hardware_format(backend.input_format());
        Self {
            backend: Mutex::new(backend),
            state: Mutex::new(EngineState::Unconfigured),
            player: Arc::new(PlayerNode::new(converter)),
            input,
            attached: Mutex::new(vec![InputNode::NAME.to_string(), OUTPUT_NODE_NAME.to_string()]),
        }
    }

    /// Attach the player node and connect it to the output with the
    /// backend's output rate and channel count. Only valid once.
    pub fn setup(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if *state != EngineState::Unconfigured {
            return Err(AudioError::InvalidState(format!(
                "engine already set up (state: {:?})",
                *state
            )));
        }

        let output = self.backend.lock().output_format()?;
        self.player
            .connect(AudioFormat::float32(output.sample_rate, output.channels));
        self.attached.lock().push(PlayerNode::NAME.to_string());

        *state = EngineState::Configured;
        log::info!("Engine set up, player connected at {} Hz / {} ch", output.sample_rate, output.channels);
        Ok(())
    }

    /// Start the hardware. No-op when already running.
    ///
    /// Backend failures surface as `EngineStartError` and leave the state
    /// unchanged.
    pub fn start(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if state.is_running() {
            log::debug!("Engine already running");
            return Ok(());
        }
        if !state.can_start() {
            return Err(AudioError::InvalidState(format!(
                "cannot start engine from {:?}",
                *state
            )));
        }

        let input = Arc::clone(&self.input);
        let input_callback: InputCallback = Arc::new(move |samples: &[f32]| input.process_input(samples));

        let mut backend = self.backend.lock();
        self.input.set_hardware_format(backend.input_format());
        let channels = backend
            .output_format()
            .map(|f| f.channels as usize)
            .unwrap_or(1);
        let player = Arc::clone(&self.player);
        let render_callback: RenderCallback = Arc::new(move |out: &mut [f32]| player.render(out, channels));

        backend
            .start(input_callback, render_callback)
            .map_err(|e| match e {
                AudioError::EngineStartError(_) => e,
                other => AudioError::EngineStartError(other.to_string()),
            })?;

        *state = EngineState::Running;
        log::info!("Engine started on {}", backend.device_name());
        Ok(())
    }

    /// Stop the hardware and the player. Returns whether the engine was
    /// running or paused.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, EngineState::Running | EngineState::Paused) {
            return false;
        }
        if let Err(e) = self.backend.lock().stop() {
            log::error!("Backend stop failed: {}", e);
        }
        self.player.stop();
        self.input.reset();
        *state = EngineState::Stopped;
        log::info!("Engine stopped");
        true
    }

    /// Halt the hardware but keep scheduled player audio. Returns whether
    /// the engine was running.
    pub fn pause(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_running() {
            return false;
        }
        if let Err(e) = self.backend.lock().stop() {
            log::error!("Backend stop failed: {}", e);
        }
        *state = EngineState::Paused;
        log::info!("Engine paused");
        true
    }

    /// Drop scheduled player audio and partially assembled tap blocks.
    pub fn reset(&self) {
        self.player.stop();
        self.input.reset();
        log::debug!("Engine reset");
    }

    pub fn install_tap(
        &self,
        bus: u32,
        buffer_size: u32,
        format: Option<AudioFormat>,
        block: TapBlock,
    ) -> Result<(), AudioError> {
        self.input.install_tap(bus, buffer_size, format, block)
    }

    pub fn remove_tap(&self, bus: u32) -> bool {
        self.input.remove_tap(bus)
    }

    /// Input node's hardware-side format on `bus`.
    pub fn input_format(&self, bus: u32) -> Option<AudioFormat> {
        self.input.input_format(bus)
    }

    /// Input node's delivered format on `bus`.
    pub fn output_format(&self, bus: u32) -> Option<AudioFormat> {
        self.input.output_format(bus)
    }

    pub fn attached_nodes(&self) -> Vec<String> {
        self.attached.lock().clone()
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn player(&self) -> &Arc<PlayerNode> {
        &self.player
    }

    pub fn input_node(&self) -> &Arc<InputNode> {
        &self.input
    }

    pub fn device_name(&self) -> String {
        self.backend.lock().device_name()
    }

    /// Run `f` against the backend, e.g. to drive an offline backend.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.backend.lock())
    }
}

impl<B: AudioBackend> Drop for AudioEngine<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
