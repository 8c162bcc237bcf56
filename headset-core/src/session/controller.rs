use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use crate::graph::engine::AudioEngine;
use crate::models::config::{HeadsetConfig, POLL_INTERVAL};
use crate::models::error::AudioError;
use crate::models::session_models::{PortDescription, StatusSnapshot};
use crate::models::state::{EngineState, RecorderState};
use crate::processing::converter::FormatConverter;
use crate::session::poller::{PollerHandle, SharedObservers, StatusPoller};
use crate::session::recorder::Recorder;
use crate::session::remote::{register_playback_commands, RemoteCommandRegistration};
use crate::storage::sound_bundle::SoundBundle;
use crate::traits::audio_backend::AudioBackend;
use crate::traits::audio_session::AudioSession;
use crate::traits::observer::HeadsetObserver;
use crate::traits::remote_command_center::RemoteCommandCenter;

/// Composition root: owns the engine, recorder, session and bundle.
///
/// Generic over the hardware backend and the audio session, so the same
/// flow runs against cpal devices or headless offline ones:
/// ```text
/// [AudioSession] ─ category / activation / routing
///
/// [Backend input] → [InputNode] → tap → [Recorder] → take
///                                                     ↓ convert
/// [SoundBundle] → [AudioFile] → convert → [PlayerNode] → [Backend output]
///
/// [StatusPoller] → StatusSnapshot → observers (1 Hz)
/// ```
///
/// Every failing operation is logged, reported to observers through
/// `on_error`, and returned.
pub struct HeadsetController<B: AudioBackend + 'static, S: AudioSession + 'static> {
    engine: Arc<AudioEngine<B>>,
    session: Arc<S>,
    recorder: Arc<Recorder>,
    bundle: SoundBundle,
    config: HeadsetConfig,
    converter: FormatConverter,
    observers: SharedObservers,
    remote: Mutex<Option<RemoteCommandRegistration>>,
    poller: Mutex<Option<PollerHandle>>,
}

impl<B: AudioBackend + 'static, S: AudioSession + 'static> HeadsetController<B, S> {
    pub fn new(backend: B, session: S, config: HeadsetConfig) -> Result<Self, AudioError> {
        config.validate()?;
        let converter = FormatConverter::new(config.max_converted_frames);
        Ok(Self {
            engine: Arc::new(AudioEngine::new(backend, converter)),
            session: Arc::new(session),
            recorder: Arc::new(Recorder::new()),
            bundle: SoundBundle::new(config.bundle_dir.clone()),
            config,
            converter,
            observers: Arc::new(Mutex::new(Vec::new())),
            remote: Mutex::new(None),
            poller: Mutex::new(None),
        })
    }

    pub fn add_observer(&self, observer: Arc<dyn HeadsetObserver>) {
        self.observers.lock().push(observer);
    }

    pub fn engine(&self) -> &AudioEngine<B> {
        &self.engine
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn bundle(&self) -> &SoundBundle {
        &self.bundle
    }

    pub fn config(&self) -> &HeadsetConfig {
        &self.config
    }

    // --- Session ---

    /// Apply the configured category, mode and options.
    pub fn configure_session(&self) -> Result<(), AudioError> {
        self.session
            .set_category(self.config.category, self.config.mode, self.config.category_options)
            .map_err(|e| self.report("set session category", e))?;
        log::info!("Session category: {} ({:?})", self.config.category, self.config.mode);
        Ok(())
    }

    pub fn activate_session(&self) -> Result<(), AudioError> {
        self.session
            .set_active(true)
            .map_err(|e| self.report("activate session", e))?;
        log::info!("Session active");
        Ok(())
    }

    pub fn deactivate_session(&self) -> Result<(), AudioError> {
        self.session
            .set_active(false)
            .map_err(|e| self.report("deactivate session", e))?;
        log::info!("Session inactive");
        Ok(())
    }

    pub fn set_preferred_input(&self, port: Option<&PortDescription>) -> Result<(), AudioError> {
        self.session
            .set_preferred_input(port)
            .map_err(|e| self.report("set preferred input", e))?;
        match port {
            Some(port) => log::info!("Preferred input: {}", port.port_name),
            None => log::info!("Preferred input cleared"),
        }
        Ok(())
    }

    // --- Engine ---

    pub fn setup_engine(&self) -> Result<(), AudioError> {
        self.engine.setup().map_err(|e| self.report("set up engine", e))?;
        self.notify_engine_state();
        Ok(())
    }

    pub fn start_engine(&self) -> Result<(), AudioError> {
        let before = self.engine.state();
        self.engine.start().map_err(|e| self.report("start engine", e))?;
        if before != self.engine.state() {
            self.notify_engine_state();
        }
        Ok(())
    }

    pub fn stop_engine(&self) {
        if self.engine.stop() {
            self.notify_engine_state();
        }
    }

    pub fn pause_engine(&self) {
        if self.engine.pause() {
            self.notify_engine_state();
        }
    }

    pub fn reset_engine(&self) {
        self.engine.reset();
    }

    /// Tap the configured input bus into the recorder.
    pub fn install_tap(&self) -> Result<(), AudioError> {
        self.engine
            .install_tap(
                self.config.tap_bus,
                self.config.tap_buffer_size,
                None,
                self.recorder.tap_callback(),
            )
            .map_err(|e| self.report("install tap", e))
    }

    pub fn remove_tap(&self) -> bool {
        self.engine.remove_tap(self.config.tap_bus)
    }

    // --- Recording ---

    pub fn start_recording(&self) -> Result<(), AudioError> {
        self.recorder
            .start()
            .map_err(|e| self.report("start recording", e))?;
        self.notify_recording(RecorderState::Recording, 0);
        Ok(())
    }

    /// Freeze the take. Returns its buffer count.
    pub fn stop_recording(&self) -> Result<usize, AudioError> {
        let buffers = self
            .recorder
            .stop()
            .map_err(|e| self.report("stop recording", e))?;
        self.notify_recording(RecorderState::Stopped, buffers);
        Ok(buffers)
    }

    pub fn toggle_recording(&self) -> Result<RecorderState, AudioError> {
        if self.recorder.is_recording() {
            self.stop_recording()?;
        } else {
            self.start_recording()?;
        }
        Ok(self.recorder.state())
    }

    // --- Playback ---

    /// Play a bundled sound once. The player pauses itself when the file
    /// has played out.
    pub fn play_sound(&self, name: &str) -> Result<(), AudioError> {
        let file = self
            .bundle
            .load_sound_file(name)
            .map_err(|e| self.report("load sound", e))?;
        self.require_running()?;

        let player = self.engine.player();
        let weak = Arc::downgrade(player);
        player
            .schedule_file(
                &file,
                Some(Box::new(move || {
                    if let Some(player) = weak.upgrade() {
                        player.pause();
                    }
                })),
            )
            .map_err(|e| self.report("schedule sound", e))?;
        player.play().map_err(|e| self.report("play sound", e))?;

        log::info!("Playing {} ({} frames)", file.path().display(), file.frame_length());
        Ok(())
    }

    /// Play the configured bundled sound.
    pub fn play_default_sound(&self) -> Result<(), AudioError> {
        self.play_sound(&self.config.sound_name)
    }

    /// Convert every buffer of the last take to the player's format,
    /// schedule them in order and start playback. Returns the number of
    /// buffers scheduled.
    ///
    /// The first conversion failure stops the pass; buffers already
    /// scheduled stay queued.
    pub fn play_recording(&self) -> Result<usize, AudioError> {
        if self.recorder.is_recording() {
            return Err(self.report(
                "play recording",
                AudioError::InvalidState("cannot play back while recording".into()),
            ));
        }
        let take = self.recorder.take().ok_or_else(|| {
            self.report("play recording", AudioError::InvalidState("no recording to play".into()))
        })?;
        self.require_running()?;

        let player = self.engine.player();
        let format = player.output_format(0).ok_or_else(|| {
            self.report("play recording", AudioError::InvalidState("player node is not connected".into()))
        })?;

        let mut scheduled = 0;
        for buffer in take.buffers() {
            let converted = self
                .converter
                .convert(buffer, &format)
                .map_err(|e| self.report("convert recording", e))?;
            player
                .schedule_buffer(&converted, None)
                .map_err(|e| self.report("schedule recording", e))?;
            scheduled += 1;
        }
        player.play().map_err(|e| self.report("play recording", e))?;

        log::info!("Playing back take {} ({} buffers)", take.id(), scheduled);
        Ok(scheduled)
    }

    // --- Status ---

    pub fn status(&self) -> StatusSnapshot {
        snapshot(&self.engine, &*self.session, &self.recorder)
    }

    /// Start the 1 Hz status poller. No-op if it is already running.
    pub fn start_status_poller(&self) -> Result<(), AudioError> {
        self.start_status_poller_every(POLL_INTERVAL)
    }

    pub fn start_status_poller_every(&self, interval: Duration) -> Result<(), AudioError> {
        let error = {
            let mut poller = self.poller.lock();
            if poller.is_some() {
                return Ok(());
            }

            let engine = Arc::clone(&self.engine);
            let session = Arc::clone(&self.session);
            let recorder = Arc::clone(&self.recorder);
            match StatusPoller::spawn(
                interval,
                move || snapshot(&engine, &*session, &recorder),
                Arc::clone(&self.observers),
            ) {
                Ok(handle) => {
                    *poller = Some(handle);
                    return Ok(());
                }
                Err(e) => e,
            }
        };
        // Reported after the poller lock is released: observers may query it
        Err(self.report("start status poller", error))
    }

    pub fn stop_status_poller(&self) {
        if let Some(mut handle) = self.poller.lock().take() {
            handle.cancel();
        }
    }

    /// Latest snapshot taken by the poller.
    pub fn latest_status(&self) -> Option<StatusSnapshot> {
        self.poller.lock().as_ref().and_then(PollerHandle::latest)
    }

    // --- Remote commands ---

    /// Register the play/pause handlers once; later calls return the
    /// existing registration.
    pub fn register_remote_commands(&self, center: &dyn RemoteCommandCenter) -> RemoteCommandRegistration {
        let mut remote = self.remote.lock();
        if let Some(existing) = remote.as_ref() {
            return existing.clone();
        }
        let registration = register_playback_commands(center);
        log::info!("Remote play/pause commands registered");
        *remote = Some(registration.clone());
        registration
    }

    pub fn remote_registration(&self) -> Option<RemoteCommandRegistration> {
        self.remote.lock().clone()
    }

    // --- Internal helpers ---

    fn require_running(&self) -> Result<(), AudioError> {
        if self.engine.is_running() {
            return Ok(());
        }
        Err(self.report(
            "start playback",
            AudioError::InvalidState(format!("engine is not running (state: {:?})", self.engine.state())),
        ))
    }

    fn report(&self, action: &str, error: AudioError) -> AudioError {
        log::error!("Failed to {}: {}", action, error);
        for observer in self.observers_snapshot() {
            observer.on_error(&error);
        }
        error
    }

    fn notify_engine_state(&self) {
        let state = self.engine.state();
        for observer in self.observers_snapshot() {
            observer.on_engine_state_changed(state);
        }
    }

    fn notify_recording(&self, state: RecorderState, buffers: usize) {
        for observer in self.observers_snapshot() {
            observer.on_recording_state_changed(state, buffers);
        }
    }

    fn observers_snapshot(&self) -> Vec<Arc<dyn HeadsetObserver>> {
        self.observers.lock().clone()
    }
}

impl<B: AudioBackend + 'static, S: AudioSession + 'static> Drop for HeadsetController<B, S> {
    fn drop(&mut self) {
        // Poller holds engine references; join it before the engine stops
        self.stop_status_poller();
        self.engine.stop();
    }
}

fn snapshot<B: AudioBackend>(engine: &Arc<AudioEngine<B>>, session: &dyn AudioSession, recorder: &Recorder) -> StatusSnapshot {
    let engine_state: EngineState = engine.state();
    StatusSnapshot {
        engine_state,
        engine_running: engine_state.is_running(),
        player_playing: engine.player().is_playing(),
        available_inputs: session.available_inputs(),
        category: session.category(),
        session_active: session.is_active(),
        other_audio_playing: session.is_other_audio_playing(),
        preferred_input: session.preferred_input(),
        input_node_input_format: engine.input_format(0),
        input_node_output_format: engine.output_format(0),
        attached_nodes: engine.attached_nodes(),
        recorder_state: recorder.state(),
        recorded_buffers: recorder.buffered_len(),
        captured_at: Utc::now(),
    }
}
