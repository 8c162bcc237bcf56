//! # headset-core
//!
//! Platform-agnostic headset audio toolkit.
//!
//! Provides an audio graph (input tap → player → output), a microphone
//! recorder, format conversion, bundled-sound playback, a status poller and
//! remote play/pause commands. Hardware backends implement `AudioBackend`
//! and platform sessions implement `AudioSession`; both plug into the
//! generic `HeadsetController`.
//!
//! ## Architecture
//!
//! ```text
//! headset-core (this crate)
//! ├── traits/       ← AudioBackend, AudioSession, HeadsetObserver, RemoteCommandCenter
//! ├── models/       ← AudioError, AudioFormat, AudioBuffer, EngineState, HeadsetConfig, etc.
//! ├── processing/   ← FormatConverter, channel mixing, RingBuffer
//! ├── graph/        ← AudioEngine, InputNode (taps), PlayerNode
//! ├── session/      ← HeadsetController, Recorder, StatusPoller, CommandDispatcher
//! ├── storage/      ← SoundBundle, AudioFile
//! └── backend/      ← OfflineBackend, InMemorySession
//! ```

pub mod backend;
pub mod graph;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use backend::in_memory_session::InMemorySession;
pub use backend::offline::OfflineBackend;
pub use graph::engine::AudioEngine;
pub use graph::input_node::{InputNode, TapBlock};
pub use graph::player_node::{CompletionHandler, PlayerNode};
pub use models::buffer::{AudioBuffer, AudioTime, SampleData};
pub use models::config::{HeadsetConfig, POLL_INTERVAL};
pub use models::error::AudioError;
pub use models::format::{AudioFormat, SampleFormat};
pub use models::recording::RecordingSession;
pub use models::remote::{CommandStatus, RemoteCommand, TargetId};
pub use models::session_models::{
    CategoryOptions, PortDescription, PortType, SessionCategory, SessionMode, StatusSnapshot,
};
pub use models::state::{EngineState, RecorderState};
pub use processing::converter::{convert_buffer_to_format, converted_frame_capacity, FormatConverter};
pub use processing::ring_buffer::RingBuffer;
pub use session::controller::HeadsetController;
pub use session::poller::{PollerHandle, StatusPoller};
pub use session::recorder::Recorder;
pub use session::remote::{register_playback_commands, CommandDispatcher, RemoteCommandRegistration};
pub use storage::sound_bundle::{AudioFile, SoundBundle};
pub use traits::audio_backend::{AudioBackend, InputCallback, RenderCallback};
pub use traits::audio_session::AudioSession;
pub use traits::observer::HeadsetObserver;
pub use traits::remote_command_center::{RemoteCommandCenter, RemoteCommandHandler};
