//! # headset-cpal
//!
//! Desktop backend for headset-kit.
//!
//! Provides:
//! - `CpalBackend`: `AudioBackend` over cpal input/output streams on a dedicated I/O thread
//! - `CpalAudioSession`: `AudioSession` over cpal device enumeration
//! - `InputRoute`: preferred input shared from the session to the backend
//!
//! ## Usage
//! ```ignore
//! use headset_cpal::{CpalAudioSession, CpalBackend};
//! use headset_core::{HeadsetConfig, HeadsetController};
//!
//! let session = CpalAudioSession::new();
//! let backend = CpalBackend::with_input_route(session.input_route());
//! let controller = HeadsetController::new(backend, session, HeadsetConfig::default())?;
//! ```

pub mod cpal_backend;
pub mod cpal_session;
pub mod input_route;

pub use cpal_backend::CpalBackend;
pub use cpal_session::{classify_port, CpalAudioSession};
pub use input_route::InputRoute;
