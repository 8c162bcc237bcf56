pub mod buffer;
pub mod config;
pub mod error;
pub mod format;
pub mod recording;
pub mod remote;
pub mod session_models;
pub mod state;
