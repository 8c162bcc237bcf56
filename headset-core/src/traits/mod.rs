pub mod audio_backend;
pub mod audio_session;
pub mod observer;
pub mod remote_command_center;
