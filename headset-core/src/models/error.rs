use thiserror::Error;

/// Errors raised by the audio session, graph, conversion and playback paths.
///
/// Payloads are plain strings so the error can be cloned into observer
/// notifications and compared in tests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("sound file not found: {0}")]
    FileNotFound(String),

    #[error("unreadable sound file: {0}")]
    UnreadableFile(String),

    #[error("unable to create converted buffer: {0}")]
    UnableToCreateConvertedBuffer(String),

    #[error("unable to create converter: {0}")]
    UnableToCreateConverter(String),

    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("engine start failed: {0}")]
    EngineStartError(String),

    #[error("session configuration failed: {0}")]
    SessionConfiguration(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("a tap is already installed on bus {0}")]
    TapAlreadyInstalled(u32),

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AudioError {
    /// Whether the error came out of the format converter.
    pub fn is_conversion_error(&self) -> bool {
        matches!(
            self,
            Self::UnableToCreateConvertedBuffer(_)
                | Self::UnableToCreateConverter(_)
                | Self::ConversionFailed(_)
        )
    }
}
