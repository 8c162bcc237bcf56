use serde::{Deserialize, Serialize};

/// Audio graph lifecycle.
///
/// State transitions:
/// ```text
/// unconfigured → configured → running ↔ paused
///                                ↓        ↓
///                             stopped → running
/// ```
/// `reset` keeps the current state and only clears scheduled audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Unconfigured,
    Configured,
    Running,
    Paused,
    Stopped,
}

impl EngineState {
    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::Unconfigured)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether `start` may move the engine to `Running`.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Configured | Self::Paused | Self::Stopped)
    }
}

/// Recorder lifecycle: one take at a time.
///
/// ```text
/// idle → recording → stopped → recording (new take) ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

impl RecorderState {
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    /// A stopped recorder holds a frozen take that can be played back.
    pub fn has_take(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}
