use serde::{Deserialize, Serialize};

/// OS-level media-control event (headset button, lock screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
    Stop,
}

/// Status a remote-command handler reports back to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandStatus {
    Success,
    NoSuchContent,
    NoActionableNowPlayingItem,
    DeviceNotFound,
    CommandFailed,
}

impl CommandStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Identifier of a handler registered with a remote-command center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);
