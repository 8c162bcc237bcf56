use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::format::AudioFormat;
use super::state::{EngineState, RecorderState};

/// How the app intends to use audio; decides routing and mixing with other apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionCategory {
    Ambient,
    SoloAmbient,
    Playback,
    Record,
    PlayAndRecord,
    MultiRoute,
}

impl SessionCategory {
    /// Whether the category allows microphone input.
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::Record | Self::PlayAndRecord | Self::MultiRoute)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::SoloAmbient => "soloAmbient",
            Self::Playback => "playback",
            Self::Record => "record",
            Self::PlayAndRecord => "playAndRecord",
            Self::MultiRoute => "multiRoute",
        }
    }
}

impl Default for SessionCategory {
    fn default() -> Self {
        Self::SoloAmbient
    }
}

impl fmt::Display for SessionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specialised behaviour layered on top of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    #[default]
    Default,
    VoiceChat,
    Measurement,
    SpokenAudio,
}

/// Category options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryOptions {
    pub mix_with_others: bool,
    pub duck_others: bool,
    /// Route input and output through hands-free Bluetooth headsets.
    pub allow_bluetooth: bool,
    pub default_to_speaker: bool,
}

/// Kind of audio port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortType {
    BuiltInMic,
    HeadsetMic,
    BluetoothHfp,
    UsbAudio,
    LineIn,
    Unknown,
}

/// An input port the session can route from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDescription {
    pub uid: String,
    pub port_name: String,
    pub port_type: PortType,
}

impl PortDescription {
    pub fn new(uid: impl Into<String>, port_name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            uid: uid.into(),
            port_name: port_name.into(),
            port_type,
        }
    }
}

/// Display-only view of the engine and session, refreshed by the status poller.
///
/// Never authoritative: the backend and the session remain the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub engine_state: EngineState,
    pub engine_running: bool,
    pub player_playing: bool,
    pub available_inputs: Vec<PortDescription>,
    pub category: SessionCategory,
    pub session_active: bool,
    pub other_audio_playing: bool,
    pub preferred_input: Option<PortDescription>,
    pub input_node_input_format: Option<AudioFormat>,
    pub input_node_output_format: Option<AudioFormat>,
    pub attached_nodes: Vec<String>,
    pub recorder_state: RecorderState,
    pub recorded_buffers: usize,
    pub captured_at: DateTime<Utc>,
}
