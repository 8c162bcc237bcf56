use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::buffer::AudioBuffer;

/// One take: the ordered buffers captured between a recorder start and stop.
///
/// Appended to only while recording; read-only once frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    buffers: Vec<AudioBuffer>,
    frozen: bool,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            buffers: Vec::new(),
            frozen: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Append a captured buffer. Returns `false` (and drops the buffer) once frozen.
    pub fn append(&mut self, buffer: AudioBuffer) -> bool {
        if self.frozen {
            return false;
        }
        self.buffers.push(buffer);
        true
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn buffers(&self) -> &[AudioBuffer] {
        &self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total filled frames across the take.
    pub fn total_frames(&self) -> u64 {
        self.buffers.iter().map(|b| b.frame_length() as u64).sum()
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}
