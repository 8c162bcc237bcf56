use std::fmt;

use serde::{Deserialize, Serialize};

/// Sample representation of a PCM buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Float32,
    Int16,
}

impl SampleFormat {
    pub fn bits_per_sample(&self) -> u16 {
        match self {
            Self::Float32 => 32,
            Self::Int16 => 16,
        }
    }
}

/// Format descriptor attached to every [`AudioBuffer`](super::buffer::AudioBuffer).
///
/// The engine processes audio as deinterleaved Float32 (the "standard"
/// format). Bundled files are read as interleaved Int16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    pub interleaved: bool,
}

impl AudioFormat {
    /// Deinterleaved Float32 at the given rate and channel count.
    pub fn float32(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format: SampleFormat::Float32,
            interleaved: false,
        }
    }

    /// Interleaved 16-bit integer PCM, the processing format of bundled files.
    pub fn int16_interleaved(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format: SampleFormat::Int16,
            interleaved: true,
        }
    }

    /// A format with zero rate or zero channels cannot back a buffer or a converter.
    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }

    pub fn with_sample_rate(self, sample_rate: u32) -> Self {
        Self { sample_rate, ..self }
    }

    pub fn with_channels(self, channels: u16) -> Self {
        Self { channels, ..self }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = if self.interleaved {
            "interleaved"
        } else {
            "deinterleaved"
        };
        write!(
            f,
            "{} ch, {} Hz, {:?}, {}",
            self.channels, self.sample_rate, self.sample_format, layout
        )
    }
}
