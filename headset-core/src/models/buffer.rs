use std::time::{Duration, Instant};

use super::error::AudioError;
use super::format::{AudioFormat, SampleFormat};
use crate::processing::channel_mixer::{f32_to_i16, i16_to_f32};

/// Owned sample storage of an [`AudioBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    F32(Vec<f32>),
    I16(Vec<i16>),
}

impl SampleData {
    fn zeroed(format: SampleFormat, len: usize) -> Self {
        match format {
            SampleFormat::Float32 => Self::F32(vec![0.0; len]),
            SampleFormat::Int16 => Self::I16(vec![0; len]),
        }
    }

    fn get(&self, index: usize) -> f32 {
        match self {
            Self::F32(v) => v[index],
            Self::I16(v) => i16_to_f32(v[index]),
        }
    }

    fn set(&mut self, index: usize, value: f32) {
        match self {
            Self::F32(v) => v[index] = value,
            Self::I16(v) => v[index] = f32_to_i16(value),
        }
    }
}

/// A block of PCM samples tagged with its format.
///
/// Capacity is fixed at creation; `frame_length` counts the filled frames.
/// Planar (deinterleaved) storage lays out channel 0's `frame_capacity`
/// frames first, then channel 1, and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    format: AudioFormat,
    frame_capacity: u32,
    frame_length: u32,
    data: SampleData,
}

impl AudioBuffer {
    /// Allocate an empty buffer. Returns `None` for a zero capacity or an
    /// invalid format.
    pub fn new(format: AudioFormat, frame_capacity: u32) -> Option<Self> {
        if frame_capacity == 0 || !format.is_valid() {
            return None;
        }
        let len = (frame_capacity as usize).checked_mul(format.channels as usize)?;
        Some(Self {
            format,
            frame_capacity,
            frame_length: 0,
            data: SampleData::zeroed(format.sample_format, len),
        })
    }

    /// Build a full buffer from interleaved f32 samples, stored in `format`'s
    /// representation. Trailing samples that do not fill a frame are dropped.
    pub fn from_interleaved_f32(format: AudioFormat, samples: &[f32]) -> Option<Self> {
        if !format.is_valid() {
            return None;
        }
        let frames = u32::try_from(samples.len() / format.channels as usize).ok()?;
        let mut buffer = Self::new(format, frames)?;
        buffer.write_interleaved_f32(samples);
        Some(buffer)
    }

    /// Build a full buffer from interleaved 16-bit samples.
    ///
    /// Stored as-is when `format` is interleaved Int16, converted otherwise.
    pub fn from_interleaved_i16(format: AudioFormat, samples: Vec<i16>) -> Option<Self> {
        if format.sample_format != SampleFormat::Int16 || !format.interleaved {
            let floats: Vec<f32> = samples.into_iter().map(i16_to_f32).collect();
            return Self::from_interleaved_f32(format, &floats);
        }
        if !format.is_valid() {
            return None;
        }
        let channels = format.channels as usize;
        let frames = u32::try_from(samples.len() / channels).ok()?;
        if frames == 0 {
            return None;
        }
        let mut samples = samples;
        samples.truncate(frames as usize * channels);
        Some(Self {
            format,
            frame_capacity: frames,
            frame_length: frames,
            data: SampleData::I16(samples),
        })
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn frame_capacity(&self) -> u32 {
        self.frame_capacity
    }

    pub fn frame_length(&self) -> u32 {
        self.frame_length
    }

    /// Set the number of valid frames. Fails if it exceeds the capacity.
    pub fn set_frame_length(&mut self, frames: u32) -> Result<(), AudioError> {
        if frames > self.frame_capacity {
            return Err(AudioError::InvalidState(format!(
                "frame length {} exceeds capacity {}",
                frames, self.frame_capacity
            )));
        }
        self.frame_length = frames;
        Ok(())
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.frame_length == 0
    }

    /// Playback duration of the filled frames.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_length as f64 / self.format.sample_rate as f64)
    }

    fn index(&self, channel: usize, frame: usize) -> usize {
        if self.format.interleaved {
            frame * self.format.channels as usize + channel
        } else {
            channel * self.frame_capacity as usize + frame
        }
    }

    /// Sample at `(channel, frame)` as normalised f32.
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        self.data.get(self.index(channel, frame))
    }

    /// Overwrite the buffer with interleaved f32 samples, starting at frame 0.
    ///
    /// Writes at most `frame_capacity` frames and sets `frame_length` to the
    /// number written, which is returned.
    pub fn write_interleaved_f32(&mut self, samples: &[f32]) -> u32 {
        let channels = self.format.channels as usize;
        let frames = (samples.len() / channels).min(self.frame_capacity as usize);
        for frame in 0..frames {
            for ch in 0..channels {
                let idx = self.index(ch, frame);
                self.data.set(idx, samples[frame * channels + ch]);
            }
        }
        self.frame_length = frames as u32;
        self.frame_length
    }

    /// Copy the filled frames out as interleaved f32.
    pub fn to_interleaved_f32(&self) -> Vec<f32> {
        let channels = self.format.channels as usize;
        let frames = self.frame_length as usize;
        let mut out = Vec::with_capacity(frames * channels);
        for frame in 0..frames {
            for ch in 0..channels {
                out.push(self.sample(ch, frame));
            }
        }
        out
    }
}

/// Capture timestamp delivered alongside every tapped block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTime {
    /// Position of the block's first frame in the input stream.
    pub sample_time: u64,
    pub sample_rate: u32,
    pub host_time: Instant,
}

impl AudioTime {
    pub fn new(sample_time: u64, sample_rate: u32) -> Self {
        Self {
            sample_time,
            sample_rate,
            host_time: Instant::now(),
        }
    }

    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_time as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(AudioBuffer::new(AudioFormat::float32(48000, 2), 0).is_none());
        assert!(AudioBuffer::new(AudioFormat::float32(0, 2), 16).is_none());
    }

    #[test]
    fn new_buffer_is_empty() {
        let buffer = AudioBuffer::new(AudioFormat::float32(48000, 2), 128).unwrap();
        assert_eq!(buffer.frame_capacity(), 128);
        assert_eq!(buffer.frame_length(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn planar_storage_round_trips_interleaved_samples() {
        let samples = [0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buffer = AudioBuffer::from_interleaved_f32(AudioFormat::float32(8000, 2), &samples).unwrap();

        assert_eq!(buffer.frame_length(), 3);
        match buffer.data() {
            SampleData::F32(v) => assert_eq!(v, &vec![0.1, 0.2, 0.3, -0.1, -0.2, -0.3]),
            other => panic!("unexpected storage {:?}", other),
        }
        assert_eq!(buffer.to_interleaved_f32(), samples.to_vec());
    }

    #[test]
    fn int16_storage_quantizes() {
        let buffer =
            AudioBuffer::from_interleaved_f32(AudioFormat::int16_interleaved(8000, 1), &[1.0, -1.0, 0.5]).unwrap();
        match buffer.data() {
            SampleData::I16(v) => {
                assert_eq!(v[0], i16::MAX);
                assert_eq!(v[1], -i16::MAX);
            }
            other => panic!("unexpected storage {:?}", other),
        }
        assert_relative_eq!(buffer.sample(0, 2), 0.5, epsilon = 1e-4);
    }

    #[test]
    fn frame_length_cannot_exceed_capacity() {
        let mut buffer = AudioBuffer::new(AudioFormat::float32(8000, 1), 4).unwrap();
        assert!(buffer.set_frame_length(4).is_ok());
        assert!(buffer.set_frame_length(5).is_err());
    }

    #[test]
    fn write_truncates_to_capacity() {
        let mut buffer = AudioBuffer::new(AudioFormat::float32(8000, 1), 2).unwrap();
        let written = buffer.write_interleaved_f32(&[0.1, 0.2, 0.3]);
        assert_eq!(written, 2);
        assert_eq!(buffer.to_interleaved_f32(), vec![0.1, 0.2]);
    }

    #[test]
    fn duration_uses_filled_frames() {
        let buffer = AudioBuffer::from_interleaved_f32(AudioFormat::float32(1000, 1), &[0.0; 500]).unwrap();
        assert_eq!(buffer.duration(), Duration::from_millis(500));
    }

    #[test]
    fn audio_time_seconds() {
        let time = AudioTime::new(24000, 48000);
        assert_relative_eq!(time.seconds(), 0.5);
    }
}
