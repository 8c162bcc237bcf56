/// Circular buffer of interleaved f32 frames.
///
/// The input node writes whatever block size the backend delivers and
/// reads back fixed-size tap blocks. Not synchronised itself; wrap it in
/// `parking_lot::Mutex` for cross-thread access.
///
/// Overflow behavior: drops the oldest whole frames.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    channels: usize,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl RingBuffer {
    /// Ring holding up to `capacity_frames` frames of `channels` samples each.
    pub fn new(capacity_frames: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        let capacity = capacity_frames.max(1) * channels;
        Self {
            buffer: vec![0.0; capacity],
            channels,
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Write interleaved samples. A trailing partial frame is ignored.
    ///
    /// Returns the number of frames dropped from the head to make room.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let whole = samples.len() - samples.len() % self.channels;
        if whole == 0 {
            return 0;
        }

        // More data than capacity: only the tail survives
        let samples = if whole > self.capacity {
            &samples[whole - self.capacity..whole]
        } else {
            &samples[..whole]
        };

        let overflow = (self.available + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
        }

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += samples.len();
        (overflow + (whole - samples.len())) / self.channels
    }

    /// Read and remove exactly `frames` frames, or nothing if fewer are buffered.
    pub fn read_frames(&mut self, frames: usize) -> Option<Vec<f32>> {
        let count = frames * self.channels;
        if count == 0 || count > self.available {
            return None;
        }

        let mut result = Vec::with_capacity(count);
        for i in 0..count {
            result.push(self.buffer[(self.read_index + i) % self.capacity]);
        }
        self.read_index = (self.read_index + count) % self.capacity;
        self.available -= count;
        Some(result)
    }

    /// Frames currently buffered.
    pub fn frames_available(&self) -> usize {
        self.available / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    /// Capacity in frames.
    pub fn capacity_frames(&self) -> usize {
        self.capacity / self.channels
    }
}
