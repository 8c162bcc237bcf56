use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::buffer::{AudioBuffer, AudioTime};
use crate::models::config::MAX_TAP_BUFFER_SIZE;
use crate::models::error::AudioError;
use crate::models::format::AudioFormat;
use crate::processing::converter::FormatConverter;
use crate::processing::ring_buffer::RingBuffer;

/// Receives every tapped block with its capture time.
///
/// Invoked on the capture thread, outside the tap registry lock. Keep it
/// short: hand the buffer off and return.
pub type TapBlock = Arc<dyn Fn(&AudioBuffer, &AudioTime) + Send + Sync + 'static>;

/// Number of output buses on the input node.
pub const INPUT_BUS_COUNT: u32 = 1;

/// Extra FIFO room on top of the tap size, for large device blocks.
const FIFO_HEADROOM_FRAMES: usize = 16_384;

struct Tap {
    buffer_size: u32,
    format: Option<AudioFormat>,
    block: TapBlock,
    fifo: RingBuffer,
    /// Input-stream position of the next block's first frame.
    sample_time: u64,
}

/// Microphone side of the graph. Holds the hardware format and the taps.
///
/// The backend pushes interleaved input of any block size through
/// [`InputNode::process_input`]; each tap receives exactly `buffer_size`
/// frames per call.
pub struct InputNode {
    hardware_format: Mutex<Option<AudioFormat>>,
    taps: Mutex<HashMap<u32, Tap>>,
    converter: FormatConverter,
}

impl InputNode {
    pub const NAME: &'static str = "AudioInputNode";

    pub fn new(converter: FormatConverter) -> Self {
        Self {
            hardware_format: Mutex::new(None),
            taps: Mutex::new(HashMap::new()),
            converter,
        }
    }

    pub(crate) fn set_hardware_format(&self, format: Option<AudioFormat>) {
        let mut current = self.hardware_format.lock();
        if *current != format {
            log::info!(
                "Input hardware format: {}",
                format.map(|f| f.to_string()).unwrap_or_else(|| "none".into())
            );
            *current = format;
        }
    }

    /// Format arriving from the hardware on `bus`.
    pub fn input_format(&self, bus: u32) -> Option<AudioFormat> {
        if bus >= INPUT_BUS_COUNT {
            return None;
        }
        *self.hardware_format.lock()
    }

    /// Format the node delivers on `bus`: deinterleaved f32 at the hardware
    /// rate and channel count.
    pub fn output_format(&self, bus: u32) -> Option<AudioFormat> {
        self.input_format(bus)
            .map(|f| AudioFormat::float32(f.sample_rate, f.channels))
    }

    /// Install `block` on `bus`, delivering `buffer_size` frames per call.
    ///
    /// `format` asks for each block to be converted first; `None` delivers
    /// the node's output format. Conversion builds a fresh sinc resampler
    /// for every block on the capture thread, so requested formats suit
    /// analysis taps rather than latency-critical ones. The recorder taps
    /// with `None`.
    pub fn install_tap(
        &self,
        bus: u32,
        buffer_size: u32,
        format: Option<AudioFormat>,
        block: TapBlock,
    ) -> Result<(), AudioError> {
        if bus >= INPUT_BUS_COUNT {
            return Err(AudioError::InvalidState(format!("input node has no bus {}", bus)));
        }
        if buffer_size == 0 || buffer_size > MAX_TAP_BUFFER_SIZE {
            return Err(AudioError::InvalidState(format!(
                "tap buffer size {} outside 1..={}",
                buffer_size, MAX_TAP_BUFFER_SIZE
            )));
        }
        if let Some(requested) = format {
            if !requested.is_valid() {
                return Err(AudioError::InvalidState(format!("invalid tap format [{}]", requested)));
            }
        }

        let mut taps = self.taps.lock();
        if taps.contains_key(&bus) {
            return Err(AudioError::TapAlreadyInstalled(bus));
        }

        let channels = self
            .input_format(bus)
            .map(|f| f.channels as usize)
            .unwrap_or(1);
        let capacity = (buffer_size as usize * 2).max(buffer_size as usize + FIFO_HEADROOM_FRAMES);
        taps.insert(
            bus,
            Tap {
                buffer_size,
                format,
                block,
                fifo: RingBuffer::new(capacity, channels),
                sample_time: 0,
            },
        );
        log::info!("Installed tap on bus {} ({} frames)", bus, buffer_size);
        Ok(())
    }

    /// Remove the tap on `bus`. Returns whether one was installed.
    pub fn remove_tap(&self, bus: u32) -> bool {
        let removed = self.taps.lock().remove(&bus).is_some();
        if removed {
            log::info!("Removed tap on bus {}", bus);
        }
        removed
    }

    pub fn has_tap(&self, bus: u32) -> bool {
        self.taps.lock().contains_key(&bus)
    }

    /// Drop partially assembled blocks, e.g. after the engine stops.
    pub(crate) fn reset(&self) {
        for tap in self.taps.lock().values_mut() {
            tap.fifo.reset();
        }
    }

    /// Feed one block of interleaved hardware samples.
    pub fn process_input(&self, samples: &[f32]) {
        let Some(node_format) = self.output_format(0) else {
            return;
        };
        let channels = node_format.channels as usize;

        let mut ready: Vec<(u32, TapBlock, AudioBuffer, AudioTime, Option<AudioFormat>)> = Vec::new();
        {
            let mut taps = self.taps.lock();
            for (bus, tap) in taps.iter_mut() {
                if tap.fifo.channels() != channels {
                    log::warn!("Input channel count changed to {}, resetting tap on bus {}", channels, bus);
                    tap.fifo = RingBuffer::new(tap.fifo.capacity_frames(), channels);
                }
                let dropped = tap.fifo.write(samples);
                if dropped > 0 {
                    log::warn!("Tap on bus {} overran, dropped {} frames", bus, dropped);
                }

                while let Some(block) = tap.fifo.read_frames(tap.buffer_size as usize) {
                    let time = AudioTime::new(tap.sample_time, node_format.sample_rate);
                    tap.sample_time += tap.buffer_size as u64;

                    let Some(buffer) = AudioBuffer::from_interleaved_f32(node_format, &block) else {
                        continue;
                    };
                    let requested = tap.format.filter(|f| *f != node_format);
                    ready.push((*bus, Arc::clone(&tap.block), buffer, time, requested));
                }
            }
        }

        // Convert outside the registry lock
        for (bus, block, buffer, time, requested) in ready {
            let buffer = match requested {
                Some(requested) => match self.converter.convert(&buffer, &requested) {
                    Ok(converted) => converted,
                    Err(e) => {
                        log::error!("Tap conversion on bus {} failed: {}", bus, e);
                        continue;
                    }
                },
                None => buffer,
            };
            block(&buffer, &time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn node(rate: u32, channels: u16) -> InputNode {
        let node = InputNode::new(FormatConverter::default());
        node.set_hardware_format(Some(AudioFormat::float32(rate, channels)));
        node
    }

    fn collecting() -> (TapBlock, Arc<Mutex<Vec<(AudioBuffer, AudioTime)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let block: TapBlock = Arc::new(move |buffer: &AudioBuffer, time: &AudioTime| {
            sink.lock().push((buffer.clone(), *time));
        });
        (block, seen)
    }

    #[test]
    fn second_tap_on_same_bus_is_rejected() {
        let node = node(48000, 1);
        let (block, _) = collecting();
        node.install_tap(0, 256, None, Arc::clone(&block)).unwrap();

        let err = node.install_tap(0, 256, None, block).unwrap_err();
        assert_eq!(err, AudioError::TapAlreadyInstalled(0));
    }

    #[test]
    fn unknown_bus_and_bad_sizes_are_rejected() {
        let node = node(48000, 1);
        let (block, _) = collecting();
        assert!(node.install_tap(1, 256, None, Arc::clone(&block)).is_err());
        assert!(node.install_tap(0, 0, None, Arc::clone(&block)).is_err());
        assert!(node.install_tap(0, MAX_TAP_BUFFER_SIZE + 1, None, block).is_err());
    }

    #[test]
    fn remove_without_tap_is_noop() {
        let node = node(48000, 1);
        assert!(!node.remove_tap(0));
        assert!(!node.has_tap(0));
    }

    #[test]
    fn reassembles_device_blocks_into_tap_blocks() {
        let node = node(48000, 1);
        let (block, seen) = collecting();
        node.install_tap(0, 4, None, block).unwrap();

        node.process_input(&[0.1, 0.2, 0.3]);
        assert!(seen.lock().is_empty());
        node.process_input(&[0.4, 0.5, 0.6, 0.7, 0.8, 0.9]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0.to_interleaved_f32(), vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(seen[1].0.to_interleaved_f32(), vec![0.5, 0.6, 0.7, 0.8]);
        assert_eq!(seen[0].1.sample_time, 0);
        assert_eq!(seen[1].1.sample_time, 4);
        assert!(!seen[0].0.format().interleaved);
    }

    #[test]
    fn requested_format_is_applied_per_block() {
        let node = node(48000, 2);
        let (block, seen) = collecting();
        node.install_tap(0, 480, Some(AudioFormat::float32(16000, 1)), block)
            .unwrap();

        node.process_input(&vec![0.25; 480 * 2]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.format().sample_rate, 16000);
        assert_eq!(seen[0].0.format().channels, 1);
        assert_eq!(seen[0].0.frame_length(), 160);

        let samples = seen[0].0.to_interleaved_f32();
        assert!((samples[80] - 0.25).abs() < 0.02, "middle {}", samples[80]);
        let tail = &samples[140..156];
        let tail_mean = tail.iter().sum::<f32>() / tail.len() as f32;
        assert!((tail_mean - 0.25).abs() < 0.03, "tail mean {}", tail_mean);
    }

    #[test]
    fn converting_tap_may_replace_itself_from_the_callback() {
        let node = Arc::new(node(48000, 1));
        let calls = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&node);
        let counter = Arc::clone(&calls);
        node.install_tap(
            0,
            480,
            Some(AudioFormat::float32(16000, 1)),
            Arc::new(move |buffer: &AudioBuffer, _: &AudioTime| {
                assert_eq!(buffer.format().sample_rate, 16000);
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(node) = weak.upgrade() {
                    assert!(node.remove_tap(0));
                    let (plain, _) = collecting();
                    node.install_tap(0, 480, None, plain).unwrap();
                }
            }),
        )
        .unwrap();

        node.process_input(&[0.1; 960]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(node.has_tap(0));
    }

    #[test]
    fn callback_may_remove_its_own_tap() {
        let node = Arc::new(node(48000, 1));
        let calls = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&node);
        let counter = Arc::clone(&calls);
        node.install_tap(
            0,
            2,
            None,
            Arc::new(move |_: &AudioBuffer, _: &AudioTime| {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(node) = weak.upgrade() {
                    node.remove_tap(0);
                }
            }),
        )
        .unwrap();

        node.process_input(&[0.0; 2]);
        node.process_input(&[0.0; 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!node.has_tap(0));
    }
}
