use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::models::buffer::AudioBuffer;
use crate::models::error::AudioError;
use crate::models::format::AudioFormat;
use crate::processing::channel_mixer;
use crate::processing::converter::FormatConverter;
use crate::storage::sound_bundle::AudioFile;

/// Called once a scheduled buffer's last frame has been rendered, or when
/// the buffer is dropped by `stop`/`reset`.
///
/// Runs on the render thread (or the stopping thread), outside the queue lock.
pub type CompletionHandler = Box<dyn FnOnce() + Send + 'static>;

struct ScheduledBuffer {
    /// Interleaved f32 in the node's output format.
    samples: Vec<f32>,
    position: usize,
    completion: Option<CompletionHandler>,
}

/// Plays scheduled buffers into the engine's output, in scheduling order.
///
/// Shared between the control thread (scheduling, transport) and the render
/// callback. The transport flag is atomic; the queue sits behind a
/// `parking_lot::Mutex` with short critical sections.
pub struct PlayerNode {
    output_format: Mutex<Option<AudioFormat>>,
    queue: Mutex<VecDeque<ScheduledBuffer>>,
    playing: AtomicBool,
    frames_rendered: AtomicU64,
    converter: FormatConverter,
}

impl PlayerNode {
    pub const NAME: &'static str = "AudioPlayerNode";

    pub fn new(converter: FormatConverter) -> Self {
        Self {
            output_format: Mutex::new(None),
            queue: Mutex::new(VecDeque::new()),
            playing: AtomicBool::new(false),
            frames_rendered: AtomicU64::new(0),
            converter,
        }
    }

    pub(crate) fn connect(&self, format: AudioFormat) {
        *self.output_format.lock() = Some(format);
    }

    pub fn is_connected(&self) -> bool {
        self.output_format.lock().is_some()
    }

    /// Output format of `bus`. Only bus 0 exists; `None` until connected.
    pub fn output_format(&self, bus: u32) -> Option<AudioFormat> {
        if bus != 0 {
            return None;
        }
        *self.output_format.lock()
    }

    fn connected_format(&self) -> Result<AudioFormat, AudioError> {
        self.output_format(0)
            .ok_or_else(|| AudioError::InvalidState("player node is not connected".into()))
    }

    /// Queue a buffer behind everything already scheduled.
    ///
    /// The buffer's rate and channel count must match the node's output
    /// format; convert first otherwise.
    pub fn schedule_buffer(&self, buffer: &AudioBuffer, completion: Option<CompletionHandler>) -> Result<(), AudioError> {
        let format = self.connected_format()?;
        let source = buffer.format();
        if source.sample_rate != format.sample_rate || source.channels != format.channels {
            return Err(AudioError::InvalidState(format!(
                "buffer format [{}] does not match player format [{}]",
                source, format
            )));
        }

        self.queue.lock().push_back(ScheduledBuffer {
            samples: buffer.to_interleaved_f32(),
            position: 0,
            completion,
        });
        Ok(())
    }

    /// Decode a file, convert it to the output format and queue it.
    pub fn schedule_file(&self, file: &AudioFile, completion: Option<CompletionHandler>) -> Result<(), AudioError> {
        let format = self.connected_format()?;
        let decoded = file.read_buffer()?;
        let converted = self.converter.convert(&decoded, &format)?;
        self.schedule_buffer(&converted, completion)
    }

    /// Start pulling scheduled audio. Fails when not connected.
    pub fn play(&self) -> Result<(), AudioError> {
        self.connected_format()?;
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Hold the playhead; scheduled audio is kept.
    pub fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    /// Stop and drop everything scheduled, firing pending completions.
    pub fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
        let dropped: Vec<ScheduledBuffer> = self.queue.lock().drain(..).collect();
        for handler in dropped.into_iter().filter_map(|b| b.completion) {
            handler();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Frames still waiting to be rendered.
    pub fn queued_frames(&self) -> usize {
        let channels = self.output_format(0).map(|f| f.channels as usize).unwrap_or(1).max(1);
        self.queue
            .lock()
            .iter()
            .map(|b| (b.samples.len() - b.position) / channels)
            .sum()
    }

    /// Total frames rendered since creation.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// Fill an interleaved output block. Silence when paused or starved.
    ///
    /// `channels` is the channel count of `out`; scheduled audio is remixed
    /// if the device layout differs from the node's.
    pub fn render(&self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        if !self.is_playing() {
            return;
        }
        let node_channels = match self.output_format(0) {
            Some(f) => f.channels as usize,
            None => return,
        };
        let frames = out.len() / channels.max(1);
        let mut mixed = vec![0.0f32; frames * node_channels];
        let mut filled = 0usize;
        let mut finished = Vec::new();

        {
            let mut queue = self.queue.lock();
            while filled < mixed.len() {
                let Some(front) = queue.front_mut() else {
                    break;
                };
                let n = (front.samples.len() - front.position).min(mixed.len() - filled);
                mixed[filled..filled + n].copy_from_slice(&front.samples[front.position..front.position + n]);
                front.position += n;
                filled += n;
                if front.position >= front.samples.len() {
                    if let Some(done) = queue.pop_front().and_then(|b| b.completion) {
                        finished.push(done);
                    }
                }
            }
        }

        let remixed = channel_mixer::remix_interleaved(&mixed, node_channels, channels);
        let n = remixed.len().min(out.len());
        out[..n].copy_from_slice(&remixed[..n]);
        self.frames_rendered
            .fetch_add((filled / node_channels) as u64, Ordering::Relaxed);

        for handler in finished {
            handler();
        }
    }
}
