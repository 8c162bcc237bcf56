use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::graph::input_node::TapBlock;
use crate::models::buffer::{AudioBuffer, AudioTime};
use crate::models::error::AudioError;
use crate::models::recording::RecordingSession;
use crate::models::state::RecorderState;
use crate::processing::channel_mixer;

/// No take is active.
const NO_TAKE: u64 = 0;

struct RecorderInner {
    state: RecorderState,
    take: RecordingSession,
    take_id: u64,
    receiver: mpsc::Receiver<(u64, AudioBuffer)>,
}

impl RecorderInner {
    /// Move queued buffers of the current take into it; drop the rest.
    fn drain(&mut self) -> usize {
        let mut stale = 0;
        while let Ok((id, buffer)) = self.receiver.try_recv() {
            if id != self.take_id || !self.take.append(buffer) {
                stale += 1;
            }
        }
        stale
    }
}

/// Microphone recorder fed by an input tap.
///
/// The capture thread only reads the active take id (atomic) and sends
/// `(take_id, buffer)` down an mpsc channel. The control thread drains the
/// channel into the take on `stop` and on `buffered_len`. Once `stop` has
/// cleared the take id, nothing more lands in that take.
pub struct Recorder {
    active_take: Arc<AtomicU64>,
    next_take: AtomicU64,
    sender: mpsc::Sender<(u64, AudioBuffer)>,
    inner: Mutex<RecorderInner>,
}

impl Recorder {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            active_take: Arc::new(AtomicU64::new(NO_TAKE)),
            next_take: AtomicU64::new(NO_TAKE),
            sender,
            inner: Mutex::new(RecorderInner {
                state: RecorderState::Idle,
                take: RecordingSession::new(),
                take_id: NO_TAKE,
                receiver,
            }),
        }
    }

    /// Tap callback appending each captured block to the active take.
    pub fn tap_callback(&self) -> TapBlock {
        let active = Arc::clone(&self.active_take);
        let sender = self.sender.clone();
        Arc::new(move |buffer: &AudioBuffer, _time: &AudioTime| {
            let take = active.load(Ordering::Acquire);
            if take == NO_TAKE {
                return;
            }
            // Receiver lives as long as the recorder
            let _ = sender.send((take, buffer.clone()));
        })
    }

    /// Open a fresh take, discarding the previous one.
    pub fn start(&self) -> Result<(), AudioError> {
        let mut inner = self.inner.lock();
        if inner.state.is_recording() {
            return Err(AudioError::InvalidState("already recording".into()));
        }

        inner.take_id = NO_TAKE;
        let stale = inner.drain();
        if stale > 0 {
            log::debug!("Discarded {} stale capture buffers", stale);
        }

        inner.take = RecordingSession::new();
        inner.take_id = self.next_take.fetch_add(1, Ordering::Relaxed) + 1;
        inner.state = RecorderState::Recording;
        self.active_take.store(inner.take_id, Ordering::Release);

        log::info!("Recording started (take {})", inner.take.id());
        Ok(())
    }

    /// Close the take and freeze it. Returns the number of buffers captured.
    pub fn stop(&self) -> Result<usize, AudioError> {
        let mut inner = self.inner.lock();
        if !inner.state.is_recording() {
            return Err(AudioError::InvalidState("not recording".into()));
        }

        self.active_take.store(NO_TAKE, Ordering::Release);
        inner.drain();
        inner.take.freeze();
        inner.state = RecorderState::Stopped;

        let peak = inner
            .take
            .buffers()
            .iter()
            .map(|b| channel_mixer::peak_level(&b.to_interleaved_f32()))
            .fold(0.0f32, f32::max);
        log::info!(
            "Recording stopped: {} buffers, {} frames, peak {:.3}",
            inner.take.len(),
            inner.take.total_frames(),
            peak
        );
        Ok(inner.take.len())
    }

    /// Start when idle or stopped, stop when recording. Returns the new state.
    pub fn toggle(&self) -> Result<RecorderState, AudioError> {
        if self.is_recording() {
            self.stop()?;
        } else {
            self.start()?;
        }
        Ok(self.state())
    }

    pub fn is_recording(&self) -> bool {
        self.active_take.load(Ordering::Acquire) != NO_TAKE
    }

    pub fn state(&self) -> RecorderState {
        self.inner.lock().state
    }

    /// Buffers captured in the current (or last) take so far.
    pub fn buffered_len(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.drain();
        inner.take.len()
    }

    /// The last frozen take, if any.
    pub fn take(&self) -> Option<RecordingSession> {
        let inner = self.inner.lock();
        inner.take.is_frozen().then(|| inner.take.clone())
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::AudioFormat;
    use std::thread;

    fn block(value: f32) -> AudioBuffer {
        AudioBuffer::from_interleaved_f32(AudioFormat::float32(16000, 1), &[value; 8]).unwrap()
    }

    fn deliver(tap: &TapBlock, value: f32) {
        tap(&block(value), &AudioTime::new(0, 16000));
    }

    #[test]
    fn records_buffers_in_order() {
        let recorder = Recorder::new();
        let tap = recorder.tap_callback();
        recorder.start().unwrap();
        for i in 0..5 {
            deliver(&tap, i as f32 / 10.0);
        }
        assert_eq!(recorder.stop().unwrap(), 5);

        let take = recorder.take().unwrap();
        assert!(take.is_frozen());
        let firsts: Vec<f32> = take.buffers().iter().map(|b| b.sample(0, 0)).collect();
        assert_eq!(firsts, vec![0.0, 0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn buffers_outside_a_take_are_ignored() {
        let recorder = Recorder::new();
        let tap = recorder.tap_callback();
        deliver(&tap, 0.9);
        recorder.start().unwrap();
        deliver(&tap, 0.1);
        recorder.stop().unwrap();
        deliver(&tap, 0.9);

        assert_eq!(recorder.buffered_len(), 1);
        assert_eq!(recorder.take().unwrap().len(), 1);
    }

    #[test]
    fn start_clears_previous_take() {
        let recorder = Recorder::new();
        let tap = recorder.tap_callback();
        recorder.start().unwrap();
        deliver(&tap, 0.1);
        deliver(&tap, 0.2);
        recorder.stop().unwrap();
        let first = recorder.take().unwrap();

        recorder.start().unwrap();
        assert_eq!(recorder.buffered_len(), 0);
        assert!(recorder.take().is_none());
        deliver(&tap, 0.3);
        recorder.stop().unwrap();

        let second = recorder.take().unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn guarded_transitions() {
        let recorder = Recorder::new();
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert!(recorder.stop().is_err());
        recorder.start().unwrap();
        assert!(recorder.start().is_err());
        assert_eq!(recorder.toggle().unwrap(), RecorderState::Stopped);
        assert_eq!(recorder.toggle().unwrap(), RecorderState::Recording);
        assert!(recorder.is_recording());
    }

    #[test]
    fn stop_races_with_capture_thread() {
        for _ in 0..20 {
            let recorder = Arc::new(Recorder::new());
            let tap = recorder.tap_callback();
            recorder.start().unwrap();

            let producer = thread::spawn(move || {
                for i in 0..2000 {
                    deliver(&tap, (i % 100) as f32 / 100.0);
                }
            });
            thread::yield_now();
            let count = recorder.stop().unwrap();
            producer.join().unwrap();

            // Late buffers never reach the frozen take
            assert_eq!(recorder.buffered_len(), count);
            assert_eq!(recorder.take().unwrap().len(), count);
        }
    }
}
