use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::AudioError;
use crate::models::session_models::StatusSnapshot;
use crate::traits::observer::HeadsetObserver;

/// Observer list shared between the controller and its poller.
pub type SharedObservers = Arc<Mutex<Vec<Arc<dyn HeadsetObserver>>>>;

/// Periodic status refresh on a background thread.
pub struct StatusPoller;

impl StatusPoller {
    /// Call `source` every `interval`, keep the result as the latest
    /// snapshot and hand it to every observer. The first refresh happens
    /// one interval after spawning.
    pub fn spawn<F>(interval: Duration, source: F, observers: SharedObservers) -> Result<PollerHandle, AudioError>
    where
        F: Fn() -> StatusSnapshot + Send + 'static,
    {
        if interval.is_zero() {
            return Err(AudioError::InvalidState("status poll interval must be non-zero".into()));
        }
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let latest: Arc<Mutex<Option<StatusSnapshot>>> = Arc::new(Mutex::new(None));
        let ticks = Arc::new(AtomicU64::new(0));

        let thread_latest = Arc::clone(&latest);
        let thread_ticks = Arc::clone(&ticks);
        let handle = thread::Builder::new()
            .name("status-poller".into())
            .spawn(move || loop {
                match cancel_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let snapshot = source();
                        let current: Vec<Arc<dyn HeadsetObserver>> = observers.lock().clone();
                        for observer in &current {
                            observer.on_status(&snapshot);
                        }
                        *thread_latest.lock() = Some(snapshot);
                        thread_ticks.fetch_add(1, Ordering::Relaxed);
                    }
                    // Cancelled, or the handle was dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| AudioError::InvalidState(format!("failed to spawn status poller: {}", e)))?;

        log::debug!("Status poller started ({:?} period)", interval);
        Ok(PollerHandle {
            cancel: Some(cancel_tx),
            handle: Some(handle),
            latest,
            ticks,
        })
    }
}

/// Owner of a running poller. Dropping it cancels the poller.
#[derive(Debug)]
pub struct PollerHandle {
    cancel: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
    latest: Arc<Mutex<Option<StatusSnapshot>>>,
    ticks: Arc<AtomicU64>,
}

impl PollerHandle {
    /// Most recent snapshot, if the poller has fired yet.
    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.latest.lock().clone()
    }

    /// Refreshes performed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the poller and wait for its thread. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Status poller thread panicked");
            }
            log::debug!("Status poller stopped");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session_models::SessionCategory;
    use crate::models::state::{EngineState, RecorderState};
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            engine_state: EngineState::Running,
            engine_running: true,
            player_playing: false,
            available_inputs: Vec::new(),
            category: SessionCategory::PlayAndRecord,
            session_active: true,
            other_audio_playing: false,
            preferred_input: None,
            input_node_input_format: None,
            input_node_output_format: None,
            attached_nodes: Vec::new(),
            recorder_state: RecorderState::Idle,
            recorded_buffers: 0,
            captured_at: Utc::now(),
        }
    }

    struct Counting(AtomicUsize);

    impl HeadsetObserver for Counting {
        fn on_status(&self, _snapshot: &StatusSnapshot) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn refreshes_and_notifies_observers() {
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let observers: SharedObservers = Arc::new(Mutex::new(vec![counting.clone() as Arc<dyn HeadsetObserver>]));

        let mut handle = StatusPoller::spawn(Duration::from_millis(10), snapshot, observers).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.ticks() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.cancel();

        assert!(handle.ticks() >= 3);
        assert!(counting.0.load(Ordering::SeqCst) >= 3);
        assert!(handle.latest().is_some());
        assert!(!handle.is_running());
    }

    #[test]
    fn cancel_is_prompt_with_long_period() {
        let observers: SharedObservers = Arc::new(Mutex::new(Vec::new()));
        let mut handle = StatusPoller::spawn(Duration::from_secs(3600), snapshot, observers).unwrap();

        let started = Instant::now();
        handle.cancel();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(handle.ticks(), 0);
        assert!(handle.latest().is_none());
    }

    #[test]
    fn dropping_handle_stops_polling() {
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let observers: SharedObservers = Arc::new(Mutex::new(vec![counting.clone() as Arc<dyn HeadsetObserver>]));
        let handle = StatusPoller::spawn(Duration::from_millis(5), snapshot, observers).unwrap();
        thread::sleep(Duration::from_millis(30));
        drop(handle);

        let after_drop = counting.0.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counting.0.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let observers: SharedObservers = Arc::new(Mutex::new(Vec::new()));
        let err = StatusPoller::spawn(Duration::ZERO, snapshot, observers).unwrap_err();
        assert!(matches!(err, AudioError::InvalidState(_)));
    }
}
