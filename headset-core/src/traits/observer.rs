use crate::models::error::AudioError;
use crate::models::session_models::StatusSnapshot;
use crate::models::state::{EngineState, RecorderState};

/// Event observer for controller notifications.
///
/// Methods are called from whichever thread caused the event (control
/// thread or status poller), never from the audio threads. Implementations
/// should marshal to their UI thread if needed. All methods default to no-ops.
pub trait HeadsetObserver: Send + Sync {
    /// Called after the engine changes state.
    fn on_engine_state_changed(&self, _state: EngineState) {}

    /// Called after the recorder starts or stops a take.
    fn on_recording_state_changed(&self, _state: RecorderState, _buffers: usize) {}

    /// Called by the status poller once per period.
    fn on_status(&self, _snapshot: &StatusSnapshot) {}

    /// Called when an operation fails.
    fn on_error(&self, _error: &AudioError) {}
}
