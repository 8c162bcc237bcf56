use headset_core::{AudioError, EngineState, HeadsetObserver, RecorderState, StatusSnapshot};

/// Prints controller events to the log; status snapshots as JSON.
pub struct ConsoleObserver;

impl HeadsetObserver for ConsoleObserver {
    fn on_engine_state_changed(&self, state: EngineState) {
        log::info!("Engine: {:?}", state);
    }

    fn on_recording_state_changed(&self, state: RecorderState, buffers: usize) {
        log::info!("Recorder: {:?} ({} buffers)", state, buffers);
    }

    fn on_status(&self, snapshot: &StatusSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(json) => log::info!("Status: {}", json),
            Err(e) => log::warn!("Failed to serialize status: {}", e),
        }
    }

    fn on_error(&self, error: &AudioError) {
        log::warn!("Error reported: {}", error);
    }
}
