//! Input device selection shared by the session and the backend.
//!
//! `CpalAudioSession::set_preferred_input` writes the route and
//! `CpalBackend` reads it whenever it reports its input format or opens
//! its streams, so a new preferred input takes effect on the next engine
//! start.

use std::sync::Arc;

use parking_lot::Mutex;

/// Name of the cpal input device to capture from. `None` follows the host
/// default.
#[derive(Debug, Clone, Default)]
pub struct InputRoute(Arc<Mutex<Option<String>>>);

impl InputRoute {
    /// Route that follows the host default input.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: Option<String>) {
        let mut current = self.0.lock();
        if *current != name {
            log::info!("Input route: {}", name.as_deref().unwrap_or("default"));
            *current = name;
        }
    }

    pub fn device_name(&self) -> Option<String> {
        self.0.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_selection() {
        let route = InputRoute::new();
        let reader = route.clone();
        assert_eq!(reader.device_name(), None);

        route.set(Some("USB Headset".into()));
        assert_eq!(reader.device_name().as_deref(), Some("USB Headset"));

        reader.set(None);
        assert_eq!(route.device_name(), None);
    }
}
