use parking_lot::Mutex;

use crate::models::error::AudioError;
use crate::models::session_models::{
    CategoryOptions, PortDescription, PortType, SessionCategory, SessionMode,
};
use crate::traits::audio_session::AudioSession;

struct SessionInner {
    category: SessionCategory,
    mode: SessionMode,
    options: CategoryOptions,
    active: bool,
    other_audio_playing: bool,
    inputs: Vec<PortDescription>,
    preferred_input: Option<PortDescription>,
    fail_activation: bool,
}

/// Audio session kept entirely in memory.
///
/// Used headless and in tests; ports are supplied by the caller.
pub struct InMemorySession {
    inner: Mutex<SessionInner>,
}

impl InMemorySession {
    pub fn new(inputs: Vec<PortDescription>) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                category: SessionCategory::default(),
                mode: SessionMode::default(),
                options: CategoryOptions::default(),
                active: false,
                other_audio_playing: false,
                inputs,
                preferred_input: None,
                fail_activation: false,
            }),
        }
    }

    /// Session with a single built-in microphone.
    pub fn with_builtin_mic() -> Self {
        Self::new(vec![PortDescription::new("builtin-mic", "Built-In Microphone", PortType::BuiltInMic)])
    }

    pub fn mode(&self) -> SessionMode {
        self.inner.lock().mode
    }

    pub fn options(&self) -> CategoryOptions {
        self.inner.lock().options
    }

    pub fn set_other_audio_playing(&self, playing: bool) {
        self.inner.lock().other_audio_playing = playing;
    }

    /// Make activation fail, as when another app holds the hardware.
    pub fn fail_activation(&self, fail: bool) {
        self.inner.lock().fail_activation = fail;
    }

    /// Replace the port list, as on a route change. Drops a preferred input
    /// that disappeared.
    pub fn set_available_inputs(&self, inputs: Vec<PortDescription>) {
        let mut inner = self.inner.lock();
        if let Some(preferred) = &inner.preferred_input {
            if !inputs.iter().any(|p| p.uid == preferred.uid) {
                inner.preferred_input = None;
            }
        }
        inner.inputs = inputs;
    }
}

impl AudioSession for InMemorySession {
    fn set_category(
        &self,
        category: SessionCategory,
        mode: SessionMode,
        options: CategoryOptions,
    ) -> Result<(), AudioError> {
        let mut inner = self.inner.lock();
        inner.category = category;
        inner.mode = mode;
        inner.options = options;
        Ok(())
    }

    fn category(&self) -> SessionCategory {
        self.inner.lock().category
    }

    fn set_active(&self, active: bool) -> Result<(), AudioError> {
        let mut inner = self.inner.lock();
        if active && inner.fail_activation {
            return Err(AudioError::SessionConfiguration("session activation refused".into()));
        }
        inner.active = active;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    fn is_other_audio_playing(&self) -> bool {
        self.inner.lock().other_audio_playing
    }

    fn available_inputs(&self) -> Vec<PortDescription> {
        let inner = self.inner.lock();
        if inner.category.allows_input() {
            inner.inputs.clone()
        } else {
            Vec::new()
        }
    }

    fn preferred_input(&self) -> Option<PortDescription> {
        self.inner.lock().preferred_input.clone()
    }

    fn set_preferred_input(&self, port: Option<&PortDescription>) -> Result<(), AudioError> {
        let mut inner = self.inner.lock();
        match port {
            None => inner.preferred_input = None,
            Some(port) => {
                if !inner.inputs.iter().any(|p| p.uid == port.uid) {
                    return Err(AudioError::SessionConfiguration(format!(
                        "unknown input port {}",
                        port.uid
                    )));
                }
                inner.preferred_input = Some(port.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_hidden_until_category_allows_them() {
        let session = InMemorySession::with_builtin_mic();
        assert_eq!(session.category(), SessionCategory::SoloAmbient);
        assert!(session.available_inputs().is_empty());

        session
            .set_category(SessionCategory::PlayAndRecord, SessionMode::Default, CategoryOptions::default())
            .unwrap();
        assert_eq!(session.available_inputs().len(), 1);
    }

    #[test]
    fn activation_uses_default_category() {
        let session = InMemorySession::with_builtin_mic();
        session.set_active(true).unwrap();
        assert!(session.is_active());
        assert_eq!(session.category(), SessionCategory::SoloAmbient);
    }

    #[test]
    fn refused_activation_reports_session_error() {
        let session = InMemorySession::with_builtin_mic();
        session.fail_activation(true);
        let err = session.set_active(true).unwrap_err();
        assert!(matches!(err, AudioError::SessionConfiguration(_)));
        assert!(!session.is_active());
    }

    #[test]
    fn unknown_preferred_input_is_rejected() {
        let session = InMemorySession::with_builtin_mic();
        let usb = PortDescription::new("usb-1", "USB Interface", PortType::UsbAudio);
        assert!(session.set_preferred_input(Some(&usb)).is_err());

        let mic = PortDescription::new("builtin-mic", "Built-In Microphone", PortType::BuiltInMic);
        session.set_preferred_input(Some(&mic)).unwrap();
        assert_eq!(session.preferred_input(), Some(mic));

        session.set_available_inputs(vec![usb]);
        assert_eq!(session.preferred_input(), None);
    }
}
