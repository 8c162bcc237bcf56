//! Desktop audio session over cpal device enumeration.
//!
//! Desktop hosts have no process-wide session object, so category, mode
//! and activation are held here. Input ports are the host's input devices,
//! enumerated on every call so plugged-in headsets show up. The preferred
//! input is published through an [`InputRoute`] the backend reads on start.

use cpal::traits::{DeviceTrait, HostTrait};
use parking_lot::Mutex;

use headset_core::models::error::AudioError;
use headset_core::models::session_models::{
    CategoryOptions, PortDescription, PortType, SessionCategory, SessionMode,
};
use headset_core::traits::audio_session::AudioSession;

use crate::input_route::InputRoute;

struct SessionState {
    category: SessionCategory,
    mode: SessionMode,
    options: CategoryOptions,
    active: bool,
    preferred_input: Option<PortDescription>,
}

/// `AudioSession` backed by the default cpal host.
pub struct CpalAudioSession {
    host: cpal::Host,
    state: Mutex<SessionState>,
    route: InputRoute,
}

// SAFETY: the host handle is only used to enumerate devices, which every
// cpal host supports from any thread.
unsafe impl Send for CpalAudioSession {}
unsafe impl Sync for CpalAudioSession {}

impl CpalAudioSession {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
            state: Mutex::new(SessionState {
                category: SessionCategory::default(),
                mode: SessionMode::default(),
                options: CategoryOptions::default(),
                active: false,
                preferred_input: None,
            }),
            route: InputRoute::new(),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.state.lock().mode
    }

    pub fn options(&self) -> CategoryOptions {
        self.state.lock().options
    }

    /// Route to hand to `CpalBackend::with_input_route`. It follows
    /// `set_preferred_input` for the lifetime of the session.
    pub fn input_route(&self) -> InputRoute {
        self.route.clone()
    }

    fn apply_preferred_input(&self, port: Option<PortDescription>) {
        self.route.set(port.as_ref().map(|p| p.uid.clone()));
        self.state.lock().preferred_input = port;
    }

    fn input_ports(&self) -> Vec<PortDescription> {
        let default_name = self.host.default_input_device().and_then(|d| d.name().ok());
        let devices = match self.host.input_devices() {
            Ok(devices) => devices,
            Err(e) => {
                log::warn!("Failed to enumerate input devices: {}", e);
                return Vec::new();
            }
        };
        devices
            .filter_map(|d| d.name().ok())
            .map(|name| {
                let is_default = default_name.as_deref() == Some(name.as_str());
                let port_type = classify_port(&name, is_default);
                PortDescription::new(name.clone(), name, port_type)
            })
            .collect()
    }
}

impl Default for CpalAudioSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSession for CpalAudioSession {
    fn set_category(
        &self,
        category: SessionCategory,
        mode: SessionMode,
        options: CategoryOptions,
    ) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.category = category;
        state.mode = mode;
        state.options = options;
        Ok(())
    }

    fn category(&self) -> SessionCategory {
        self.state.lock().category
    }

    /// Activation checks that the devices the category needs exist.
    fn set_active(&self, active: bool) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if active {
            if self.host.default_output_device().is_none() {
                return Err(AudioError::SessionConfiguration("no output device".into()));
            }
            if state.category.allows_input() && self.host.default_input_device().is_none() {
                return Err(AudioError::SessionConfiguration(format!(
                    "category {} needs an input device",
                    state.category
                )));
            }
        }
        state.active = active;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Not observable through cpal.
    fn is_other_audio_playing(&self) -> bool {
        false
    }

    fn available_inputs(&self) -> Vec<PortDescription> {
        if !self.category().allows_input() {
            return Vec::new();
        }
        self.input_ports()
    }

    fn preferred_input(&self) -> Option<PortDescription> {
        self.state.lock().preferred_input.clone()
    }

    fn set_preferred_input(&self, port: Option<&PortDescription>) -> Result<(), AudioError> {
        let Some(port) = port else {
            self.apply_preferred_input(None);
            return Ok(());
        };
        if !self.input_ports().iter().any(|p| p.uid == port.uid) {
            return Err(AudioError::SessionConfiguration(format!(
                "unknown input port {}",
                port.uid
            )));
        }
        self.apply_preferred_input(Some(port.clone()));
        Ok(())
    }
}

/// Guess the port type from a device's friendly name.
pub fn classify_port(name: &str, is_default: bool) -> PortType {
    let lower = name.to_lowercase();
    if lower.contains("bluetooth") || lower.contains("hands-free") || lower.contains("airpods") {
        PortType::BluetoothHfp
    } else if lower.contains("headset") || lower.contains("headphone") {
        PortType::HeadsetMic
    } else if lower.contains("usb") {
        PortType::UsbAudio
    } else if lower.contains("line in") || lower.contains("line-in") {
        PortType::LineIn
    } else if is_default || lower.contains("built-in") || lower.contains("internal") {
        PortType::BuiltInMic
    } else {
        PortType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpal_backend::CpalBackend;

    #[test]
    fn classifies_common_device_names() {
        assert_eq!(classify_port("Jabra Hands-Free AG Audio", false), PortType::BluetoothHfp);
        assert_eq!(classify_port("AirPods Pro", false), PortType::BluetoothHfp);
        assert_eq!(classify_port("Logitech USB Headset", false), PortType::HeadsetMic);
        assert_eq!(classify_port("USB Audio CODEC", false), PortType::UsbAudio);
        assert_eq!(classify_port("Line In (Realtek)", false), PortType::LineIn);
        assert_eq!(classify_port("MacBook Pro Microphone", true), PortType::BuiltInMic);
        assert_eq!(classify_port("Loopback 2", false), PortType::Unknown);
    }

    #[test]
    fn category_is_held_in_process() {
        let session = CpalAudioSession::new();
        assert_eq!(session.category(), SessionCategory::SoloAmbient);
        session
            .set_category(SessionCategory::Playback, SessionMode::SpokenAudio, CategoryOptions::default())
            .unwrap();
        assert_eq!(session.category(), SessionCategory::Playback);
        assert_eq!(session.mode(), SessionMode::SpokenAudio);
        assert!(session.available_inputs().is_empty());
    }

    #[test]
    fn clearing_preferred_input_always_succeeds() {
        let session = CpalAudioSession::new();
        session.set_preferred_input(None).unwrap();
        assert!(session.preferred_input().is_none());
    }

    #[test]
    fn preferred_input_is_published_to_the_backend() {
        let session = CpalAudioSession::new();
        let backend = CpalBackend::with_input_route(session.input_route());

        let headset = PortDescription::new("USB Headset", "USB Headset", PortType::HeadsetMic);
        session.apply_preferred_input(Some(headset.clone()));
        assert_eq!(session.preferred_input(), Some(headset));
        assert_eq!(backend.input_device_name().as_deref(), Some("USB Headset"));

        session.set_preferred_input(None).unwrap();
        assert_eq!(backend.input_device_name(), None);
    }
}
