use crate::models::error::AudioError;
use crate::models::session_models::{CategoryOptions, PortDescription, SessionCategory, SessionMode};

/// Process audio session: category, activation and input routing.
///
/// Injected into the controller instead of being reached through a global.
/// Every method may be called from any thread.
pub trait AudioSession: Send + Sync {
    /// Set the category, mode and options. Takes effect on next activation.
    fn set_category(
        &self,
        category: SessionCategory,
        mode: SessionMode,
        options: CategoryOptions,
    ) -> Result<(), AudioError>;

    /// Current category.
    fn category(&self) -> SessionCategory;

    /// Activate or deactivate the session.
    fn set_active(&self, active: bool) -> Result<(), AudioError>;

    fn is_active(&self) -> bool;

    /// Whether another process is currently playing audio.
    fn is_other_audio_playing(&self) -> bool;

    /// Input ports the session can route from.
    fn available_inputs(&self) -> Vec<PortDescription>;

    fn preferred_input(&self) -> Option<PortDescription>;

    /// Prefer `port` for input, or clear the preference with `None`.
    /// Fails with `SessionConfiguration` for an unknown port.
    fn set_preferred_input(&self, port: Option<&PortDescription>) -> Result<(), AudioError>;
}
