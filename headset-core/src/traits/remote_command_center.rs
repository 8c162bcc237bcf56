use std::sync::Arc;

use crate::models::remote::{CommandStatus, RemoteCommand, TargetId};

/// Handler invoked when the OS delivers a remote command.
pub type RemoteCommandHandler = Arc<dyn Fn(RemoteCommand) -> CommandStatus + Send + Sync + 'static>;

/// Dispatcher of OS-originated media-control events.
///
/// Process-wide in practice; handed to the controller explicitly.
pub trait RemoteCommandCenter: Send + Sync {
    /// Register a handler for `command`.
    fn add_target(&self, command: RemoteCommand, handler: RemoteCommandHandler) -> TargetId;

    /// Unregister a handler. Returns `false` if it was not registered.
    fn remove_target(&self, command: RemoteCommand, target: TargetId) -> bool;

    fn set_enabled(&self, command: RemoteCommand, enabled: bool);

    fn is_enabled(&self, command: RemoteCommand) -> bool;
}
