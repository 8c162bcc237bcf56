use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::remote::{CommandStatus, RemoteCommand, TargetId};
use crate::traits::remote_command_center::{RemoteCommandCenter, RemoteCommandHandler};

#[derive(Default)]
struct Targets {
    handlers: HashMap<RemoteCommand, Vec<(TargetId, RemoteCommandHandler)>>,
    enabled: HashSet<RemoteCommand>,
}

/// In-process remote-command center.
///
/// Platform glue (a headset button listener, a media-key hook) calls
/// [`CommandDispatcher::dispatch`]; registered handlers run on that thread.
#[derive(Default)]
pub struct CommandDispatcher {
    targets: Mutex<Targets>,
    next_id: AtomicU64,
    receiving: AtomicBool,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt the process in to receiving remote-control events.
    pub fn begin_receiving_remote_control_events(&self) {
        if !self.receiving.swap(true, Ordering::SeqCst) {
            log::info!("Receiving remote control events");
        }
    }

    pub fn end_receiving_remote_control_events(&self) {
        self.receiving.store(false, Ordering::SeqCst);
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving.load(Ordering::SeqCst)
    }

    /// Deliver `command` to its handlers, most recently added last.
    ///
    /// `CommandFailed` when events are not being received, the command is
    /// disabled or nothing handles it; otherwise the first non-success
    /// status, or `Success`.
    pub fn dispatch(&self, command: RemoteCommand) -> CommandStatus {
        if !self.is_receiving() {
            log::warn!("Dropped {:?}: not receiving remote control events", command);
            return CommandStatus::CommandFailed;
        }

        let handlers: Vec<RemoteCommandHandler> = {
            let targets = self.targets.lock();
            if !targets.enabled.contains(&command) {
                return CommandStatus::CommandFailed;
            }
            match targets.handlers.get(&command) {
                Some(list) if !list.is_empty() => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                _ => return CommandStatus::CommandFailed,
            }
        };

        let mut status = CommandStatus::Success;
        for handler in handlers {
            let result = handler(command);
            if status.is_success() && !result.is_success() {
                status = result;
            }
        }
        status
    }

    pub fn target_count(&self, command: RemoteCommand) -> usize {
        self.targets
            .lock()
            .handlers
            .get(&command)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl RemoteCommandCenter for CommandDispatcher {
    fn add_target(&self, command: RemoteCommand, handler: RemoteCommandHandler) -> TargetId {
        let id = TargetId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.targets
            .lock()
            .handlers
            .entry(command)
            .or_default()
            .push((id, handler));
        id
    }

    fn remove_target(&self, command: RemoteCommand, target: TargetId) -> bool {
        let mut targets = self.targets.lock();
        let Some(list) = targets.handlers.get_mut(&command) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != target);
        list.len() != before
    }

    fn set_enabled(&self, command: RemoteCommand, enabled: bool) {
        let mut targets = self.targets.lock();
        if enabled {
            targets.enabled.insert(command);
        } else {
            targets.enabled.remove(&command);
        }
    }

    fn is_enabled(&self, command: RemoteCommand) -> bool {
        self.targets.lock().enabled.contains(&command)
    }
}

/// Handlers installed by [`register_playback_commands`]. Keep it for the
/// process lifetime; [`RemoteCommandRegistration::unregister`] removes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommandRegistration {
    pub play: TargetId,
    pub pause: TargetId,
}

impl RemoteCommandRegistration {
    pub fn unregister(&self, center: &dyn RemoteCommandCenter) {
        center.remove_target(RemoteCommand::Play, self.play);
        center.remove_target(RemoteCommand::Pause, self.pause);
    }
}

/// Install play and pause handlers that log and report success, and enable
/// both commands.
pub fn register_playback_commands(center: &dyn RemoteCommandCenter) -> RemoteCommandRegistration {
    let play = center.add_target(
        RemoteCommand::Play,
        Arc::new(|_: RemoteCommand| {
            log::info!("registered play");
            CommandStatus::Success
        }),
    );
    let pause = center.add_target(
        RemoteCommand::Pause,
        Arc::new(|_: RemoteCommand| {
            log::info!("registered pause");
            CommandStatus::Success
        }),
    );
    center.set_enabled(RemoteCommand::Play, true);
    center.set_enabled(RemoteCommand::Pause, true);
    RemoteCommandRegistration { play, pause }
}
