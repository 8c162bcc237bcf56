mod observer;

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headset_core::{
    AudioError, AudioSession, CommandDispatcher, HeadsetConfig, HeadsetController, PortType, RemoteCommand,
};
use headset_cpal::{CpalAudioSession, CpalBackend};

use observer::ConsoleObserver;

/// How long the scripted take records for.
const RECORD_FOR: Duration = Duration::from_secs(3);

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("Headset demo failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config() -> Result<HeadsetConfig, AudioError> {
    match std::env::args().nth(1) {
        Some(path) => HeadsetConfig::from_json_file(Path::new(&path)),
        None => Ok(HeadsetConfig::default()),
    }
}

fn run() -> Result<(), AudioError> {
    let config = load_config()?;

    let session = CpalAudioSession::new();
    let backend = CpalBackend::with_input_route(session.input_route());
    let controller = HeadsetController::new(backend, session, config)?;
    controller.add_observer(Arc::new(ConsoleObserver));

    let center = CommandDispatcher::new();
    center.begin_receiving_remote_control_events();
    controller.register_remote_commands(&center);

    controller.configure_session()?;
    controller.activate_session()?;
    // Capture from a headset when one is plugged in; the backend picks the
    // route up when the engine starts.
    let headset = controller
        .session()
        .available_inputs()
        .into_iter()
        .find(|p| matches!(p.port_type, PortType::HeadsetMic | PortType::BluetoothHfp));
    if let Some(port) = headset {
        // Failures reach the observer; capture stays on the default input
        let _ = controller.set_preferred_input(Some(&port));
    }

    controller.setup_engine()?;
    controller.start_engine()?;
    controller.start_status_poller()?;

    for command in [RemoteCommand::Play, RemoteCommand::Pause] {
        log::info!("Remote {:?}: {:?}", command, center.dispatch(command));
    }

    controller.install_tap()?;
    controller.start_recording()?;
    thread::sleep(RECORD_FOR);
    controller.stop_recording()?;

    let playback = controller
        .recorder()
        .take()
        .map(|take| take.buffers().iter().map(|b| b.duration()).sum::<Duration>())
        .unwrap_or_default();
    if controller.play_recording().is_ok() {
        thread::sleep(playback + Duration::from_millis(250));
    }

    // Missing bundled sound is reported and the demo carries on
    if controller.play_default_sound().is_ok() {
        thread::sleep(Duration::from_secs(2));
    }

    controller.remove_tap();
    controller.stop_status_poller();
    controller.stop_engine();
    controller.deactivate_session()?;
    Ok(())
}
