use std::{
    net::TcpStream,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::sleep,
    time::{Duration, Instant},
};

use env_logger::Env;
use proctitle::set_title;
#[cfg(feature = "tuning")]
use shared_definitions::controller::PidType;
use shared_definitions::controller::{ControlAxes, ControlMode};
use shared_definitions::protocol::{
    error::ProtocolError,
    transport::{ProtocolMonitor, StreamTransport},
};

use crate::ground_station::{
    lock, AircraftView, GroundStation, SharedAircraftView, SharedUplink, Uplink,
};

mod ground_station;
mod input;

const DEFAULT_AIRCRAFT_ADDRESS: &str = "127.0.0.1:5760";
const ARM_COOKIE: u32 = 0x0A11;
const READ_TIMEOUT: Duration = Duration::from_millis(50);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CONTROL_PERIOD: Duration = Duration::from_millis(20);

#[cfg(feature = "tuning")]
const TUNING_GAINS: [(PidType, f32, f32, f32); 5] = [
    (PidType::Roll, 1.25, 0.325, 0.077),
    (PidType::Pitch, 1.08, 0.65, 0.1625),
    (PidType::RollRate, 0.9678, 1.526, 0.02405),
    (PidType::PitchRate, 0.375, 1.545, 0.0225),
    (PidType::RotateRate, 0.825, 0.5, 0.0035),
];

fn wait_for(
    view: &SharedAircraftView,
    timeout: Duration,
    done: impl Fn(&AircraftView) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done(&lock(view)) {
            return true;
        }
        sleep(READ_TIMEOUT);
    }
    false
}

#[cfg(feature = "tuning")]
fn send_tuning(uplink: &SharedUplink<StreamTransport<TcpStream>>) -> Result<(), ProtocolError> {
    let mut uplink = lock(uplink);
    for (pid_type, proportional, integral, derivative) in TUNING_GAINS {
        uplink.adjust_gain(pid_type, proportional, integral, derivative)?;
        uplink.request_pid_state(pid_type)?;
    }
    Ok(())
}

#[cfg(feature = "controller")]
fn stream_control(
    uplink: &SharedUplink<StreamTransport<TcpStream>>,
    view: &SharedAircraftView,
    source: &mut dyn input::ControlInputSource,
) -> Result<(), ProtocolError> {
    while lock(view).armed {
        let current = match source.next_input() {
            Some(current) => current,
            None => break,
        };
        if current.kill_motors {
            log::warn!("Kill switch pressed");
            break;
        }
        lock(uplink).control(current.input)?;
        sleep(CONTROL_PERIOD);
    }
    Ok(())
}

fn run() -> Result<(), ProtocolError> {
    let mut args = std::env::args().skip(1);
    let address = args
        .next()
        .unwrap_or_else(|| DEFAULT_AIRCRAFT_ADDRESS.to_string());
    let gamepad_path = args.next();

    let stream = TcpStream::connect(&address)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    stream.set_nodelay(true)?;
    let uplink = Uplink::shared(StreamTransport::new(stream.try_clone()?));
    log::info!("Connected to {}", address);

    let exit = Arc::new(AtomicBool::new(false));
    let mut station =
        GroundStation::new(StreamTransport::new(stream), uplink.clone(), exit.clone());
    let view = station.view();
    let monitor = std::thread::Builder::new()
        .name("ground-monitor".into())
        .spawn(move || station.start_monitor())?;

    if !wait_for(&view, CONNECT_TIMEOUT, |view| view.connected) {
        log::warn!("No beacon from the aircraft");
    }

    #[cfg(feature = "tuning")]
    send_tuning(&uplink)?;

    lock(&uplink).set_control_mode(ControlMode::Angle, ControlAxes::all())?;
    lock(&uplink).get_control_mode()?;
    lock(&uplink).arm(ARM_COOKIE)?;
    if wait_for(&view, CONNECT_TIMEOUT, |view| view.armed) {
        #[cfg(feature = "controller")]
        {
            let mut gamepad = input::ControlInputMapper::new();
            let mut scripted = input::ScriptedInput::hover_test();
            let source: &mut dyn input::ControlInputSource = match &gamepad_path {
                Some(path) => {
                    gamepad.start_event_handler_thread(path)?;
                    &mut gamepad
                }
                None => &mut scripted,
            };
            stream_control(&uplink, &view, source)?;
        }
    } else {
        log::warn!("The aircraft did not acknowledge the arm command");
    }
    #[cfg(not(feature = "controller"))]
    let _ = gamepad_path;

    lock(&uplink).halt()?;
    if !wait_for(&view, CONNECT_TIMEOUT, |view| view.disarm_status.is_some()) {
        log::warn!("No disarm confirmation from the aircraft");
        exit.store(true, Ordering::Relaxed);
    }
    match monitor.join() {
        Ok(result) => result,
        Err(_) => {
            log::error!("The monitor thread panicked");
            Ok(())
        }
    }
}

fn main() {
    set_title("drone-controller");
    env_logger::Builder::from_env(Env::default().filter_or("DRONE_LOG", "info")).init();
    if let Err(error) = run() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}
