use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use shared_definitions::protocol::transport::ByteSink;

use crate::{
    communication_interfaces::{dispatcher::drone_state_message, link::SharedLink},
    config::constants::THREAD_STACK_SIZE,
    shared_core_values::{lock_shared, AtomicTelemetry},
    threads::sleep_unless_exit,
};

/// Logs the snapshot and, once a ground station answered the beacon, sends it as a
/// DroneState message every `period`.
pub fn start_telemetry_thread<W>(
    telemetry_data: Arc<AtomicTelemetry>,
    link: SharedLink<W>,
    period: Duration,
    exit: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    W: ByteSink + Send + 'static,
{
    std::thread::Builder::new()
        .name("telemetry".into())
        .stack_size(THREAD_STACK_SIZE)
        .spawn(move || {
            while !exit.load(Ordering::Relaxed) {
                log_telemetry(&telemetry_data);
                let message = drone_state_message(&telemetry_data);
                if let Err(error) = lock_shared(&link).send_if_connected(&message) {
                    log::warn!("Failed to send telemetry: {}", error);
                }
                sleep_unless_exit(period, &exit);
            }
        })
}

fn log_telemetry(telemetry_data: &AtomicTelemetry) {
    log::debug!(
        "
            Iteration Time: {:?}
            Rotation rate {:?}
            Motor {:?}
            Throttle {:?}
            Critical {:?}
            Battery {:?}",
        telemetry_data.loop_exec_time_us.load(Ordering::Relaxed),
        telemetry_data.rotation_rate.read(),
        telemetry_data.drone_state.load().motors,
        telemetry_data.throttle.load(Ordering::Relaxed),
        telemetry_data.critical_angle.load(Ordering::Relaxed),
        telemetry_data.battery_voltage.load(Ordering::Relaxed),
    );
}
