use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use shared_definitions::protocol::transport::{ByteSink, ByteSource};

use crate::{
    communication_interfaces::{
        controller::RemoteControl,
        dispatcher::{CommandDispatcher, GainStore},
        link::OutboundLink,
    },
    config::{
        constants::{
            BATTERY_SAMPLE_PERIOD_MS, BEACON_COOKIE, BEACON_PERIOD_MS, SERIAL_POLL_TIMEOUT_MS,
            TELEMETRY_PERIOD_MS, THREAD_STACK_SIZE,
        },
        FlightControllerConfig,
    },
    control::{
        control_loops::{start_flight_controllers, MainControlLoopOutCommands},
        flight_controllers::FlightController,
    },
    drivers::{battery::BatteryMonitor, gps::GpsSensor, imu_sensors::ImuSensor},
    output::motors_state_manager::MotorOutputs,
    shared_core_values::{lock_shared, AtomicTelemetry, SharedFlightController},
    telemetry::start_telemetry_thread,
};

/// Sleeps for `period` in short slices, returning early once `exit` is raised.
pub fn sleep_unless_exit(period: Duration, exit: &AtomicBool) {
    let slice = Duration::from_millis(SERIAL_POLL_TIMEOUT_MS);
    let deadline = Instant::now() + period;
    while !exit.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(slice.min(deadline - now));
    }
}

/// Peripherals and link endpoints the aircraft runs on.
pub struct FlightHardware<M, I, G, B, R, W> {
    pub motors: M,
    pub imu: I,
    pub gps: G,
    pub battery: B,
    pub link_reader: R,
    pub link_writer: W,
}

/// Handles to the running aircraft threads: control, command receive, telemetry and
/// battery measurement.
pub struct FlightRuntime {
    exit: Arc<AtomicBool>,
    telemetry: Arc<AtomicTelemetry>,
    handles: Vec<JoinHandle<()>>,
}

impl FlightRuntime {
    pub fn start<M, I, G, B, R, W>(
        config: FlightControllerConfig,
        hardware: FlightHardware<M, I, G, B, R, W>,
        gain_store: Option<GainStore>,
    ) -> io::Result<Self>
    where
        M: MotorOutputs + Send + 'static,
        I: ImuSensor + Send + 'static,
        G: GpsSensor + Send + 'static,
        B: BatteryMonitor + Send + 'static,
        R: ByteSource + Send + 'static,
        W: ByteSink + Send + 'static,
    {
        let FlightHardware {
            motors,
            imu,
            gps,
            battery,
            link_reader,
            link_writer,
        } = hardware;

        let flight_controller: SharedFlightController<M> =
            Arc::new(Mutex::new(FlightController::new(config, motors)));
        let link = OutboundLink::shared(link_writer);
        let mut runtime = FlightRuntime {
            exit: Arc::new(AtomicBool::new(false)),
            telemetry: Arc::new(AtomicTelemetry::new()),
            handles: Vec::new(),
        };

        let mut dispatcher = CommandDispatcher::new(
            flight_controller.clone(),
            link_reader,
            link.clone(),
            BEACON_COOKIE,
            Duration::from_millis(BEACON_PERIOD_MS),
            runtime.exit.clone(),
        );
        if let Some(gain_store) = gain_store {
            dispatcher = dispatcher.with_gain_store(gain_store);
        }

        {
            let flight_controller = flight_controller.clone();
            let telemetry = runtime.telemetry.clone();
            let exit = runtime.exit.clone();
            runtime.spawn("flight", move || {
                flight_thread(&flight_controller, imu, gps, &telemetry, &exit)
            })?;
        }
        {
            let flight_controller = flight_controller.clone();
            let exit = runtime.exit.clone();
            runtime.spawn("commands", move || {
                if dispatcher.start_changes_monitor().is_err() {
                    lock_shared(&flight_controller).halt();
                    exit.store(true, Ordering::Relaxed);
                }
            })?;
        }
        {
            let telemetry = runtime.telemetry.clone();
            let exit = runtime.exit.clone();
            runtime.spawn("measurements", move || {
                measurements_thread(&flight_controller, battery, &telemetry, &exit)
            })?;
        }
        let telemetry_handle = start_telemetry_thread(
            runtime.telemetry.clone(),
            link,
            Duration::from_millis(TELEMETRY_PERIOD_MS),
            runtime.exit.clone(),
        )?;
        runtime.handles.push(telemetry_handle);

        Ok(runtime)
    }

    fn spawn(&mut self, name: &str, body: impl FnOnce() + Send + 'static) -> io::Result<()> {
        let handle = std::thread::Builder::new()
            .name(name.into())
            .stack_size(THREAD_STACK_SIZE)
            .spawn(body);
        match handle {
            Ok(handle) => {
                self.handles.push(handle);
                Ok(())
            }
            Err(error) => {
                self.halt();
                Err(error)
            }
        }
    }

    pub fn telemetry(&self) -> &AtomicTelemetry {
        &self.telemetry
    }

    pub fn is_running(&self) -> bool {
        !self.exit.load(Ordering::Relaxed)
    }

    /// Asks every thread to stop, the motors are cut by the control thread on its way out.
    pub fn halt(&self) {
        self.exit.store(true, Ordering::Relaxed);
    }

    /// Waits for every thread to finish.
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                log::error!("A flight computer thread panicked");
            }
        }
    }
}

fn flight_thread<M, I, G>(
    flight_controller: &SharedFlightController<M>,
    imu: I,
    gps: G,
    telemetry: &AtomicTelemetry,
    exit: &AtomicBool,
) where
    M: MotorOutputs,
    I: ImuSensor,
    G: GpsSensor,
{
    start_flight_controllers(flight_controller, imu, gps, exit, |command| match command {
        MainControlLoopOutCommands::UpdateFlightState(state) => {
            telemetry
                .loop_exec_time_us
                .store(state.loop_exec_time_us, Ordering::Relaxed);
            telemetry.rotation_rate.store(state.rotation_rate);
            telemetry.throttle.store(state.throttle, Ordering::Relaxed);
            telemetry
                .critical_angle
                .store(state.critical_angle, Ordering::Relaxed);
            telemetry.drone_state.store(&state.state);
        }
        MainControlLoopOutCommands::SensorLost => exit.store(true, Ordering::Relaxed),
    });
    lock_shared(flight_controller).halt();
}

fn measurements_thread<M, B>(
    flight_controller: &SharedFlightController<M>,
    mut battery: B,
    telemetry: &AtomicTelemetry,
    exit: &AtomicBool,
) where
    M: MotorOutputs,
    B: BatteryMonitor,
{
    while !exit.load(Ordering::Relaxed) {
        let voltage = battery.board_voltage();
        telemetry.battery_voltage.store(voltage, Ordering::Relaxed);
        lock_shared(flight_controller).record_battery_levels(voltage);
        sleep_unless_exit(Duration::from_millis(BATTERY_SAMPLE_PERIOD_MS), exit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_exit_cuts_the_sleep_short() {
        let exit = AtomicBool::new(true);
        let started = Instant::now();
        sleep_unless_exit(Duration::from_secs(5), &exit);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn sleep_lasts_the_whole_period() {
        let exit = AtomicBool::new(false);
        let started = Instant::now();
        sleep_unless_exit(Duration::from_millis(20), &exit);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
