use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use shared_definitions::protocol::messages::DroneState;

use crate::{
    drivers::{gps::GpsSensor, imu_sensors::ImuSensor},
    output::motors_state_manager::MotorOutputs,
    shared_core_values::lock_shared,
    util::{math::vectors::RotationVector3D, time::get_current_system_time_us},
};

use super::flight_controllers::FlightController;

pub enum MainControlLoopOutCommands {
    UpdateFlightState(FlightStabilizerOut),
    /// The IMU stopped delivering samples, the loop has exited.
    SensorLost,
}

#[derive(Debug)]
pub struct FlightStabilizerOut {
    pub throttle: f32,
    pub critical_angle: bool,
    pub rotation_rate: RotationVector3D,
    pub loop_exec_time_us: u32,
    pub state: DroneState,
}

/// Runs one control tick per IMU sample until `exit` is raised.
///
/// The controller lock is held only for the tick itself, the callback runs after it
/// is released.
pub fn start_flight_controllers<M, I, G>(
    flight_controller: &Mutex<FlightController<M>>,
    mut imu: I,
    mut gps: G,
    exit: &AtomicBool,
    mut controllers_out_callback: impl FnMut(MainControlLoopOutCommands),
) where
    M: MotorOutputs,
    I: ImuSensor,
    G: GpsSensor,
{
    let mut previous_time_us = get_current_system_time_us();

    while !exit.load(Ordering::Relaxed) {
        let sample = match imu.wait_for_sample() {
            Some(sample) => sample,
            None => {
                log::warn!("IMU stopped delivering samples, leaving the control loop");
                lock_shared(flight_controller).halt();
                controllers_out_callback(MainControlLoopOutCommands::SensorLost);
                return;
            }
        };
        let location = gps.location();

        let current_time_us = get_current_system_time_us();
        let mut controller = lock_shared(flight_controller);
        controller.update(&sample, &location, current_time_us / 1000);
        let out = FlightStabilizerOut {
            throttle: controller.throttle(),
            critical_angle: controller.is_critical(),
            rotation_rate: sample.rotation_rate,
            loop_exec_time_us: current_time_us.saturating_sub(previous_time_us) as u32,
            state: controller.drone_state(),
        };
        drop(controller);

        previous_time_us = current_time_us;
        controllers_out_callback(MainControlLoopOutCommands::UpdateFlightState(out));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use shared_definitions::{controller::ControlInput, protocol::encoding::to_int16};

    use super::*;
    use crate::{
        config::FlightControllerConfig,
        drivers::simulated::{SimulatedGps, SimulatedImu, SimulatedPwmChannel},
        output::motors_state_manager::MotorsStateManager,
        util::math::geodesy::GpsLocation,
    };

    #[test]
    fn loop_ticks_once_per_sample_and_halts_when_the_imu_stops() {
        let motors = MotorsStateManager::new((0..4).map(|_| SimulatedPwmChannel::new(1000)));
        let controller = Mutex::new(FlightController::new(
            FlightControllerConfig::default(),
            motors,
        ));
        let base = GpsLocation::new(40.0, -105.0, 1600.0);
        {
            let mut controller = lock_shared(&controller);
            controller.activate(&base);
            controller.command(ControlInput {
                thrust: to_int16(0.2),
                ..Default::default()
            });
        }

        let exit = AtomicBool::new(false);
        let mut ticks = 0;
        let mut sensor_lost = false;
        start_flight_controllers(
            &controller,
            SimulatedImu::new(Duration::from_millis(1)).with_sample_limit(20),
            SimulatedGps::new(base),
            &exit,
            |command| match command {
                MainControlLoopOutCommands::UpdateFlightState(out) => {
                    ticks += 1;
                    assert!(!out.critical_angle);
                    assert_eq!(out.state.is_armed, 1);
                }
                MainControlLoopOutCommands::SensorLost => sensor_lost = true,
            },
        );

        assert_eq!(ticks, 20);
        assert!(sensor_lost);
        assert!(!lock_shared(&controller).is_armed());
    }

    #[test]
    fn raised_exit_flag_skips_the_loop() {
        let motors = MotorsStateManager::new((0..4).map(|_| SimulatedPwmChannel::new(1000)));
        let controller = Mutex::new(FlightController::new(
            FlightControllerConfig::default(),
            motors,
        ));
        let exit = AtomicBool::new(true);
        let mut called = false;
        start_flight_controllers(
            &controller,
            SimulatedImu::new(Duration::ZERO),
            SimulatedGps::new(GpsLocation::invalid()),
            &exit,
            |_| called = true,
        );
        assert!(!called);
    }
}
