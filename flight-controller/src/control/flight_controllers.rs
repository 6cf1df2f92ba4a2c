//! Cascaded attitude controller: two stabilize PIDs feed an acceleration limited ramp
//! that drives three rate PIDs, whose outputs are mixed onto the motors.

use core::f32::consts::{FRAC_PI_2, PI};

use shared_definitions::{
    controller::{ControlAxes, ControlInput, ControlMode, PidType},
    protocol::{
        encoding::{to_int16, to_int32, to_uint16, NormalizedChannel},
        messages::{Batteries, Battery, DroneState, Location, Orientation, PIDState},
    },
};

use crate::{
    config::FlightControllerConfig,
    drivers::imu_sensors::ImuSnapshot,
    output::{motors_state_manager::MotorOutputs, vehicle_movement_mappers::MotorMixer},
    util::math::{
        geodesy::{haversine_distance_m, GpsLocation},
        vectors::euclid_distance,
    },
};

use super::pid::PID;

/// The five controllers of the cascade. Yaw has no stabilize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidAxis {
    Roll,
    Pitch,
    RollRate,
    PitchRate,
    YawRate,
}

impl PidAxis {
    pub const COUNT: usize = 5;
    pub const ALL: [PidAxis; PidAxis::COUNT] = [
        PidAxis::Roll,
        PidAxis::Pitch,
        PidAxis::RollRate,
        PidAxis::PitchRate,
        PidAxis::YawRate,
    ];

    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Both rotate selectors address the yaw rate controller.
    pub fn from_pid_type(pid_type: PidType) -> Option<PidAxis> {
        match pid_type {
            PidType::None => None,
            PidType::Roll => Some(PidAxis::Roll),
            PidType::RollRate => Some(PidAxis::RollRate),
            PidType::Pitch => Some(PidAxis::Pitch),
            PidType::PitchRate => Some(PidAxis::PitchRate),
            PidType::Rotate | PidType::RotateRate => Some(PidAxis::YawRate),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PidAxis::Roll => "Roll Stabilize",
            PidAxis::Pitch => "Pitch Stabilize",
            PidAxis::RollRate => "Roll Rate",
            PidAxis::PitchRate => "Pitch Rate",
            PidAxis::YawRate => "Rotate",
        }
    }
}

pub struct FlightController<M> {
    config: FlightControllerConfig,
    mixer: MotorMixer,
    motors: M,
    pids: [PID; PidAxis::COUNT],
    control_mode: ControlMode,
    control_axes: ControlAxes,
    armed: bool,
    throttle: f32,
    critical: bool,
    base_location: GpsLocation,
    current_location: GpsLocation,
    last_state: DroneState,
    last_pid_states: [PIDState; PidAxis::COUNT],
}

impl<M> FlightController<M>
where
    M: MotorOutputs,
{
    pub fn new(config: FlightControllerConfig, mut motors: M) -> Self {
        let pids = PidAxis::ALL.map(|axis| config.pid_settings(axis).build());
        let mixer = MotorMixer::new(config.frame, config.motor_min_power, config.motor_max_power);
        motors.unarm();
        let mut controller = FlightController {
            config,
            mixer,
            motors,
            pids,
            control_mode: ControlMode::default(),
            control_axes: ControlAxes::default(),
            armed: false,
            throttle: 0.0,
            critical: false,
            base_location: GpsLocation::invalid(),
            current_location: GpsLocation::invalid(),
            last_state: DroneState::default(),
            last_pid_states: [PIDState::default(); PidAxis::COUNT],
        };
        controller.record_pid_states();
        controller
    }

    /// Arms the motors and captures `location` as the geofence centre.
    pub fn activate(&mut self, location: &GpsLocation) {
        self.zero_command();
        self.clear_pids();
        self.motors.arm();
        self.motors.clear_motor_levels();

        self.base_location = *location;
        if location.is_valid {
            log::info!(
                "Base location: lat {} lon {} alt {}",
                location.latitude,
                location.longitude,
                location.altitude
            );
        } else {
            log::warn!("No valid base location recorded, the geofence is disabled");
        }

        self.armed = true;
        self.last_state.is_armed = 1;
        self.record_motor_levels();
        log::info!("The drone is now armed");
    }

    pub fn halt(&mut self) {
        self.motors.clear_motor_levels();
        self.motors.unarm();
        self.zero_command();
        self.armed = false;
        self.last_state.is_armed = 0;
        self.record_motor_levels();
        log::info!("The drone is disarmed");
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn command(&mut self, input: ControlInput) {
        let limit = self.config.roll_pitch_command_limit;
        let mut roll = input.roll.to_normalized() * limit;
        let mut pitch = input.pitch.to_normalized() * limit;

        let combined = euclid_distance(roll, pitch);
        if combined > limit {
            let ratio = limit / combined;
            roll *= ratio;
            pitch *= ratio;
        }
        self.pid_mut(PidAxis::Roll).set_setpoint(roll);
        self.pid_mut(PidAxis::Pitch).set_setpoint(pitch);

        let yaw = input.yaw.to_normalized() * self.config.yaw_command_limit;
        self.pid_mut(PidAxis::YawRate).set_setpoint(yaw);

        self.throttle = self.normalize_throttle(input.thrust);
    }

    /// Positive stick scales from hover towards max, negative from hover towards min.
    fn normalize_throttle(&self, thrust: i16) -> f32 {
        let stick = thrust.to_normalized();
        let hover = self.config.hover_level;
        if stick >= 0.0 {
            hover + stick * (self.config.max_throttle - hover)
        } else {
            let min = self.config.min_throttle;
            min + (1.0 + stick) * (hover - min)
        }
    }

    /// One control tick.
    pub fn update(&mut self, imu: &ImuSnapshot, location: &GpsLocation, timestamp_ms: u64) {
        self.record_location(location);
        self.record_orientation(imu);

        if !self.armed || self.throttle == 0.0 {
            self.motors.clear_motor_levels();
            self.record_motor_levels();
            return;
        }
        if self.throttle < self.config.hover_level {
            self.pid_mut(PidAxis::Roll).reset_integral();
            self.pid_mut(PidAxis::Pitch).reset_integral();
        }

        let distance = haversine_distance_m(&self.base_location, location);
        if distance > self.config.geofence_radius_m {
            log::warn!("Outside of the test area ({:.3} m), dropping throttle", distance);
            self.throttle = 0.5 * self.config.hover_level;
        }

        let limit = self.config.critical_angle_limit;
        self.critical = imu.orientation.roll.abs() > limit || imu.orientation.pitch.abs() > limit;

        let (roll_target, pitch_target) = match self.control_mode {
            ControlMode::Angle => (
                self.pid_mut(PidAxis::Roll)
                    .update(imu.orientation.roll, timestamp_ms)
                    .unwrap_or(0.0),
                self.pid_mut(PidAxis::Pitch)
                    .update(imu.orientation.pitch, timestamp_ms)
                    .unwrap_or(0.0),
            ),
            ControlMode::Rate => (
                self.pid(PidAxis::Roll).target(),
                self.pid(PidAxis::Pitch).target(),
            ),
        };

        let roll_rate_target = self.accelerate_angular_velocity(roll_target, imu.rotation_rate.roll);
        let pitch_rate_target =
            self.accelerate_angular_velocity(pitch_target, imu.rotation_rate.pitch);
        self.pid_mut(PidAxis::RollRate).set_setpoint(roll_rate_target);
        self.pid_mut(PidAxis::PitchRate).set_setpoint(pitch_rate_target);

        let roll_output = self
            .pid_mut(PidAxis::RollRate)
            .update(imu.rotation_rate.roll, timestamp_ms)
            .unwrap_or(0.0)
            .clamp(-limit, limit);
        let pitch_output = self
            .pid_mut(PidAxis::PitchRate)
            .update(imu.rotation_rate.pitch, timestamp_ms)
            .unwrap_or(0.0)
            .clamp(-limit, limit);
        let yaw_output = self
            .pid_mut(PidAxis::YawRate)
            .update(imu.rotation_rate.yaw, timestamp_ms)
            .unwrap_or(0.0);

        if !self.critical && self.throttle > 0.0 {
            let levels = self
                .mixer
                .mix(roll_output, pitch_output, yaw_output, self.throttle);
            for (index, level) in levels.as_slice().iter().enumerate() {
                self.motors.set_motor_level(index, *level);
            }
        } else {
            self.motors.clear_motor_levels();
            self.clear_pids();
        }

        self.record_pid_states();
        self.record_motor_levels();
    }

    /// Moves `velocity` towards `target` by at most one acceleration step.
    fn accelerate_angular_velocity(&self, target: f32, velocity: f32) -> f32 {
        let delta = self.config.max_angular_acceleration * self.config.acceleration_step_s;
        velocity + (target - velocity).clamp(-delta, delta)
    }

    /// Applies gains to the controller selected by `pid_type`, returns the axis that
    /// was changed.
    pub fn adjust_gain(
        &mut self,
        pid_type: PidType,
        proportional: f32,
        integral: f32,
        derivative: f32,
    ) -> Option<PidAxis> {
        let axis = PidAxis::from_pid_type(pid_type)?;
        log::info!("Adjust Gain - {}", axis.name());
        self.pid_mut(axis).set_gains(proportional, integral, derivative);
        self.record_pid_states();
        Some(axis)
    }

    pub fn adjust_gain_roll(&mut self, proportional: f32, integral: f32, derivative: f32) {
        self.adjust_gain(PidType::Roll, proportional, integral, derivative);
    }

    pub fn adjust_gain_pitch(&mut self, proportional: f32, integral: f32, derivative: f32) {
        self.adjust_gain(PidType::Pitch, proportional, integral, derivative);
    }

    pub fn adjust_gain_roll_rate(&mut self, proportional: f32, integral: f32, derivative: f32) {
        self.adjust_gain(PidType::RollRate, proportional, integral, derivative);
    }

    pub fn adjust_gain_pitch_rate(&mut self, proportional: f32, integral: f32, derivative: f32) {
        self.adjust_gain(PidType::PitchRate, proportional, integral, derivative);
    }

    pub fn adjust_gain_rotation(&mut self, proportional: f32, integral: f32, derivative: f32) {
        self.adjust_gain(PidType::Rotate, proportional, integral, derivative);
    }

    /// A disabled axis keeps running its controllers but their output is scaled to 0.
    pub fn set_control_mode(&mut self, mode: ControlMode, axes: ControlAxes) {
        self.control_mode = mode;
        self.control_axes = axes;
        let scalar = |axis: ControlAxes| if axes.contains(axis) { 1.0 } else { 0.0 };
        let roll = scalar(ControlAxes::ROLL);
        let pitch = scalar(ControlAxes::PITCH);
        let yaw = scalar(ControlAxes::YAW);
        self.pid_mut(PidAxis::Roll).set_scalar(roll);
        self.pid_mut(PidAxis::RollRate).set_scalar(roll);
        self.pid_mut(PidAxis::Pitch).set_scalar(pitch);
        self.pid_mut(PidAxis::PitchRate).set_scalar(pitch);
        self.pid_mut(PidAxis::YawRate).set_scalar(yaw);
        log::info!("Control mode {:?}, enabled axes {:?}", mode, axes);
    }

    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    pub fn control_axes(&self) -> ControlAxes {
        self.control_axes
    }

    pub fn base_location(&self) -> GpsLocation {
        self.base_location
    }

    /// Last fix seen by the control tick.
    pub fn current_location(&self) -> GpsLocation {
        self.current_location
    }

    pub fn throttle(&self) -> f32 {
        self.throttle
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn pid(&self, axis: PidAxis) -> &PID {
        &self.pids[axis.index()]
    }

    fn pid_mut(&mut self, axis: PidAxis) -> &mut PID {
        &mut self.pids[axis.index()]
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }

    /// Telemetry as of the last tick.
    pub fn drone_state(&self) -> DroneState {
        self.last_state
    }

    pub fn pid_states(&self) -> [PIDState; PidAxis::COUNT] {
        self.last_pid_states
    }

    pub fn pid_state(&self, pid_type: PidType) -> Option<PIDState> {
        PidAxis::from_pid_type(pid_type).map(|axis| self.last_pid_states[axis.index()])
    }

    /// One battery with two cells, both reporting half of the board voltage.
    pub fn record_battery_levels(&mut self, board_voltage: f32) {
        let level = (((board_voltage * 2048.0) as i32) / 2).clamp(0, u16::MAX as i32) as u16;
        let mut batteries = Batteries {
            count: 1,
            ..Default::default()
        };
        batteries.battery[0] = Battery {
            cell_count: 2,
            cell_levels: [level, level, 0, 0],
        };
        self.last_state.batteries = batteries;
    }

    fn zero_command(&mut self) {
        self.throttle = 0.0;
        for axis in [PidAxis::Roll, PidAxis::Pitch, PidAxis::YawRate] {
            self.pid_mut(axis).set_setpoint(0.0);
        }
    }

    fn clear_pids(&mut self) {
        for pid in self.pids.iter_mut() {
            pid.clear();
        }
    }

    fn record_location(&mut self, location: &GpsLocation) {
        self.current_location = *location;
        self.last_state.position = to_wire_location(location);
    }

    fn record_orientation(&mut self, imu: &ImuSnapshot) {
        self.last_state.orientation = Orientation {
            roll: to_int16(imu.orientation.roll / FRAC_PI_2),
            pitch: to_int16(imu.orientation.pitch / PI),
            yaw: to_int16(normalize_yaw_angle(imu.orientation.yaw)),
            roll_rate: to_int16(imu.rotation_rate.roll / FRAC_PI_2),
            pitch_rate: to_int16(imu.rotation_rate.pitch / PI),
            yaw_rate: to_int16(normalize_yaw_angle(imu.rotation_rate.yaw)),
        };
    }

    fn record_motor_levels(&mut self) {
        self.last_state.motors = self.motors.motor_levels().map(to_uint16);
    }

    fn record_pid_states(&mut self) {
        self.last_pid_states = PidAxis::ALL.map(|axis| self.pid(axis).pid_state());
    }
}

/// Latitude over 90°, longitude over 180° and altitude over 10 km, each as an i32
/// channel.
pub fn to_wire_location(location: &GpsLocation) -> Location {
    Location {
        is_valid: location.is_valid as u8,
        latitude: to_int32((location.latitude / 90.0) as f32),
        longitude: to_int32((location.longitude / 180.0) as f32),
        altitude: to_int32((location.altitude / 10000.0) as f32),
        height: 0,
    }
}

/// Maps `[0, 2π)` headings onto `[-1, 1]`.
fn normalize_yaw_angle(yaw: f32) -> f32 {
    let normalized = yaw / PI;
    if normalized > 1.0 {
        normalized - 2.0
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        drivers::simulated::SimulatedPwmChannel,
        output::motors_state_manager::MotorsStateManager,
        test_utils::value_close,
        util::math::{geodesy::latitude_offset_deg, vectors::RotationVector3D},
    };

    type TestController = FlightController<MotorsStateManager<SimulatedPwmChannel>>;

    const BASE: GpsLocation = GpsLocation::new(40.0, -105.0, 1600.0);

    fn controller() -> TestController {
        let motors = MotorsStateManager::new((0..4).map(|_| SimulatedPwmChannel::new(1000)));
        FlightController::new(FlightControllerConfig::default(), motors)
    }

    fn level() -> ImuSnapshot {
        ImuSnapshot::default()
    }

    fn stick(value: f32) -> i16 {
        to_int16(value)
    }

    fn armed_with_throttle(thrust: f32) -> TestController {
        let mut controller = controller();
        controller.activate(&BASE);
        controller.command(ControlInput {
            thrust: stick(thrust),
            ..Default::default()
        });
        controller
    }

    #[test]
    fn pid_types_map_to_axes() {
        assert_eq!(PidAxis::from_pid_type(PidType::None), None);
        assert_eq!(PidAxis::from_pid_type(PidType::Roll), Some(PidAxis::Roll));
        assert_eq!(PidAxis::from_pid_type(PidType::PitchRate), Some(PidAxis::PitchRate));
        assert_eq!(PidAxis::from_pid_type(PidType::Rotate), Some(PidAxis::YawRate));
        assert_eq!(PidAxis::from_pid_type(PidType::RotateRate), Some(PidAxis::YawRate));
        for (index, axis) in PidAxis::ALL.iter().enumerate() {
            assert_eq!(axis.index(), index);
        }
    }

    #[test]
    fn full_positive_stick_reaches_max_throttle() {
        let controller = armed_with_throttle(1.0);
        assert!(value_close(controller.throttle(), 0.1 + 1.0 * (0.8 - 0.1)));
    }

    #[test]
    fn negative_stick_scales_below_hover() {
        let controller = armed_with_throttle(-0.5);
        assert!(value_close(controller.throttle(), 0.05));
        let controller = armed_with_throttle(-1.0);
        assert!(value_close(controller.throttle(), 0.0));
        let controller = armed_with_throttle(0.0);
        assert!(value_close(controller.throttle(), 0.1));
    }

    #[test]
    fn combined_tilt_is_limited() {
        let mut controller = controller();
        controller.command(ControlInput {
            roll: i16::MAX,
            pitch: i16::MAX,
            ..Default::default()
        });
        let roll = controller.pid(PidAxis::Roll).target();
        let pitch = controller.pid(PidAxis::Pitch).target();
        assert!(value_close(euclid_distance(roll, pitch), PI / 6.0));
        assert!(value_close(roll, pitch));

        controller.command(ControlInput {
            roll: stick(0.5),
            ..Default::default()
        });
        assert!(value_close(controller.pid(PidAxis::Roll).target(), PI / 12.0));
    }

    #[test]
    fn yaw_commands_the_rate_controller() {
        let mut controller = controller();
        controller.command(ControlInput {
            yaw: i16::MIN,
            ..Default::default()
        });
        assert!(value_close(controller.pid(PidAxis::YawRate).target(), -PI / 3.0));
    }

    #[test]
    fn zero_throttle_keeps_motors_off() {
        let mut controller = controller();
        controller.activate(&BASE);
        controller.command(ControlInput {
            thrust: i16::MIN,
            ..Default::default()
        });
        assert_eq!(controller.throttle(), 0.0);
        for tick in 1..10 {
            controller.update(&level(), &BASE, tick * 5);
        }
        assert_eq!(controller.motors().motor_levels(), [0.0; 8]);
        assert_eq!(controller.pid(PidAxis::RollRate).delta_time(), 0.0);
    }

    #[test]
    fn level_flight_spins_every_motor() {
        let mut controller = armed_with_throttle(0.0);
        for tick in 1..20 {
            controller.update(&level(), &BASE, tick * 5);
        }
        let levels = controller.motors().motor_levels();
        for level in &levels[..4] {
            assert!(value_close(*level, 0.1));
        }
        assert_eq!(controller.drone_state().motors[0], to_uint16(levels[0]));
        assert_eq!(controller.drone_state().is_armed, 1);
    }

    #[test]
    fn disarmed_controller_never_drives_motors() {
        let mut controller = controller();
        controller.command(ControlInput {
            thrust: i16::MAX,
            ..Default::default()
        });
        controller.update(&level(), &BASE, 5);
        controller.update(&level(), &BASE, 10);
        assert_eq!(controller.motors().motor_levels(), [0.0; 8]);
        assert!(!controller.is_armed());
    }

    #[test]
    fn geofence_drops_throttle_just_outside_the_radius() {
        let mut controller = armed_with_throttle(0.5);
        let outside = GpsLocation::new(
            BASE.latitude + latitude_offset_deg(20.001),
            BASE.longitude,
            BASE.altitude,
        );
        controller.update(&level(), &outside, 5);
        assert!(value_close(controller.throttle(), 0.05));

        let mut controller = armed_with_throttle(0.5);
        let inside = GpsLocation::new(
            BASE.latitude + latitude_offset_deg(19.999),
            BASE.longitude,
            BASE.altitude,
        );
        controller.update(&level(), &inside, 5);
        assert!(value_close(controller.throttle(), 0.1 + 0.5 * 0.7));
    }

    #[test]
    fn invalid_fix_does_not_trip_the_geofence() {
        let mut controller = controller();
        controller.activate(&GpsLocation::invalid());
        controller.command(ControlInput {
            thrust: stick(0.5),
            ..Default::default()
        });
        controller.update(&level(), &GpsLocation::new(10.0, 10.0, 0.0), 5);
        assert!(value_close(controller.throttle(), 0.45));
    }

    #[test]
    fn critical_angle_cuts_the_motors() {
        let mut controller = armed_with_throttle(0.5);
        for tick in 1..10 {
            controller.update(&level(), &BASE, tick * 5);
        }
        assert!(controller.motors().motor_levels()[0] > 0.0);

        let tumbled = ImuSnapshot {
            orientation: RotationVector3D::new(1.1, 0.0, 0.0),
            ..Default::default()
        };
        controller.update(&tumbled, &BASE, 50);
        assert!(controller.is_critical());
        assert_eq!(controller.motors().motor_levels(), [0.0; 8]);
        assert_eq!(controller.pid(PidAxis::Roll).delta_time(), 0.0);

        controller.update(&level(), &BASE, 55);
        assert!(!controller.is_critical());
    }

    #[test]
    fn rearming_below_hover_does_not_kick_the_stabilize_loop() {
        let mut controller = armed_with_throttle(-0.5);
        let tilted = ImuSnapshot {
            orientation: RotationVector3D::new(0.4, -0.3, 0.0),
            ..Default::default()
        };
        for tick in 1..20 {
            controller.update(&tilted, &BASE, tick * 5);
        }

        controller.command(ControlInput {
            thrust: stick(-1.0),
            ..Default::default()
        });
        controller.update(&tilted, &BASE, 100);
        assert_eq!(controller.motors().motor_levels(), [0.0; 8]);
        controller.halt();

        controller.activate(&BASE);
        controller.command(ControlInput {
            thrust: stick(-0.5),
            ..Default::default()
        });
        let mut roll_output = controller.pid(PidAxis::Roll).last_output().abs();
        let mut pitch_output = controller.pid(PidAxis::Pitch).last_output().abs();
        for tick in 0..10 {
            controller.update(&level(), &BASE, 200 + tick * 5);
            let roll = controller.pid(PidAxis::Roll);
            let pitch = controller.pid(PidAxis::Pitch);
            assert!(roll.delta_error().abs() < 1e-6);
            assert!(pitch.delta_error().abs() < 1e-6);
            // Level and on target, the smoothed outputs can only decay
            assert!(roll.last_output().abs() <= roll_output + 1e-6);
            assert!(pitch.last_output().abs() <= pitch_output + 1e-6);
            roll_output = roll.last_output().abs();
            pitch_output = pitch.last_output().abs();
        }
        assert!(controller.motors().motor_levels()[0] > 0.0);
    }

    #[test]
    fn rate_targets_are_acceleration_limited() {
        let mut controller = armed_with_throttle(0.5);
        controller.set_control_mode(ControlMode::Rate, ControlAxes::all());
        controller.command(ControlInput {
            roll: i16::MAX,
            thrust: stick(0.5),
            ..Default::default()
        });
        let rolling_back = ImuSnapshot {
            rotation_rate: RotationVector3D::new(-0.5, 0.0, 0.0),
            ..Default::default()
        };
        controller.update(&rolling_back, &BASE, 5);
        let step = 4.0 * PI * 0.05;
        assert!(value_close(
            controller.pid(PidAxis::RollRate).target(),
            -0.5 + step
        ));
    }

    #[test]
    fn rate_mode_bypasses_the_stabilize_controllers() {
        let mut controller = armed_with_throttle(0.5);
        controller.set_control_mode(ControlMode::Rate, ControlAxes::all());
        controller.command(ControlInput {
            pitch: stick(0.1),
            thrust: stick(0.5),
            ..Default::default()
        });
        for tick in 1..5 {
            controller.update(&level(), &BASE, tick * 5);
        }
        assert_eq!(controller.pid(PidAxis::Pitch).delta_time(), 0.0);
        assert!(value_close(
            controller.pid(PidAxis::PitchRate).target(),
            0.1 * PI / 6.0
        ));
    }

    #[test]
    fn disabled_axis_is_scaled_out() {
        let mut controller = controller();
        let axes = ControlAxes::from_disable_flags(1, 0, 0);
        controller.set_control_mode(ControlMode::Angle, axes);
        assert_eq!(controller.pid(PidAxis::Roll).scalar(), 0.0);
        assert_eq!(controller.pid(PidAxis::RollRate).scalar(), 0.0);
        assert_eq!(controller.pid(PidAxis::PitchRate).scalar(), 1.0);
        assert_eq!(controller.control_axes(), axes);
        assert_eq!(controller.control_mode(), ControlMode::Angle);
    }

    #[test]
    fn gain_adjustment_targets_one_axis() {
        let mut controller = controller();
        controller.adjust_gain_pitch_rate(0.5, 1.0, 0.01);
        assert_eq!(controller.pid(PidAxis::PitchRate).gains(), (0.5, 1.0, 0.01));
        assert_eq!(controller.pid(PidAxis::RollRate).gains(), (0.9678, 1.526, 0.02405));

        controller.adjust_gain_rotation(0.7, 0.4, 0.0);
        assert_eq!(controller.pid(PidAxis::YawRate).gains(), (0.7, 0.4, 0.0));
        assert_eq!(controller.adjust_gain(PidType::None, 1.0, 1.0, 1.0), None);

        let state = controller.pid_state(PidType::RotateRate).unwrap();
        assert_eq!(state.desc.kp, 700);
    }

    #[test]
    fn activation_records_the_base_location() {
        let mut controller = controller();
        controller.activate(&BASE);
        assert_eq!(controller.base_location(), BASE);
        assert!(controller.motors().is_armed());
        controller.halt();
        assert!(!controller.is_armed());
        assert!(!controller.motors().is_armed());
        assert_eq!(controller.drone_state().is_armed, 0);
    }

    #[test]
    fn battery_levels_use_two_cells() {
        let mut controller = controller();
        controller.record_battery_levels(8.0);
        let batteries = controller.drone_state().batteries;
        assert_eq!(batteries.count, 1);
        assert_eq!(batteries.battery[0].cell_count, 2);
        assert_eq!(batteries.battery[0].cell_levels, [8192, 8192, 0, 0]);
    }

    #[test]
    fn orientation_is_normalized_per_axis() {
        let mut controller = controller();
        let imu = ImuSnapshot {
            orientation: RotationVector3D::new(FRAC_PI_2, -PI / 2.0, 1.5 * PI),
            rotation_rate: RotationVector3D::new(0.0, 0.0, 0.0),
        };
        controller.update(&imu, &BASE, 5);
        let orientation = controller.drone_state().orientation;
        assert_eq!(orientation.roll, i16::MAX);
        assert_eq!(orientation.pitch, to_int16(-0.5));
        assert_eq!(orientation.yaw, to_int16(-0.5));
        assert_eq!(controller.drone_state().position.is_valid, 1);
        assert_eq!(controller.current_location(), BASE);
        assert_eq!(
            controller.drone_state().position.latitude,
            to_int32((40.0 / 90.0) as f32)
        );
    }
}
