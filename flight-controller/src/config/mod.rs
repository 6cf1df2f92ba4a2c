pub mod constants;
pub mod store;

use shared_definitions::controller::PIDTuneConfig;

use crate::{
    control::{flight_controllers::PidAxis, pid::PID},
    output::vehicle_movement_mappers::FrameConfiguration,
};

use self::{constants::*, store::AppStoredConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidSettings {
    pub proportional: f32,
    pub integral: f32,
    pub derivative: f32,
    pub range_min: f32,
    pub range_max: f32,
    pub windup_limit: f32,
    pub lowpass_cutoff_hz: f32,
}

impl PidSettings {
    pub fn build(&self) -> PID {
        let mut pid = PID::new(self.proportional, self.integral, self.derivative);
        pid.set_range_min(self.range_min);
        pid.set_range_max(self.range_max);
        pid.set_windup_limit(self.windup_limit);
        pid.set_lowpass_cutoff(self.lowpass_cutoff_hz);
        pid
    }

    /// Gains and range from a stored tune, the filter settings are kept.
    pub fn with_tune(self, tune: &PIDTuneConfig) -> Self {
        Self {
            proportional: tune.proportional,
            integral: tune.integral,
            derivative: tune.derivative,
            range_min: tune.range_min,
            range_max: tune.range_max,
            ..self
        }
    }
}

/// Everything the flight controller needs at construction, defaults come from
/// [`constants`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlightControllerConfig {
    pub frame: FrameConfiguration,
    pub hover_level: f32,
    pub max_throttle: f32,
    pub min_throttle: f32,
    pub roll_pitch_command_limit: f32,
    pub yaw_command_limit: f32,
    pub critical_angle_limit: f32,
    pub max_angular_acceleration: f32,
    pub acceleration_step_s: f32,
    pub geofence_radius_m: f64,
    pub motor_min_power: f32,
    pub motor_max_power: f32,
    pub roll: PidSettings,
    pub pitch: PidSettings,
    pub roll_rate: PidSettings,
    pub pitch_rate: PidSettings,
    pub yaw_rate: PidSettings,
}

impl Default for FlightControllerConfig {
    fn default() -> Self {
        Self {
            frame: VEHICLE_TYPE,
            hover_level: HOVER_LEVEL,
            max_throttle: MAX_THROTTLE,
            min_throttle: MIN_THROTTLE,
            roll_pitch_command_limit: ROLL_PITCH_COMMAND_LIMIT,
            yaw_command_limit: YAW_COMMAND_LIMIT,
            critical_angle_limit: CRITICAL_ANGLE_LIMIT,
            max_angular_acceleration: MAX_ANGULAR_ACCELERATION,
            acceleration_step_s: ACCELERATION_STEP_S,
            geofence_radius_m: GEOFENCE_RADIUS_M,
            motor_min_power: MIN_POWER,
            motor_max_power: MAX_POWER,
            roll: ROLL_PID,
            pitch: PITCH_PID,
            roll_rate: ROLL_RATE_PID,
            pitch_rate: PITCH_RATE_PID,
            yaw_rate: YAW_RATE_PID,
        }
    }
}

impl FlightControllerConfig {
    /// Overrides the compiled gains with the ones persisted by a tuning session.
    /// An uninitialized store leaves the config untouched.
    pub fn with_stored_gains(mut self, stored: &AppStoredConfig) -> Self {
        if !stored.initialized {
            return self;
        }
        for axis in PidAxis::ALL {
            let settings = self.pid_settings_mut(axis);
            *settings = settings.with_tune(stored.gains(axis));
        }
        self
    }

    pub fn pid_settings(&self, axis: PidAxis) -> &PidSettings {
        match axis {
            PidAxis::Roll => &self.roll,
            PidAxis::Pitch => &self.pitch,
            PidAxis::RollRate => &self.roll_rate,
            PidAxis::PitchRate => &self.pitch_rate,
            PidAxis::YawRate => &self.yaw_rate,
        }
    }

    fn pid_settings_mut(&mut self, axis: PidAxis) -> &mut PidSettings {
        match axis {
            PidAxis::Roll => &mut self.roll,
            PidAxis::Pitch => &mut self.pitch,
            PidAxis::RollRate => &mut self.roll_rate,
            PidAxis::PitchRate => &mut self.pitch_rate,
            PidAxis::YawRate => &mut self.yaw_rate,
        }
    }
}
