use core::f32::consts::PI;

use crate::output::vehicle_movement_mappers::FrameConfiguration;

use super::PidSettings;

const DEG_TO_RAD: f32 = PI / 180.0;

// Throttle, normalized to the motor duty range
pub const HOVER_LEVEL: f32 = 0.1_f32;
pub const MAX_THROTTLE: f32 = 0.8_f32;
pub const MIN_THROTTLE: f32 = 0.0_f32;

//Drone limits
pub const ROLL_PITCH_COMMAND_LIMIT: f32 = PI / 6.0; // 30°
pub const YAW_COMMAND_LIMIT: f32 = PI / 3.0; // 60°/s
pub const CRITICAL_ANGLE_LIMIT: f32 = PI / 3.0; // 60°
pub const MAX_ANGULAR_ACCELERATION: f32 = 720.0 * DEG_TO_RAD; // rad/s²
pub const ACCELERATION_STEP_S: f32 = 0.005 * 10.0;
pub const GEOFENCE_RADIUS_M: f64 = 20.0;

//Motors
pub const MIN_POWER: f32 = 0.0_f32;
pub const MAX_POWER: f32 = 1.0_f32;
pub const VEHICLE_TYPE: FrameConfiguration = FrameConfiguration::Quadcopter;
pub const MOTOR_MAX_DUTY: u16 = 1000;

// Attitude stabilize stage
pub const ROLL_PID: PidSettings = PidSettings {
    proportional: 1.25,
    integral: 0.325,
    derivative: 0.077,
    range_min: -ROLL_PITCH_COMMAND_LIMIT,
    range_max: ROLL_PITCH_COMMAND_LIMIT,
    windup_limit: 10.0 * DEG_TO_RAD,
    lowpass_cutoff_hz: 20.0,
};

pub const PITCH_PID: PidSettings = PidSettings {
    proportional: 1.08,
    integral: 0.65,
    derivative: 0.1625,
    range_min: -ROLL_PITCH_COMMAND_LIMIT,
    range_max: ROLL_PITCH_COMMAND_LIMIT,
    windup_limit: 10.0 * DEG_TO_RAD,
    lowpass_cutoff_hz: 20.0,
};

// Rate stage
pub const ROLL_RATE_PID: PidSettings = PidSettings {
    proportional: 0.9678,
    integral: 1.526,
    derivative: 0.02405,
    range_min: -CRITICAL_ANGLE_LIMIT,
    range_max: CRITICAL_ANGLE_LIMIT,
    windup_limit: 20.0 * DEG_TO_RAD,
    lowpass_cutoff_hz: 41.0,
};

pub const PITCH_RATE_PID: PidSettings = PidSettings {
    proportional: 0.375,
    integral: 1.545,
    derivative: 0.0225,
    range_min: -CRITICAL_ANGLE_LIMIT,
    range_max: CRITICAL_ANGLE_LIMIT,
    windup_limit: 20.0 * DEG_TO_RAD,
    lowpass_cutoff_hz: 41.0,
};

pub const YAW_RATE_PID: PidSettings = PidSettings {
    proportional: 0.825,
    integral: 0.5,
    derivative: 0.0035,
    range_min: -YAW_COMMAND_LIMIT,
    range_max: YAW_COMMAND_LIMIT,
    windup_limit: 20.0 * DEG_TO_RAD,
    lowpass_cutoff_hz: 41.0,
};

// Thread cadences
pub const IMU_SAMPLE_PERIOD_MS: u64 = 5;
pub const TELEMETRY_PERIOD_MS: u64 = 250;
pub const BEACON_PERIOD_MS: u64 = 1000;
pub const BATTERY_SAMPLE_PERIOD_MS: u64 = 2000;
pub const SERIAL_POLL_TIMEOUT_MS: u64 = 50;
pub const THREAD_STACK_SIZE: usize = 64 * 1024;

// Host setup
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:5760";
pub const DEFAULT_CONFIG_PATH: &str = "drone-gains.bin";
pub const BEACON_COOKIE: u32 = 1;
