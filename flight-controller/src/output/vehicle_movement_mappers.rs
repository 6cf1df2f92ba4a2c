use core::f32::consts::FRAC_1_SQRT_2;

use shared_definitions::protocol::messages::MAX_MOTOR_COUNT;

use crate::util::math::vectors::RotationVector3D;

pub trait FlyingVehicleMovementMapper<TActuator> {
    fn map_controller_output_to_actuators_input(
        &self,
        throttle: f32,
        rotation_input: RotationVector3D,
    ) -> TActuator;
}

/// Share of each control axis an arm contributes to its motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmThrustRatio {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

const RATIO_LIMIT: f32 = 0.5;
const HALF_SQRT_3: f32 = 0.866_025_4;

// Caret is the nose.
//    A ^ B
//    D   C
//         +      -
// Roll:  (A,D) (B,C)
// Pitch: (A,B) (C,D)
// Yaw:   (A,C) (B,D)
const QUADCOPTER_ARMS: [ArmThrustRatio; 4] = [
    ArmThrustRatio {
        roll: FRAC_1_SQRT_2,
        pitch: FRAC_1_SQRT_2,
        yaw: RATIO_LIMIT,
    },
    ArmThrustRatio {
        roll: -FRAC_1_SQRT_2,
        pitch: FRAC_1_SQRT_2,
        yaw: -RATIO_LIMIT,
    },
    ArmThrustRatio {
        roll: -FRAC_1_SQRT_2,
        pitch: -FRAC_1_SQRT_2,
        yaw: RATIO_LIMIT,
    },
    ArmThrustRatio {
        roll: FRAC_1_SQRT_2,
        pitch: -FRAC_1_SQRT_2,
        yaw: -RATIO_LIMIT,
    },
];

// Arms at -30, -90, -150, 150, 90 and 30 degrees from the nose.
// Roll is cos(θ - 90°), pitch cos(θ), both limited to half authority.
//         +        -
// Roll:  (D,E,F) (A,B,C)
// Pitch: (A,F)   (C,D)
// Yaw:   (B,D,F) (A,C,E)
const HEXACOPTER_ARMS: [ArmThrustRatio; 6] = [
    ArmThrustRatio {
        roll: -0.5 * RATIO_LIMIT,
        pitch: HALF_SQRT_3 * RATIO_LIMIT,
        yaw: -RATIO_LIMIT,
    },
    ArmThrustRatio {
        roll: -RATIO_LIMIT,
        pitch: 0.0,
        yaw: RATIO_LIMIT,
    },
    ArmThrustRatio {
        roll: -0.5 * RATIO_LIMIT,
        pitch: -HALF_SQRT_3 * RATIO_LIMIT,
        yaw: -RATIO_LIMIT,
    },
    ArmThrustRatio {
        roll: 0.5 * RATIO_LIMIT,
        pitch: -HALF_SQRT_3 * RATIO_LIMIT,
        yaw: RATIO_LIMIT,
    },
    ArmThrustRatio {
        roll: RATIO_LIMIT,
        pitch: 0.0,
        yaw: -RATIO_LIMIT,
    },
    ArmThrustRatio {
        roll: 0.5 * RATIO_LIMIT,
        pitch: HALF_SQRT_3 * RATIO_LIMIT,
        yaw: RATIO_LIMIT,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameConfiguration {
    Quadcopter,
    Hexacopter,
}

impl FrameConfiguration {
    pub fn arms(&self) -> &'static [ArmThrustRatio] {
        match self {
            FrameConfiguration::Quadcopter => &QUADCOPTER_ARMS,
            FrameConfiguration::Hexacopter => &HEXACOPTER_ARMS,
        }
    }

    pub fn motor_count(&self) -> usize {
        self.arms().len()
    }
}

/// Per motor levels of one mix, slots past `count` stay at 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorLevels {
    levels: [f32; MAX_MOTOR_COUNT],
    count: usize,
}

impl MotorLevels {
    pub fn as_slice(&self) -> &[f32] {
        &self.levels[..self.count]
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

pub struct MotorMixer {
    arms: &'static [ArmThrustRatio],
    motor_min_power: f32,
    motor_max_power: f32,
}

impl MotorMixer {
    pub fn new(frame: FrameConfiguration, motor_min_power: f32, motor_max_power: f32) -> Self {
        Self {
            arms: frame.arms(),
            motor_min_power,
            motor_max_power,
        }
    }

    pub fn motor_count(&self) -> usize {
        self.arms.len()
    }

    /// Sums throttle and every axis contribution per motor, then brings the mix back
    /// into `[0, 1]`.
    ///
    /// A negative motor lifts the whole mix by the same offset, a motor above 1 scales
    /// the whole mix down. Shifting happens before scaling.
    pub fn mix(&self, roll: f32, pitch: f32, yaw: f32, throttle: f32) -> MotorLevels {
        let mut raw = [0.0_f32; MAX_MOTOR_COUNT];
        for (level, arm) in raw.iter_mut().zip(self.arms.iter()) {
            *level = throttle + arm.roll * roll + arm.pitch * pitch + arm.yaw * yaw;
        }
        let raw = &raw[..self.arms.len()];

        let lowest = raw.iter().copied().fold(f32::INFINITY, f32::min);
        let highest = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let offset = if lowest < 0.0 { -lowest } else { 0.0 };
        let shifted_highest = highest + offset;
        let ratio = if shifted_highest > 1.0 {
            1.0 / shifted_highest
        } else {
            1.0
        };

        let mut levels = MotorLevels {
            levels: [0.0; MAX_MOTOR_COUNT],
            count: self.arms.len(),
        };
        for (output, level) in levels.levels.iter_mut().zip(raw.iter()) {
            *output = constraint_value(
                (level + offset) * ratio,
                self.motor_min_power,
                self.motor_max_power,
            );
        }
        levels
    }
}

impl FlyingVehicleMovementMapper<MotorLevels> for MotorMixer {
    fn map_controller_output_to_actuators_input(
        &self,
        throttle: f32,
        rotation_input: RotationVector3D,
    ) -> MotorLevels {
        self.mix(
            rotation_input.roll,
            rotation_input.pitch,
            rotation_input.yaw,
            throttle,
        )
    }
}

fn constraint_value(value: f32, min: f32, max: f32) -> f32 {
    if value > max {
        return max;
    }
    if value < min {
        return min;
    }
    value
}
