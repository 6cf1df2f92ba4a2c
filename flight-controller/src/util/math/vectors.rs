use libm::sqrtf;

/// Roll, pitch and yaw in radians (or rad/s when used for rates).
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RotationVector3D {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl RotationVector3D {
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

pub fn euclid_distance(lhs: f32, rhs: f32) -> f32 {
    sqrtf(lhs * lhs + rhs * rhs)
}
