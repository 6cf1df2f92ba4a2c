use crate::util::math::vectors::RotationVector3D;

/// Fused attitude and body rates for one control tick, radians and rad/s.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ImuSnapshot {
    pub orientation: RotationVector3D,
    pub rotation_rate: RotationVector3D,
}

pub trait ImuSensor {
    /// Blocks until the next sample is ready, `None` once the sensor stops delivering.
    fn wait_for_sample(&mut self) -> Option<ImuSnapshot>;
}
