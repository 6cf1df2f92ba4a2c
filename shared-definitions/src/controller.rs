use bitflags::bitflags;

/// Stick input as carried by the Control message, each channel spans the whole i16 range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlInput {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
    pub thrust: i16,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// Sticks command a rotation rate, the stabilize stage is bypassed.
    Rate = 1,
    /// Sticks command an attitude angle.
    #[default]
    Angle = 2,
}

/// Anything other than the rate id selects angle mode.
impl From<u8> for ControlMode {
    fn from(value: u8) -> Self {
        if value == ControlMode::Rate as u8 {
            ControlMode::Rate
        } else {
            ControlMode::Angle
        }
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidType {
    None = 0,
    Roll = 1,
    RollRate = 2,
    Pitch = 3,
    PitchRate = 4,
    Rotate = 5,
    RotateRate = 6,
}

impl TryFrom<u32> for PidType {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PidType::None),
            1 => Ok(PidType::Roll),
            2 => Ok(PidType::RollRate),
            3 => Ok(PidType::Pitch),
            4 => Ok(PidType::PitchRate),
            5 => Ok(PidType::Rotate),
            6 => Ok(PidType::RotateRate),
            _ => Err(()),
        }
    }
}

bitflags! {
    /// Axes whose controllers contribute to the motor mix.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlAxes: u8 {
        const ROLL = 0b0000_0001;
        const PITCH = 0b0000_0010;
        const YAW = 0b0000_0100;
    }
}

impl Default for ControlAxes {
    fn default() -> Self {
        ControlAxes::all()
    }
}

impl ControlAxes {
    /// Builds the enabled set from the wire's `disable_*` bytes, any non-zero byte disables.
    pub fn from_disable_flags(disable_roll: u8, disable_pitch: u8, disable_yaw: u8) -> Self {
        let mut axes = ControlAxes::empty();
        axes.set(ControlAxes::ROLL, disable_roll == 0);
        axes.set(ControlAxes::PITCH, disable_pitch == 0);
        axes.set(ControlAxes::YAW, disable_yaw == 0);
        axes
    }

    /// `(disable_roll, disable_pitch, disable_yaw)` as carried on the wire.
    pub fn to_disable_flags(&self) -> (u8, u8, u8) {
        (
            !self.contains(ControlAxes::ROLL) as u8,
            !self.contains(ControlAxes::PITCH) as u8,
            !self.contains(ControlAxes::YAW) as u8,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PIDTuneConfig {
    pub proportional: f32,
    pub integral: f32,
    pub derivative: f32,
    pub range_min: f32,
    pub range_max: f32,
}
