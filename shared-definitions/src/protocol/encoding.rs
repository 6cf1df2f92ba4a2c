//! Scalar conversions between the controller's floating point domain and the integers
//! carried on the wire.

pub const PID_FIXED_POINT_SCALE: f64 = 1000.0;
pub const PID_FIXED_POINT_LIMIT: i64 = 1_000_000;

/// Gains travel as milli-units so both peers agree regardless of float layout.
pub fn encode_pid_gain(value: f32) -> i64 {
    let scaled = (value as f64 * PID_FIXED_POINT_SCALE).round();
    if scaled.is_nan() {
        return 0;
    }
    (scaled as i64).clamp(-PID_FIXED_POINT_LIMIT, PID_FIXED_POINT_LIMIT)
}

pub fn decode_pid_gain(value: i64) -> f32 {
    (value as f64 / PID_FIXED_POINT_SCALE) as f32
}

/// A channel value normalized to `[-1, 1]` (or `[0, 1]` for unsigned channels).
///
/// Signed channels scale negatives by `|MIN|` and positives by `MAX`, that way both ends
/// of the two's complement range map onto exactly -1.0 and 1.0.
pub trait NormalizedChannel: Sized + Copy {
    fn from_normalized(value: f32) -> Self;
    fn to_normalized(self) -> f32;
}

macro_rules! signed_normalized_channel {
    ($($int:ty),*) => {
        $(
            impl NormalizedChannel for $int {
                fn from_normalized(value: f32) -> Self {
                    if value.is_nan() {
                        return 0;
                    }
                    let value = value.clamp(-1.0, 1.0) as f64;
                    if value < 0.0 {
                        (value * -(<$int>::MIN as f64)) as $int
                    } else {
                        (value * <$int>::MAX as f64) as $int
                    }
                }

                fn to_normalized(self) -> f32 {
                    if self < 0 {
                        (self as f64 / -(<$int>::MIN as f64)) as f32
                    } else {
                        (self as f64 / <$int>::MAX as f64) as f32
                    }
                }
            }
        )*
    };
}

signed_normalized_channel!(i16, i32, i64);

impl NormalizedChannel for u16 {
    fn from_normalized(value: f32) -> Self {
        if value.is_nan() {
            return 0;
        }
        (value.clamp(0.0, 1.0) as f64 * u16::MAX as f64) as u16
    }

    fn to_normalized(self) -> f32 {
        (self as f64 / u16::MAX as f64) as f32
    }
}

pub fn to_int16(value: f32) -> i16 {
    i16::from_normalized(value)
}

pub fn to_int32(value: f32) -> i32 {
    i32::from_normalized(value)
}

pub fn to_int64(value: f32) -> i64 {
    i64::from_normalized(value)
}

pub fn to_uint16(value: f32) -> u16 {
    u16::from_normalized(value)
}
