pub const TOLERANCE: f32 = 1e-4;

pub fn value_close(a: f32, b: f32) -> bool {
    (a - b).abs() < TOLERANCE
}
