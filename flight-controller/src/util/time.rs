use std::time::Instant;

use once_cell::sync::Lazy;

static BOOT_INSTANT: Lazy<Instant> = Lazy::new(Instant::now);

/// Milliseconds since the process first asked for the time, never 0.
///
/// The PID treats a zero timestamp as "no previous sample", so the clock starts at 1.
pub fn get_current_system_time_ms() -> u64 {
    BOOT_INSTANT.elapsed().as_millis() as u64 + 1
}

pub fn get_current_system_time_us() -> u64 {
    BOOT_INSTANT.elapsed().as_micros() as u64 + 1
}
