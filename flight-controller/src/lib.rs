pub mod communication_interfaces;
pub mod config;
pub mod control;
pub mod drivers;
pub mod output;
pub mod shared_core_values;
pub mod telemetry;
pub mod threads;
pub mod util;

/// Float comparison shared by unit and integration tests.
#[doc(hidden)]
pub mod test_utils;
