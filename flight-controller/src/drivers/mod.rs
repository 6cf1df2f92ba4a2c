pub mod battery;
pub mod gps;
pub mod imu_sensors;
pub mod simulated;
