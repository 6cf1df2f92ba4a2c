use std::{
    net::{TcpListener, TcpStream},
    time::Duration,
};

use drone_flight_computer::{
    communication_interfaces::dispatcher::GainStore,
    config::{
        constants::{
            DEFAULT_CONFIG_PATH, DEFAULT_LISTEN_ADDRESS, IMU_SAMPLE_PERIOD_MS, MOTOR_MAX_DUTY,
            SERIAL_POLL_TIMEOUT_MS,
        },
        store::{AppStoredConfig, ConfigStorage},
        FlightControllerConfig,
    },
    drivers::simulated::{SimulatedBattery, SimulatedGps, SimulatedImu, SimulatedPwmChannel},
    output::motors_state_manager::MotorsStateManager,
    threads::{FlightHardware, FlightRuntime},
    util::{error::AppError, math::geodesy::GpsLocation},
};
use env_logger::Env;
use shared_definitions::protocol::transport::StreamTransport;

const SIMULATED_BASE: (f64, f64, f64) = (18.4861, -69.9312, 30.0);
// About 8 V through the divider
const SIMULATED_BATTERY_SAMPLE: u16 = 557;

fn accept_ground_station(address: &str) -> Result<TcpStream, AppError<std::io::ErrorKind>> {
    let listener = TcpListener::bind(address)
        .map_err(|error| AppError::new("Failed to bind the link address", error.kind()))?;
    log::info!("Waiting for the ground station on {}", address);
    let (stream, peer) = listener
        .accept()
        .map_err(|error| AppError::new("Failed to accept the ground station", error.kind()))?;
    log::info!("Ground station link from {}", peer);
    stream
        .set_read_timeout(Some(Duration::from_millis(SERIAL_POLL_TIMEOUT_MS)))
        .map_err(|error| AppError::new("Failed to configure the link", error.kind()))?;
    stream
        .set_nodelay(true)
        .map_err(|error| AppError::new("Failed to configure the link", error.kind()))?;
    Ok(stream)
}

fn load_gains(storage: &ConfigStorage) -> (FlightControllerConfig, AppStoredConfig) {
    let stored = match storage.load_from_file() {
        Ok(stored) => stored,
        Err(error) => {
            log::warn!("{}, using the default gains", error);
            AppStoredConfig::default()
        }
    };
    let config = FlightControllerConfig::default().with_stored_gains(&stored);
    if stored.initialized {
        log::info!("Loaded gains from {:?}", storage.path());
        (config, stored)
    } else {
        let stored = AppStoredConfig::from_config(&config);
        (config, stored)
    }
}

fn run() -> Result<(), AppError<std::io::ErrorKind>> {
    let mut args = std::env::args().skip(1);
    let address = args.next().unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let storage = ConfigStorage::new(&config_path);
    let (config, stored) = load_gains(&storage);

    let stream = accept_ground_station(&address)?;
    let writer = stream
        .try_clone()
        .map_err(|error| AppError::new("Failed to split the link", error.kind()))?;

    let (latitude, longitude, altitude) = SIMULATED_BASE;
    let motor_count = config.frame.motor_count();
    let hardware = FlightHardware {
        motors: MotorsStateManager::new(
            (0..motor_count).map(|_| SimulatedPwmChannel::new(MOTOR_MAX_DUTY)),
        ),
        imu: SimulatedImu::new(Duration::from_millis(IMU_SAMPLE_PERIOD_MS)),
        gps: SimulatedGps::new(GpsLocation::new(latitude, longitude, altitude)),
        battery: SimulatedBattery::new(SIMULATED_BATTERY_SAMPLE),
        link_reader: StreamTransport::new(stream),
        link_writer: StreamTransport::new(writer),
    };

    let runtime = FlightRuntime::start(config, hardware, Some(GainStore::new(storage, stored)))
        .map_err(|error| AppError::new("Failed to start the flight threads", error.kind()))?;
    log::info!("Running");
    runtime.join();
    log::info!("Flight computer stopped");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().filter_or("DRONE_LOG", "info")).init();
    if let Err(error) = run() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}
