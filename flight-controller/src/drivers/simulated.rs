//! Deterministic stand-ins for the aircraft peripherals, used by the host binary and
//! the tests.

use std::{
    convert::Infallible,
    io::ErrorKind,
    sync::{
        atomic::{AtomicU16, Ordering},
        mpsc::{channel, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    time::Duration,
};

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use libm::{cosf, sinf};
use shared_definitions::protocol::{
    error::ProtocolError,
    transport::{ByteSink, ByteSource},
};

use super::{
    battery::{adc_sample_to_voltage, BatteryMonitor},
    gps::{GpsLocation, GpsSensor},
    imu_sensors::{ImuSnapshot, ImuSensor},
};
use crate::util::math::vectors::RotationVector3D;

/// Reads back the duty last written to a [`SimulatedPwmChannel`].
#[derive(Clone)]
pub struct DutyHandle(Arc<AtomicU16>);

impl DutyHandle {
    pub fn load(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct SimulatedPwmChannel {
    duty: Arc<AtomicU16>,
    max_duty: u16,
}

impl SimulatedPwmChannel {
    pub fn new(max_duty: u16) -> Self {
        Self {
            duty: Arc::new(AtomicU16::new(0)),
            max_duty,
        }
    }

    pub fn duty_handle(&self) -> DutyHandle {
        DutyHandle(self.duty.clone())
    }
}

impl ErrorType for SimulatedPwmChannel {
    type Error = Infallible;
}

impl SetDutyCycle for SimulatedPwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty.store(duty.min(self.max_duty), Ordering::Relaxed);
        Ok(())
    }
}

const NOMINAL_SAMPLE_PERIOD_S: f32 = 0.005;
const SWAY_AMPLITUDE_RAD: f32 = 0.02;
const SWAY_FREQUENCY_RAD_S: f32 = 1.5;

/// IMU with a slow, small roll and pitch sway around level.
pub struct SimulatedImu {
    period: Duration,
    tick: u64,
    sample_limit: Option<u64>,
}

impl SimulatedImu {
    /// A zero period never sleeps.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            tick: 0,
            sample_limit: None,
        }
    }

    pub fn with_sample_limit(mut self, sample_limit: u64) -> Self {
        self.sample_limit = Some(sample_limit);
        self
    }

    pub fn sample_at(tick: u64) -> ImuSnapshot {
        let phase = tick as f32 * NOMINAL_SAMPLE_PERIOD_S * SWAY_FREQUENCY_RAD_S;
        let sway = SWAY_AMPLITUDE_RAD * sinf(phase);
        let sway_rate = SWAY_AMPLITUDE_RAD * SWAY_FREQUENCY_RAD_S * cosf(phase);
        ImuSnapshot {
            orientation: RotationVector3D::new(sway, -sway, 0.0),
            rotation_rate: RotationVector3D::new(sway_rate, -sway_rate, 0.0),
        }
    }
}

impl ImuSensor for SimulatedImu {
    fn wait_for_sample(&mut self) -> Option<ImuSnapshot> {
        if let Some(limit) = self.sample_limit {
            if self.tick >= limit {
                return None;
            }
        }
        if !self.period.is_zero() {
            std::thread::sleep(self.period);
        }
        self.tick += 1;
        Some(Self::sample_at(self.tick))
    }
}

pub struct SimulatedGps {
    location: GpsLocation,
}

impl SimulatedGps {
    pub fn new(location: GpsLocation) -> Self {
        Self { location }
    }

    pub fn set_location(&mut self, location: GpsLocation) {
        self.location = location;
    }
}

impl GpsSensor for SimulatedGps {
    fn location(&mut self) -> GpsLocation {
        self.location
    }
}

pub struct SimulatedBattery {
    adc_sample: u16,
}

impl SimulatedBattery {
    pub fn new(adc_sample: u16) -> Self {
        Self { adc_sample }
    }
}

impl BatteryMonitor for SimulatedBattery {
    fn board_voltage(&mut self) -> f32 {
        adc_sample_to_voltage(self.adc_sample)
    }
}

/// Receiving end of an in-process serial link.
pub struct ChannelReader {
    bytes: Receiver<u8>,
    poll_timeout: Duration,
}

impl ByteSource for ChannelReader {
    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        match self.bytes.recv_timeout(self.poll_timeout) {
            Ok(byte) => Ok(Some(byte)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ProtocolError::Io(ErrorKind::UnexpectedEof))
            }
        }
    }
}

/// Sending end of an in-process serial link.
#[derive(Clone)]
pub struct ChannelWriter {
    bytes: Sender<u8>,
}

impl ByteSink for ChannelWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        for byte in bytes {
            self.bytes
                .send(*byte)
                .map_err(|_| ProtocolError::Io(ErrorKind::BrokenPipe))?;
        }
        Ok(())
    }
}

pub type SerialEndpoint = (ChannelReader, ChannelWriter);

/// Two cross-connected endpoints, whatever one writes the other reads.
pub fn serial_link_pair(poll_timeout: Duration) -> (SerialEndpoint, SerialEndpoint) {
    let (to_station, from_aircraft) = channel();
    let (to_aircraft, from_station) = channel();
    (
        (
            ChannelReader {
                bytes: from_station,
                poll_timeout,
            },
            ChannelWriter { bytes: to_station },
        ),
        (
            ChannelReader {
                bytes: from_aircraft,
                poll_timeout,
            },
            ChannelWriter { bytes: to_aircraft },
        ),
    )
}
