use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use shared_definitions::{
    controller::PidType,
    protocol::{
        encoding::decode_pid_gain,
        error::ProtocolError,
        header::MessageHeader,
        messages::{ControlModeSettings, PIDDesc, ProtocolMessage},
        transport::{ByteSink, ByteSource, MonitorFlow, ProtocolMonitor},
        ProtocolCodec,
    },
};

use crate::{
    config::store::{AppStoredConfig, ConfigStorage},
    control::flight_controllers::{to_wire_location, PidAxis},
    output::motors_state_manager::MotorOutputs,
    shared_core_values::{lock_shared, AtomicTelemetry, SharedFlightController},
};

use super::{beacon::Beacon, controller::RemoteControl, link::SharedLink};

const ARM_ACK_STATUS: u32 = 0;

/// Persists gains adjusted over the link.
pub struct GainStore {
    storage: ConfigStorage,
    stored: AppStoredConfig,
}

impl GainStore {
    pub fn new(storage: ConfigStorage, stored: AppStoredConfig) -> Self {
        Self { storage, stored }
    }

    fn record(&mut self, axis: PidAxis, (proportional, integral, derivative): (f32, f32, f32)) {
        self.stored
            .update_gains(axis, proportional, integral, derivative);
        match self.storage.store_to_file(&self.stored) {
            Ok(()) => log::info!("Stored {} gains to {:?}", axis.name(), self.storage.path()),
            Err(error) => log::warn!("{}", error),
        }
    }
}

/// Receive side of the aircraft: turns accepted messages into flight controller calls
/// and answers on the shared outbound link.
pub struct CommandDispatcher<M, R, W> {
    flight_controller: SharedFlightController<M>,
    reader: R,
    codec: ProtocolCodec,
    link: SharedLink<W>,
    beacon: Beacon,
    gain_store: Option<GainStore>,
    exit: Arc<AtomicBool>,
}

impl<M, R, W> CommandDispatcher<M, R, W>
where
    M: MotorOutputs,
    R: ByteSource,
    W: ByteSink,
{
    pub fn new(
        flight_controller: SharedFlightController<M>,
        reader: R,
        link: SharedLink<W>,
        beacon_cookie: u32,
        beacon_period: Duration,
        exit: Arc<AtomicBool>,
    ) -> Self {
        Self {
            flight_controller,
            reader,
            codec: ProtocolCodec::new(),
            link,
            beacon: Beacon::new(beacon_cookie, beacon_period),
            gain_store: None,
            exit,
        }
    }

    pub fn with_gain_store(mut self, gain_store: GainStore) -> Self {
        self.gain_store = Some(gain_store);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.beacon.is_acknowledged()
    }

    fn reply(&self, message: &ProtocolMessage) {
        if let Err(error) = lock_shared(&self.link).send(message) {
            log::warn!("Failed to send {:?}: {}", message.message_type(), error);
        }
    }

    fn mark_connected(&mut self) {
        log::info!("Ground station connected");
        lock_shared(&self.link).mark_connected();
    }

    fn control_mode_settings(&self) -> ControlModeSettings {
        let flight_controller = lock_shared(&self.flight_controller);
        ControlModeSettings {
            mode: flight_controller.control_mode(),
            axes: flight_controller.control_axes(),
        }
    }

    fn arm(&mut self, cookie: u32) {
        log::info!("Received Arm Command");
        let location = {
            let mut flight_controller = lock_shared(&self.flight_controller);
            let location = flight_controller.current_location();
            flight_controller.activate(&location);
            flight_controller.base_location()
        };
        self.reply(&ProtocolMessage::ArmAck {
            cookie,
            status: ARM_ACK_STATUS,
            location: to_wire_location(&location),
        });
    }

    fn adjust_gain(&mut self, pid_type: PidType, desc: PIDDesc) {
        let proportional = decode_pid_gain(desc.kp);
        let integral = decode_pid_gain(desc.ki);
        let derivative = decode_pid_gain(desc.kd);
        log::info!(
            "Received AdjustGain Command Kp: {} Ki: {} Kd: {}",
            proportional,
            integral,
            derivative
        );

        let applied = {
            let mut flight_controller = lock_shared(&self.flight_controller);
            flight_controller
                .adjust_gain(pid_type, proportional, integral, derivative)
                .map(|axis| (axis, flight_controller.pid(axis).gains()))
        };
        let (axis, gains) = match applied {
            Some(applied) => applied,
            None => {
                log::warn!("AdjustGain for {:?} ignored", pid_type);
                return;
            }
        };
        // The store is written without holding the controller
        if let Some(gain_store) = self.gain_store.as_mut() {
            gain_store.record(axis, gains);
        }
    }

    fn halt(&mut self, status: u32) -> MonitorFlow {
        log::info!("Received Disarm Command");
        self.reply(&ProtocolMessage::Disarm { status });
        lock_shared(&self.flight_controller).halt();
        self.exit.store(true, Ordering::Relaxed);
        MonitorFlow::Stop
    }
}

impl<M, R, W> ProtocolMonitor for CommandDispatcher<M, R, W>
where
    M: MotorOutputs,
    R: ByteSource,
    W: ByteSink,
{
    fn read_transport_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        if let Some(beacon) = self.beacon.poll(Instant::now()) {
            self.reply(&beacon);
        }
        self.reader.read_byte()
    }

    fn codec(&mut self) -> &mut ProtocolCodec {
        &mut self.codec
    }

    fn is_monitoring(&self) -> bool {
        !self.exit.load(Ordering::Relaxed)
    }

    fn process_message(&mut self, _header: MessageHeader, message: ProtocolMessage) -> MonitorFlow {
        if let ProtocolMessage::BeaconAck { cookie, .. } = message {
            if !self.beacon.is_acknowledged() && self.beacon.acknowledge(cookie) {
                self.mark_connected();
            }
            return MonitorFlow::Continue;
        }
        if !self.beacon.is_acknowledged() {
            // Any command also proves the ground station is listening
            self.beacon.acknowledge(self.beacon.cookie());
            self.mark_connected();
        }

        match message {
            ProtocolMessage::Arm { cookie } => self.arm(cookie),
            ProtocolMessage::Control(input) => lock_shared(&self.flight_controller).command(input),
            ProtocolMessage::GetControlMode => {
                let settings = self.control_mode_settings();
                self.reply(&ProtocolMessage::ControlModeAck(settings));
            }
            ProtocolMessage::SetControlMode(settings) => {
                lock_shared(&self.flight_controller).set_control_mode(settings.mode, settings.axes);
                let settings = self.control_mode_settings();
                self.reply(&ProtocolMessage::ControlModeAck(settings));
            }
            ProtocolMessage::AdjustGain { pid_type, desc } => self.adjust_gain(pid_type, desc),
            ProtocolMessage::ReqPIDState { pid_type, .. } => {
                let state = lock_shared(&self.flight_controller)
                    .pid_state(pid_type)
                    .unwrap_or_default();
                self.reply(&ProtocolMessage::PIDState { pid_type, state });
            }
            ProtocolMessage::Disarm { status } | ProtocolMessage::Halt { status } => {
                return self.halt(status);
            }
            other => log::debug!("Ignoring {:?} sent to the aircraft", other.message_type()),
        }
        MonitorFlow::Continue
    }
}

impl<M, R, W> RemoteControl for CommandDispatcher<M, R, W>
where
    M: MotorOutputs,
    R: ByteSource,
    W: ByteSink,
{
    fn start_changes_monitor(&mut self) -> Result<(), ProtocolError> {
        log::info!("Listening for ground station commands");
        let result = self.start_monitor();
        if let Err(error) = &result {
            log::warn!("Command link closed: {}", error);
        }
        result
    }
}

/// Periodic telemetry, built only from the lock-free snapshot.
pub fn drone_state_message(telemetry: &AtomicTelemetry) -> ProtocolMessage {
    ProtocolMessage::DroneState(telemetry.drone_state.load())
}
