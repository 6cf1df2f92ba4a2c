use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use shared_definitions::{
    controller::{ControlAxes, ControlInput, ControlMode, PidType},
    protocol::{
        encoding::{decode_pid_gain, encode_pid_gain},
        error::ProtocolError,
        header::MessageHeader,
        messages::{ControlModeSettings, DroneState, Location, PIDDesc, PIDState, ProtocolMessage},
        sequence::SequenceCounter,
        transport::{ByteSink, ByteSource, MonitorFlow, ProtocolMonitor},
        ProtocolCodec,
    },
};

pub fn lock<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ground to aircraft half of the link, shared by the command and control threads.
pub struct Uplink<W> {
    writer: W,
    sequence: SequenceCounter,
}

pub type SharedUplink<W> = Arc<Mutex<Uplink<W>>>;

impl<W: ByteSink> Uplink<W> {
    pub fn new(writer: W) -> Self {
        Uplink {
            writer,
            sequence: SequenceCounter::new(),
        }
    }

    pub fn shared(writer: W) -> SharedUplink<W> {
        Arc::new(Mutex::new(Self::new(writer)))
    }

    pub fn send(&mut self, message: &ProtocolMessage) -> Result<(), ProtocolError> {
        let bytes = message.encode(self.sequence.next())?;
        self.writer.write_all(&bytes)
    }

    pub fn arm(&mut self, cookie: u32) -> Result<(), ProtocolError> {
        self.send(&ProtocolMessage::Arm { cookie })
    }

    pub fn control(&mut self, input: ControlInput) -> Result<(), ProtocolError> {
        self.send(&ProtocolMessage::Control(input))
    }

    pub fn adjust_gain(
        &mut self,
        pid_type: PidType,
        proportional: f32,
        integral: f32,
        derivative: f32,
    ) -> Result<(), ProtocolError> {
        log::info!(
            "Tuning {:?} Kp: {} Ki: {} Kd: {}",
            pid_type,
            proportional,
            integral,
            derivative
        );
        self.send(&ProtocolMessage::AdjustGain {
            pid_type,
            desc: PIDDesc {
                kp: encode_pid_gain(proportional),
                ki: encode_pid_gain(integral),
                kd: encode_pid_gain(derivative),
                ..Default::default()
            },
        })
    }

    pub fn set_control_mode(
        &mut self,
        mode: ControlMode,
        axes: ControlAxes,
    ) -> Result<(), ProtocolError> {
        self.send(&ProtocolMessage::SetControlMode(ControlModeSettings { mode, axes }))
    }

    pub fn get_control_mode(&mut self) -> Result<(), ProtocolError> {
        self.send(&ProtocolMessage::GetControlMode)
    }

    pub fn request_pid_state(&mut self, pid_type: PidType) -> Result<(), ProtocolError> {
        self.send(&ProtocolMessage::ReqPIDState {
            status: 0,
            pid_type,
        })
    }

    pub fn halt(&mut self) -> Result<(), ProtocolError> {
        self.send(&ProtocolMessage::Halt { status: 0 })
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

/// What the ground station last heard from the aircraft.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AircraftView {
    pub connected: bool,
    pub armed: bool,
    pub base_location: Option<Location>,
    pub drone_state: Option<DroneState>,
    pub control_mode: Option<ControlModeSettings>,
    pub pid_states: Vec<(PidType, PIDState)>,
    pub disarm_status: Option<u32>,
}

pub type SharedAircraftView = Arc<Mutex<AircraftView>>;

/// Receive side of the ground station.
pub struct GroundStation<R, W> {
    reader: R,
    codec: ProtocolCodec,
    uplink: SharedUplink<W>,
    view: SharedAircraftView,
    exit: Arc<AtomicBool>,
}

impl<R, W> GroundStation<R, W>
where
    R: ByteSource,
    W: ByteSink,
{
    pub fn new(reader: R, uplink: SharedUplink<W>, exit: Arc<AtomicBool>) -> Self {
        GroundStation {
            reader,
            codec: ProtocolCodec::new(),
            uplink,
            view: Arc::new(Mutex::new(AircraftView::default())),
            exit,
        }
    }

    pub fn view(&self) -> SharedAircraftView {
        self.view.clone()
    }

    fn answer_beacon(&mut self, cookie: u32) {
        let ack = ProtocolMessage::BeaconAck { cookie, status: 0 };
        if let Err(error) = lock(&self.uplink).send(&ack) {
            log::warn!("Failed to answer the beacon: {}", error);
            return;
        }
        let mut view = lock(&self.view);
        if !view.connected {
            log::info!("Aircraft found, beacon cookie {}", cookie);
            view.connected = true;
        }
    }

    fn record_pid_state(&mut self, pid_type: PidType, state: PIDState) {
        log::info!(
            "PID {:?} Kp: {} Ki: {} Kd: {} error: {} integral: {}",
            pid_type,
            decode_pid_gain(state.desc.kp),
            decode_pid_gain(state.desc.ki),
            decode_pid_gain(state.desc.kd),
            state.current_error,
            state.integral_error
        );
        let mut view = lock(&self.view);
        match view.pid_states.iter_mut().find(|(known, _)| *known == pid_type) {
            Some(entry) => entry.1 = state,
            None => view.pid_states.push((pid_type, state)),
        }
    }
}

impl<R, W> ProtocolMonitor for GroundStation<R, W>
where
    R: ByteSource,
    W: ByteSink,
{
    fn read_transport_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        self.reader.read_byte()
    }

    fn codec(&mut self) -> &mut ProtocolCodec {
        &mut self.codec
    }

    fn is_monitoring(&self) -> bool {
        !self.exit.load(Ordering::Relaxed)
    }

    fn process_message(&mut self, _header: MessageHeader, message: ProtocolMessage) -> MonitorFlow {
        match message {
            ProtocolMessage::Beacon { cookie } => self.answer_beacon(cookie),
            ProtocolMessage::ArmAck {
                cookie, location, ..
            } => {
                log::info!("Armed, cookie {} base valid {}", cookie, location.is_valid);
                let mut view = lock(&self.view);
                view.armed = true;
                view.base_location = Some(location);
            }
            ProtocolMessage::DroneState(state) => {
                log::debug!(
                    "Armed {} orientation {:?} motors {:?}",
                    state.is_armed,
                    state.orientation,
                    state.motors
                );
                lock(&self.view).drone_state = Some(state);
            }
            ProtocolMessage::PIDState { pid_type, state } => self.record_pid_state(pid_type, state),
            ProtocolMessage::ControlModeAck(settings) => {
                log::info!("Control mode {:?} axes {:?}", settings.mode, settings.axes);
                lock(&self.view).control_mode = Some(settings);
            }
            ProtocolMessage::Disarm { status } => {
                log::info!("Aircraft disarmed, status {}", status);
                let mut view = lock(&self.view);
                view.armed = false;
                view.disarm_status = Some(status);
                self.exit.store(true, Ordering::Relaxed);
                return MonitorFlow::Stop;
            }
            other => log::debug!("Ignoring {:?} sent to the ground", other.message_type()),
        }
        MonitorFlow::Continue
    }
}
