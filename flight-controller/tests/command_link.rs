use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
    time::Duration,
};

use drone_flight_computer::{
    communication_interfaces::{
        controller::RemoteControl, dispatcher::CommandDispatcher, link::OutboundLink,
    },
    config::FlightControllerConfig,
    control::flight_controllers::{to_wire_location, FlightController},
    drivers::{
        imu_sensors::ImuSnapshot,
        simulated::{serial_link_pair, ChannelReader, ChannelWriter, SimulatedPwmChannel},
    },
    output::motors_state_manager::MotorsStateManager,
    shared_core_values::{lock_shared, SharedFlightController},
    test_utils::value_close,
    util::math::geodesy::GpsLocation,
};
use shared_definitions::{
    controller::{ControlAxes, ControlInput, ControlMode, PidType},
    protocol::{
        encoding::{encode_pid_gain, to_int16},
        header::MessageHeader,
        messages::{ControlModeSettings, PIDDesc, ProtocolMessage},
        transport::{ByteSink, ByteSource},
        ProtocolCodec,
    },
};

const COOKIE: u32 = 42;
const POLL_TIMEOUT: Duration = Duration::from_millis(5);
const MAX_IDLE_POLLS: usize = 400;

type TestMotors = MotorsStateManager<SimulatedPwmChannel>;

struct GroundSide {
    reader: ChannelReader,
    writer: ChannelWriter,
    codec: ProtocolCodec,
}

impl GroundSide {
    fn send(&mut self, message: &ProtocolMessage) {
        let bytes = self.codec.encode(message).unwrap();
        self.writer.write_all(&bytes).unwrap();
    }

    fn send_with_sequence(&mut self, message: &ProtocolMessage, sequence: u16) {
        self.writer.write_all(&message.encode(sequence).unwrap()).unwrap();
    }

    fn receive(&mut self) -> (MessageHeader, ProtocolMessage) {
        let mut idle_polls = 0;
        loop {
            let byte = match self.reader.read_byte().unwrap() {
                Some(byte) => byte,
                None => {
                    idle_polls += 1;
                    assert!(idle_polls < MAX_IDLE_POLLS, "the aircraft went quiet");
                    continue;
                }
            };
            if let Some(frame) = self.codec.push_byte(byte) {
                return ProtocolMessage::decode(&frame.unwrap()).unwrap();
            }
        }
    }

    /// Next message that is not a beacon.
    fn reply(&mut self) -> ProtocolMessage {
        loop {
            match self.receive() {
                (_, ProtocolMessage::Beacon { .. }) => continue,
                (_, message) => return message,
            }
        }
    }
}

struct Aircraft {
    flight_controller: SharedFlightController<TestMotors>,
    exit: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Aircraft {
    fn stop(self) {
        self.exit.store(true, Ordering::Relaxed);
        self.handle.join().unwrap();
    }
}

fn start_aircraft() -> (Aircraft, GroundSide) {
    let ((aircraft_reader, aircraft_writer), (station_reader, station_writer)) =
        serial_link_pair(POLL_TIMEOUT);
    let motors = MotorsStateManager::new((0..4).map(|_| SimulatedPwmChannel::new(1000)));
    let flight_controller = Arc::new(Mutex::new(FlightController::new(
        FlightControllerConfig::default(),
        motors,
    )));
    let exit = Arc::new(AtomicBool::new(false));
    let mut dispatcher = CommandDispatcher::new(
        flight_controller.clone(),
        aircraft_reader,
        OutboundLink::shared(aircraft_writer),
        COOKIE,
        Duration::from_millis(20),
        exit.clone(),
    );
    let handle = std::thread::spawn(move || {
        let _ = dispatcher.start_changes_monitor();
    });
    (
        Aircraft {
            flight_controller,
            exit,
            handle,
        },
        GroundSide {
            reader: station_reader,
            writer: station_writer,
            codec: ProtocolCodec::new(),
        },
    )
}

#[test]
fn beacon_repeats_until_acknowledged() {
    let (aircraft, mut ground) = start_aircraft();
    let (first, beacon) = ground.receive();
    assert_eq!(beacon, ProtocolMessage::Beacon { cookie: COOKIE });
    let (second, beacon) = ground.receive();
    assert_eq!(beacon, ProtocolMessage::Beacon { cookie: COOKIE });
    assert!(second.sequence() > first.sequence());

    ground.send(&ProtocolMessage::BeaconAck {
        cookie: COOKIE,
        status: 0,
    });
    ground.send(&ProtocolMessage::GetControlMode);
    assert_eq!(
        ground.reply(),
        ProtocolMessage::ControlModeAck(ControlModeSettings {
            mode: ControlMode::Angle,
            axes: ControlAxes::all(),
        })
    );
    aircraft.stop();
}

#[test]
fn arm_reports_the_base_location() {
    let (aircraft, mut ground) = start_aircraft();
    let fix = GpsLocation::new(18.5, -69.9, 30.0);
    lock_shared(&aircraft.flight_controller).update(&ImuSnapshot::default(), &fix, 1);

    ground.send(&ProtocolMessage::Arm { cookie: 7 });
    assert_eq!(
        ground.reply(),
        ProtocolMessage::ArmAck {
            cookie: 7,
            status: 0,
            location: to_wire_location(&fix),
        }
    );
    {
        let flight_controller = lock_shared(&aircraft.flight_controller);
        assert!(flight_controller.is_armed());
        assert_eq!(flight_controller.base_location(), fix);
    }
    aircraft.stop();
}

#[test]
fn stale_commands_are_dropped() {
    let (aircraft, mut ground) = start_aircraft();
    ground.send_with_sequence(&ProtocolMessage::Arm { cookie: 1 }, 10);
    assert!(matches!(ground.reply(), ProtocolMessage::ArmAck { cookie: 1, .. }));

    ground.send_with_sequence(
        &ProtocolMessage::Control(ControlInput {
            thrust: to_int16(1.0),
            ..Default::default()
        }),
        9,
    );
    ground.send_with_sequence(&ProtocolMessage::GetControlMode, 11);
    assert!(matches!(ground.reply(), ProtocolMessage::ControlModeAck(_)));
    assert_eq!(lock_shared(&aircraft.flight_controller).throttle(), 0.0);

    ground.send_with_sequence(
        &ProtocolMessage::Control(ControlInput {
            thrust: to_int16(1.0),
            ..Default::default()
        }),
        12,
    );
    ground.send_with_sequence(&ProtocolMessage::GetControlMode, 13);
    assert!(matches!(ground.reply(), ProtocolMessage::ControlModeAck(_)));
    assert!(value_close(
        lock_shared(&aircraft.flight_controller).throttle(),
        0.8
    ));
    aircraft.stop();
}

#[test]
fn adjusted_gain_shows_up_in_the_pid_state() {
    let (aircraft, mut ground) = start_aircraft();
    let desc = PIDDesc {
        kp: encode_pid_gain(0.7),
        ki: encode_pid_gain(1.2),
        kd: encode_pid_gain(0.03),
        ..Default::default()
    };
    ground.send(&ProtocolMessage::AdjustGain {
        pid_type: PidType::PitchRate,
        desc,
    });
    ground.send(&ProtocolMessage::ReqPIDState {
        status: 0,
        pid_type: PidType::PitchRate,
    });
    match ground.reply() {
        ProtocolMessage::PIDState { pid_type, state } => {
            assert_eq!(pid_type, PidType::PitchRate);
            assert_eq!(state.desc.kp, desc.kp);
            assert_eq!(state.desc.ki, desc.ki);
            assert_eq!(state.desc.kd, desc.kd);
        }
        other => panic!("unexpected reply {:?}", other),
    }

    ground.send(&ProtocolMessage::ReqPIDState {
        status: 0,
        pid_type: PidType::Roll,
    });
    match ground.reply() {
        ProtocolMessage::PIDState { pid_type, state } => {
            assert_eq!(pid_type, PidType::Roll);
            assert_ne!(state.desc.kp, desc.kp);
        }
        other => panic!("unexpected reply {:?}", other),
    }
    aircraft.stop();
}

#[test]
fn disarm_halts_and_ends_the_monitor() {
    let (aircraft, mut ground) = start_aircraft();
    ground.send(&ProtocolMessage::Arm { cookie: 3 });
    assert!(matches!(ground.reply(), ProtocolMessage::ArmAck { .. }));

    ground.send(&ProtocolMessage::Disarm { status: 5 });
    assert_eq!(ground.reply(), ProtocolMessage::Disarm { status: 5 });

    let Aircraft {
        flight_controller,
        exit,
        handle,
    } = aircraft;
    handle.join().unwrap();
    assert!(exit.load(Ordering::Relaxed));
    assert!(!lock_shared(&flight_controller).is_armed());
}
