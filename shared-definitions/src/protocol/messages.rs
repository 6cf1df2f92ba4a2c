use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::{error::ProtocolError, header::MessageHeader, HEADER_SIZE};
use crate::controller::{ControlAxes, ControlInput, ControlMode, PidType};

pub const MAX_MOTOR_COUNT: usize = 8;
pub const MAX_BATTERY_COUNT: usize = 4;
pub const MAX_CELL_COUNT: usize = 4;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Beacon = 0xBEAC,
    BeaconAck = 0xFFFF,
    Arm = 0x0101,
    ArmAck = 0x0202,
    Control = 0x0303,
    GetControlMode = 0x0310,
    SetControlMode = 0x0311,
    ControlModeAck = 0x0312,
    AdjustGain = 0x0404,
    DroneState = 0x0505,
    ReqPIDState = 0x050A,
    PIDState = 0x051A,
    Disarm = 0x0909,
    Halt = 0x0911,
}

impl TryFrom<u16> for MessageType {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0xBEAC => Ok(MessageType::Beacon),
            0xFFFF => Ok(MessageType::BeaconAck),
            0x0101 => Ok(MessageType::Arm),
            0x0202 => Ok(MessageType::ArmAck),
            0x0303 => Ok(MessageType::Control),
            0x0310 => Ok(MessageType::GetControlMode),
            0x0311 => Ok(MessageType::SetControlMode),
            0x0312 => Ok(MessageType::ControlModeAck),
            0x0404 => Ok(MessageType::AdjustGain),
            0x0505 => Ok(MessageType::DroneState),
            0x050A => Ok(MessageType::ReqPIDState),
            0x051A => Ok(MessageType::PIDState),
            0x0909 => Ok(MessageType::Disarm),
            0x0911 => Ok(MessageType::Halt),
            _ => Err(()),
        }
    }
}

impl MessageType {
    /// Fixed body layout size, the header is not included.
    pub const fn body_size(&self) -> usize {
        match self {
            MessageType::Beacon | MessageType::Arm => 4,
            MessageType::BeaconAck => 8,
            MessageType::ArmAck => 8 + Location::SIZE,
            MessageType::Control => 8,
            MessageType::GetControlMode => 0,
            MessageType::SetControlMode | MessageType::ControlModeAck => 4,
            MessageType::AdjustGain => 4 + PIDDesc::SIZE,
            MessageType::DroneState => DroneState::SIZE,
            MessageType::ReqPIDState => 5,
            MessageType::PIDState => 4 + PIDState::SIZE,
            MessageType::Disarm | MessageType::Halt => 4,
        }
    }

    pub const fn message_size(&self) -> usize {
        HEADER_SIZE + self.body_size()
    }
}

/// Aggregate with a fixed big-endian layout inside a message body.
pub trait WireRecord: Sized {
    const SIZE: usize;
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self>;
}

/// GPS fix with each coordinate normalized to an i32 channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub is_valid: u8,
    pub latitude: i32,
    pub longitude: i32,
    pub altitude: i32,
    pub height: i32,
}

impl WireRecord for Location {
    const SIZE: usize = 1 + 4 * 4;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u8(self.is_valid)?;
        writer.write_i32::<BigEndian>(self.latitude)?;
        writer.write_i32::<BigEndian>(self.longitude)?;
        writer.write_i32::<BigEndian>(self.altitude)?;
        writer.write_i32::<BigEndian>(self.height)
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Location {
            is_valid: reader.read_u8()?,
            latitude: reader.read_i32::<BigEndian>()?,
            longitude: reader.read_i32::<BigEndian>()?,
            altitude: reader.read_i32::<BigEndian>()?,
            height: reader.read_i32::<BigEndian>()?,
        })
    }
}

/// Gains and output range in fixed point, see [`super::encoding::encode_pid_gain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PIDDesc {
    pub kp: i64,
    pub ki: i64,
    pub kd: i64,
    pub range_min: i64,
    pub range_max: i64,
}

impl WireRecord for PIDDesc {
    const SIZE: usize = 5 * 8;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i64::<BigEndian>(self.kp)?;
        writer.write_i64::<BigEndian>(self.ki)?;
        writer.write_i64::<BigEndian>(self.kd)?;
        writer.write_i64::<BigEndian>(self.range_min)?;
        writer.write_i64::<BigEndian>(self.range_max)
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(PIDDesc {
            kp: reader.read_i64::<BigEndian>()?,
            ki: reader.read_i64::<BigEndian>()?,
            kd: reader.read_i64::<BigEndian>()?,
            range_min: reader.read_i64::<BigEndian>()?,
            range_max: reader.read_i64::<BigEndian>()?,
        })
    }
}

/// Internal PID statistics for tuning views, values are normalized i64 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PIDState {
    pub set_point: i64,
    pub delta_time: i64,
    pub current_error: i64,
    pub delta_error: i64,
    pub integral_error: i64,
    pub windup_limit: i64,
    pub desc: PIDDesc,
}

impl WireRecord for PIDState {
    const SIZE: usize = 6 * 8 + PIDDesc::SIZE;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i64::<BigEndian>(self.set_point)?;
        writer.write_i64::<BigEndian>(self.delta_time)?;
        writer.write_i64::<BigEndian>(self.current_error)?;
        writer.write_i64::<BigEndian>(self.delta_error)?;
        writer.write_i64::<BigEndian>(self.integral_error)?;
        writer.write_i64::<BigEndian>(self.windup_limit)?;
        self.desc.write_to(writer)
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(PIDState {
            set_point: reader.read_i64::<BigEndian>()?,
            delta_time: reader.read_i64::<BigEndian>()?,
            current_error: reader.read_i64::<BigEndian>()?,
            delta_error: reader.read_i64::<BigEndian>()?,
            integral_error: reader.read_i64::<BigEndian>()?,
            windup_limit: reader.read_i64::<BigEndian>()?,
            desc: PIDDesc::read_from(reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
    pub roll_rate: i16,
    pub pitch_rate: i16,
    pub yaw_rate: i16,
}

impl WireRecord for Orientation {
    const SIZE: usize = 6 * 2;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i16::<BigEndian>(self.roll)?;
        writer.write_i16::<BigEndian>(self.pitch)?;
        writer.write_i16::<BigEndian>(self.yaw)?;
        writer.write_i16::<BigEndian>(self.roll_rate)?;
        writer.write_i16::<BigEndian>(self.pitch_rate)?;
        writer.write_i16::<BigEndian>(self.yaw_rate)
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Orientation {
            roll: reader.read_i16::<BigEndian>()?,
            pitch: reader.read_i16::<BigEndian>()?,
            yaw: reader.read_i16::<BigEndian>()?,
            roll_rate: reader.read_i16::<BigEndian>()?,
            pitch_rate: reader.read_i16::<BigEndian>()?,
            yaw_rate: reader.read_i16::<BigEndian>()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Battery {
    pub cell_count: u8,
    pub cell_levels: [u16; MAX_CELL_COUNT],
}

impl WireRecord for Battery {
    const SIZE: usize = 1 + MAX_CELL_COUNT * 2;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u8(self.cell_count)?;
        for level in self.cell_levels.iter() {
            writer.write_u16::<BigEndian>(*level)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut battery = Battery {
            cell_count: reader.read_u8()?,
            ..Default::default()
        };
        for level in battery.cell_levels.iter_mut() {
            *level = reader.read_u16::<BigEndian>()?;
        }
        Ok(battery)
    }
}

/// Always serialized with every slot, `count` tells how many are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Batteries {
    pub count: u8,
    pub battery: [Battery; MAX_BATTERY_COUNT],
}

impl WireRecord for Batteries {
    const SIZE: usize = 1 + MAX_BATTERY_COUNT * Battery::SIZE;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u8(self.count)?;
        for battery in self.battery.iter() {
            battery.write_to(writer)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut batteries = Batteries {
            count: reader.read_u8()?,
            ..Default::default()
        };
        for battery in batteries.battery.iter_mut() {
            *battery = Battery::read_from(reader)?;
        }
        Ok(batteries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DroneState {
    pub is_armed: u8,
    pub orientation: Orientation,
    pub position: Location,
    pub motors: [u16; MAX_MOTOR_COUNT],
    pub batteries: Batteries,
}

impl WireRecord for DroneState {
    const SIZE: usize =
        1 + Orientation::SIZE + Location::SIZE + MAX_MOTOR_COUNT * 2 + Batteries::SIZE;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u8(self.is_armed)?;
        self.orientation.write_to(writer)?;
        self.position.write_to(writer)?;
        for motor in self.motors.iter() {
            writer.write_u16::<BigEndian>(*motor)?;
        }
        self.batteries.write_to(writer)
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let is_armed = reader.read_u8()?;
        let orientation = Orientation::read_from(reader)?;
        let position = Location::read_from(reader)?;
        let mut motors = [0_u16; MAX_MOTOR_COUNT];
        for motor in motors.iter_mut() {
            *motor = reader.read_u16::<BigEndian>()?;
        }
        Ok(DroneState {
            is_armed,
            orientation,
            position,
            motors,
            batteries: Batteries::read_from(reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlModeSettings {
    pub mode: ControlMode,
    pub axes: ControlAxes,
}

impl WireRecord for ControlModeSettings {
    const SIZE: usize = 4;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let (disable_roll, disable_pitch, disable_yaw) = self.axes.to_disable_flags();
        writer.write_u8(self.mode as u8)?;
        writer.write_u8(disable_roll)?;
        writer.write_u8(disable_pitch)?;
        writer.write_u8(disable_yaw)
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mode = ControlMode::from(reader.read_u8()?);
        let disable_roll = reader.read_u8()?;
        let disable_pitch = reader.read_u8()?;
        let disable_yaw = reader.read_u8()?;
        Ok(ControlModeSettings {
            mode,
            axes: ControlAxes::from_disable_flags(disable_roll, disable_pitch, disable_yaw),
        })
    }
}

/// Every message either peer can send, encoded and decoded through a single match.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    Beacon { cookie: u32 },
    BeaconAck { cookie: u32, status: u32 },
    Arm { cookie: u32 },
    ArmAck { cookie: u32, status: u32, location: Location },
    Control(ControlInput),
    GetControlMode,
    SetControlMode(ControlModeSettings),
    ControlModeAck(ControlModeSettings),
    AdjustGain { pid_type: PidType, desc: PIDDesc },
    DroneState(DroneState),
    ReqPIDState { status: u8, pid_type: PidType },
    PIDState { pid_type: PidType, state: PIDState },
    Disarm { status: u32 },
    Halt { status: u32 },
}

impl ProtocolMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ProtocolMessage::Beacon { .. } => MessageType::Beacon,
            ProtocolMessage::BeaconAck { .. } => MessageType::BeaconAck,
            ProtocolMessage::Arm { .. } => MessageType::Arm,
            ProtocolMessage::ArmAck { .. } => MessageType::ArmAck,
            ProtocolMessage::Control(_) => MessageType::Control,
            ProtocolMessage::GetControlMode => MessageType::GetControlMode,
            ProtocolMessage::SetControlMode(_) => MessageType::SetControlMode,
            ProtocolMessage::ControlModeAck(_) => MessageType::ControlModeAck,
            ProtocolMessage::AdjustGain { .. } => MessageType::AdjustGain,
            ProtocolMessage::DroneState(_) => MessageType::DroneState,
            ProtocolMessage::ReqPIDState { .. } => MessageType::ReqPIDState,
            ProtocolMessage::PIDState { .. } => MessageType::PIDState,
            ProtocolMessage::Disarm { .. } => MessageType::Disarm,
            ProtocolMessage::Halt { .. } => MessageType::Halt,
        }
    }

    /// Serializes header and body, `sequence` is stamped as given.
    pub fn encode(&self, sequence: u16) -> Result<Vec<u8>, ProtocolError> {
        let message_type = self.message_type();
        let size = message_type.message_size();
        let header = MessageHeader::for_message(message_type as u16, size as u16, sequence);

        let mut buffer = Vec::with_capacity(size);
        buffer.extend_from_slice(&header.to_bytes());
        self.write_body(&mut buffer)?;
        Ok(buffer)
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            ProtocolMessage::Beacon { cookie } | ProtocolMessage::Arm { cookie } => {
                writer.write_u32::<BigEndian>(*cookie)
            }
            ProtocolMessage::BeaconAck { cookie, status } => {
                writer.write_u32::<BigEndian>(*cookie)?;
                writer.write_u32::<BigEndian>(*status)
            }
            ProtocolMessage::ArmAck {
                cookie,
                status,
                location,
            } => {
                writer.write_u32::<BigEndian>(*cookie)?;
                writer.write_u32::<BigEndian>(*status)?;
                location.write_to(writer)
            }
            ProtocolMessage::Control(input) => {
                writer.write_i16::<BigEndian>(input.roll)?;
                writer.write_i16::<BigEndian>(input.pitch)?;
                writer.write_i16::<BigEndian>(input.yaw)?;
                writer.write_i16::<BigEndian>(input.thrust)
            }
            ProtocolMessage::GetControlMode => Ok(()),
            ProtocolMessage::SetControlMode(settings)
            | ProtocolMessage::ControlModeAck(settings) => settings.write_to(writer),
            ProtocolMessage::AdjustGain { pid_type, desc } => {
                writer.write_u32::<BigEndian>(*pid_type as u32)?;
                desc.write_to(writer)
            }
            ProtocolMessage::DroneState(state) => state.write_to(writer),
            ProtocolMessage::ReqPIDState { status, pid_type } => {
                writer.write_u8(*status)?;
                writer.write_u32::<BigEndian>(*pid_type as u32)
            }
            ProtocolMessage::PIDState { pid_type, state } => {
                writer.write_u32::<BigEndian>(*pid_type as u32)?;
                state.write_to(writer)
            }
            ProtocolMessage::Disarm { status } | ProtocolMessage::Halt { status } => {
                writer.write_u32::<BigEndian>(*status)
            }
        }
    }

    /// Decodes a complete message, anything shorter than the fixed layout is rejected whole.
    pub fn decode(buffer: &[u8]) -> Result<(MessageHeader, ProtocolMessage), ProtocolError> {
        let header = MessageHeader::parse(buffer)?;
        let message_type = MessageType::try_from(header.message_type())
            .map_err(|_| ProtocolError::UnknownMessageType(header.message_type()))?;

        let expected = message_type.message_size();
        if buffer.len() < expected {
            return Err(ProtocolError::Undersized {
                expected,
                found: buffer.len(),
            });
        }

        let mut body = Cursor::new(&buffer[HEADER_SIZE..expected]);
        let message = Self::read_body(message_type, &mut body).map_err(ProtocolError::from)?;
        Ok((header, message))
    }

    fn read_body<R: Read>(message_type: MessageType, reader: &mut R) -> std::io::Result<Self> {
        let message = match message_type {
            MessageType::Beacon => ProtocolMessage::Beacon {
                cookie: reader.read_u32::<BigEndian>()?,
            },
            MessageType::BeaconAck => ProtocolMessage::BeaconAck {
                cookie: reader.read_u32::<BigEndian>()?,
                status: reader.read_u32::<BigEndian>()?,
            },
            MessageType::Arm => ProtocolMessage::Arm {
                cookie: reader.read_u32::<BigEndian>()?,
            },
            MessageType::ArmAck => ProtocolMessage::ArmAck {
                cookie: reader.read_u32::<BigEndian>()?,
                status: reader.read_u32::<BigEndian>()?,
                location: Location::read_from(reader)?,
            },
            MessageType::Control => ProtocolMessage::Control(ControlInput {
                roll: reader.read_i16::<BigEndian>()?,
                pitch: reader.read_i16::<BigEndian>()?,
                yaw: reader.read_i16::<BigEndian>()?,
                thrust: reader.read_i16::<BigEndian>()?,
            }),
            MessageType::GetControlMode => ProtocolMessage::GetControlMode,
            MessageType::SetControlMode => {
                ProtocolMessage::SetControlMode(ControlModeSettings::read_from(reader)?)
            }
            MessageType::ControlModeAck => {
                ProtocolMessage::ControlModeAck(ControlModeSettings::read_from(reader)?)
            }
            MessageType::AdjustGain => ProtocolMessage::AdjustGain {
                pid_type: read_pid_type(reader)?,
                desc: PIDDesc::read_from(reader)?,
            },
            MessageType::DroneState => ProtocolMessage::DroneState(DroneState::read_from(reader)?),
            MessageType::ReqPIDState => ProtocolMessage::ReqPIDState {
                status: reader.read_u8()?,
                pid_type: read_pid_type(reader)?,
            },
            MessageType::PIDState => ProtocolMessage::PIDState {
                pid_type: read_pid_type(reader)?,
                state: PIDState::read_from(reader)?,
            },
            MessageType::Disarm => ProtocolMessage::Disarm {
                status: reader.read_u32::<BigEndian>()?,
            },
            MessageType::Halt => ProtocolMessage::Halt {
                status: reader.read_u32::<BigEndian>()?,
            },
        };
        Ok(message)
    }
}

fn read_pid_type<R: Read>(reader: &mut R) -> std::io::Result<PidType> {
    // Unknown selectors decode as `None` and are ignored by the receiver
    Ok(PidType::try_from(reader.read_u32::<BigEndian>()?).unwrap_or(PidType::None))
}
