use std::io::{self, Read};

use byteorder::{NativeEndian, ReadBytesExt};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPressCodes {
    Y = 308,
    B = 305,
    A = 304,
    X = 307,
    Menu = 315,
    Windows = 314,
    Logo = 316,
    LB = 310,
    RB = 311,
}

impl TryFrom<u16> for ButtonPressCodes {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            308 => Ok(ButtonPressCodes::Y),
            305 => Ok(ButtonPressCodes::B),
            304 => Ok(ButtonPressCodes::A),
            307 => Ok(ButtonPressCodes::X),
            315 => Ok(ButtonPressCodes::Menu),
            314 => Ok(ButtonPressCodes::Windows),
            316 => Ok(ButtonPressCodes::Logo),
            310 => Ok(ButtonPressCodes::LB),
            311 => Ok(ButtonPressCodes::RB),
            _ => Err(()),
        }
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogInputCodes {
    LeftX = 0,
    LeftY = 1,
    RightX = 3,
    RightY = 4,
    LT = 2,
    RT = 5,
}

impl TryFrom<u16> for AnalogInputCodes {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AnalogInputCodes::LeftX),
            1 => Ok(AnalogInputCodes::LeftY),
            3 => Ok(AnalogInputCodes::RightX),
            4 => Ok(AnalogInputCodes::RightY),
            2 => Ok(AnalogInputCodes::LT),
            5 => Ok(AnalogInputCodes::RT),
            _ => Err(()),
        }
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTypes {
    None = 0,
    ButtonPress = 1,
    AnalogInput = 3,
}

impl From<u16> for EventTypes {
    fn from(value: u16) -> Self {
        match value {
            1 => EventTypes::ButtonPress,
            3 => EventTypes::AnalogInput,
            _ => EventTypes::None,
        }
    }
}

/// One evdev record, `struct input_event` on 64-bit Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub tv_sec: u64,
    pub tv_usec: u64,
    pub event_type: EventTypes,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub const SIZE: usize = 24;

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(InputEvent {
            tv_sec: reader.read_u64::<NativeEndian>()?,
            tv_usec: reader.read_u64::<NativeEndian>()?,
            event_type: EventTypes::from(reader.read_u16::<NativeEndian>()?),
            code: reader.read_u16::<NativeEndian>()?,
            value: reader.read_i32::<NativeEndian>()?,
        })
    }
}
