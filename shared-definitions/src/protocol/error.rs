use core::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer is shorter than the fixed layout of the message.
    Undersized { expected: usize, found: usize },
    BadMagic(u16),
    UnknownMessageType(u16),
    /// Declared frame length can't hold a header.
    InvalidLength(u16),
    /// The frame didn't fit in the receive buffer.
    Truncated { capacity: usize },
    InvalidField(&'static str),
    Io(std::io::ErrorKind),
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ProtocolError::Undersized { expected, found } => {
                write!(f, "Message too short, expected {} bytes found {}", expected, found)
            }
            ProtocolError::BadMagic(magic) => write!(f, "Bad message magic {:#06x}", magic),
            ProtocolError::UnknownMessageType(id) => {
                write!(f, "Unknown message type {:#06x}", id)
            }
            ProtocolError::InvalidLength(length) => {
                write!(f, "Invalid declared message length {}", length)
            }
            ProtocolError::Truncated { capacity } => {
                write!(f, "Message truncated at buffer capacity {}", capacity)
            }
            ProtocolError::InvalidField(field) => write!(f, "Invalid value for field {}", field),
            ProtocolError::Io(kind) => write!(f, "Transport error {:?}", kind),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<std::io::Error> for ProtocolError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            // Cursor reads past the end of a message body
            std::io::ErrorKind::UnexpectedEof => ProtocolError::InvalidField("body"),
            kind => ProtocolError::Io(kind),
        }
    }
}
