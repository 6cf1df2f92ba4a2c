use bitfield_struct::bitfield;

use super::{error::ProtocolError, HEADER_SIZE, PROTOCOL_MAGIC};

/// Ordered LSB to MSB, so the big-endian bytes of the backing u64 are the wire layout
/// `<magic><type><length><sequence>`.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct MessageHeader {
    pub sequence: u16,
    /// Size of the whole message, header included.
    pub length: u16,
    pub message_type: u16,
    pub magic: u16,
}

impl MessageHeader {
    pub fn for_message(message_type: u16, length: u16, sequence: u16) -> Self {
        MessageHeader::new()
            .with_magic(PROTOCOL_MAGIC)
            .with_message_type(message_type)
            .with_length(length)
            .with_sequence(sequence)
    }

    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        u64::from(self).to_be_bytes()
    }

    pub fn parse(buffer: &[u8]) -> Result<Self, ProtocolError> {
        if buffer.len() < HEADER_SIZE {
            return Err(ProtocolError::Undersized {
                expected: HEADER_SIZE,
                found: buffer.len(),
            });
        }
        let mut raw = [0_u8; HEADER_SIZE];
        raw.copy_from_slice(&buffer[0..HEADER_SIZE]);
        let header = MessageHeader::from(u64::from_be_bytes(raw));
        if header.magic() != PROTOCOL_MAGIC {
            return Err(ProtocolError::BadMagic(header.magic()));
        }
        Ok(header)
    }
}
