pub mod encoding;
pub mod error;
pub mod framing;
pub mod header;
pub mod messages;
pub mod sequence;
pub mod transport;

use self::{
    error::ProtocolError,
    framing::FrameScanner,
    header::MessageHeader,
    messages::ProtocolMessage,
    sequence::{SequenceCounter, SequenceTracker},
};

pub const PROTOCOL_MAGIC: u16 = 0x4EAD;
pub const HEADER_SIZE: usize = 8;
/// Receive buffer size, frames declaring more than this are truncated.
pub const MAX_FRAME_SIZE: usize = 2048;

/// One endpoint of the link: outbound sequence counter, inbound staleness filter
/// and the stream scanner.
#[derive(Default)]
pub struct ProtocolCodec {
    outbound: SequenceCounter,
    inbound: SequenceTracker,
    scanner: FrameScanner,
}

impl ProtocolCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, message: &ProtocolMessage) -> Result<Vec<u8>, ProtocolError> {
        message.encode(self.outbound.next())
    }

    pub fn push_byte(&mut self, byte: u8) -> Option<Result<Vec<u8>, ProtocolError>> {
        self.scanner.push_byte(byte)
    }

    pub fn decode(&self, frame: &[u8]) -> Result<(MessageHeader, ProtocolMessage), ProtocolError> {
        ProtocolMessage::decode(frame)
    }

    /// Applies the staleness rule, stale messages are meant to be dropped silently.
    pub fn accept(&mut self, header: &MessageHeader) -> bool {
        self.inbound.accept(header.sequence())
    }

    pub fn last_accepted_sequence(&self) -> u16 {
        self.inbound.last_accepted()
    }
}
