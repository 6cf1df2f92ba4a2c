use super::{error::ProtocolError, HEADER_SIZE, MAX_FRAME_SIZE, PROTOCOL_MAGIC};

const MAGIC_HIGH: u8 = (PROTOCOL_MAGIC >> 8) as u8;
const MAGIC_LOW: u8 = (PROTOCOL_MAGIC & 0x00FF) as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingState {
    SeekMagic1,
    SeekMagic2,
    ReadType1,
    ReadType2,
    ReadLength1,
    ReadLength2,
    CopyBody,
    Done,
}

/// Locates messages inside a byte stream one byte at a time.
///
/// Every byte from the first magic byte on is kept, so a completed frame is the whole
/// message, header included, ready for [`super::messages::ProtocolMessage::decode`].
pub struct FrameScanner<const CAPACITY: usize = MAX_FRAME_SIZE> {
    state: FramingState,
    buffer: [u8; CAPACITY],
    bytes_read: usize,
    message_length: u16,
}

impl<const CAPACITY: usize> Default for FrameScanner<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

/// Magic, type and length are stored before the length can be checked.
const SCANNED_PREFIX: usize = 6;

impl<const CAPACITY: usize> FrameScanner<CAPACITY> {
    const HOLDS_PREFIX: () = assert!(
        CAPACITY >= SCANNED_PREFIX,
        "FrameScanner capacity must hold the magic, type and length bytes"
    );

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HOLDS_PREFIX;
        FrameScanner {
            state: FramingState::SeekMagic1,
            buffer: [0_u8; CAPACITY],
            bytes_read: 0,
            message_length: 0,
        }
    }

    pub fn state(&self) -> FramingState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = FramingState::SeekMagic1;
        self.bytes_read = 0;
        self.message_length = 0;
    }

    fn store(&mut self, byte: u8) {
        self.buffer[self.bytes_read] = byte;
        self.bytes_read += 1;
    }

    /// Feeds one byte, returns a frame once the declared length has been copied.
    pub fn push_byte(&mut self, byte: u8) -> Option<Result<Vec<u8>, ProtocolError>> {
        match self.state {
            FramingState::SeekMagic1 | FramingState::Done => {
                self.reset();
                if byte == MAGIC_HIGH {
                    self.store(byte);
                    self.state = FramingState::SeekMagic2;
                }
            }
            FramingState::SeekMagic2 => {
                if byte == MAGIC_LOW {
                    self.store(byte);
                    self.state = FramingState::ReadType1;
                } else {
                    // False alarm, this byte may still open the next frame
                    self.reset();
                    return self.push_byte(byte);
                }
            }
            FramingState::ReadType1 => {
                self.store(byte);
                self.state = FramingState::ReadType2;
            }
            FramingState::ReadType2 => {
                self.store(byte);
                self.state = FramingState::ReadLength1;
            }
            FramingState::ReadLength1 => {
                self.message_length = (byte as u16) << 8;
                self.store(byte);
                self.state = FramingState::ReadLength2;
            }
            FramingState::ReadLength2 => {
                self.message_length |= byte as u16;
                self.store(byte);
                if (self.message_length as usize) < HEADER_SIZE {
                    let length = self.message_length;
                    self.reset();
                    return Some(Err(ProtocolError::InvalidLength(length)));
                }
                self.state = FramingState::CopyBody;
                return self.check_complete();
            }
            FramingState::CopyBody => {
                self.store(byte);
                return self.check_complete();
            }
        }
        None
    }

    fn check_complete(&mut self) -> Option<Result<Vec<u8>, ProtocolError>> {
        if self.bytes_read >= self.message_length as usize {
            self.state = FramingState::Done;
            return Some(Ok(self.buffer[0..self.bytes_read].to_vec()));
        }
        if self.bytes_read >= CAPACITY {
            self.reset();
            return Some(Err(ProtocolError::Truncated { capacity: CAPACITY }));
        }
        None
    }
}
