use std::sync::{Arc, Mutex};

use shared_definitions::protocol::{
    error::ProtocolError, messages::ProtocolMessage, sequence::SequenceCounter,
    transport::ByteSink,
};

pub type SharedLink<W> = Arc<Mutex<OutboundLink<W>>>;

/// Aircraft to ground half of the link. Replies and telemetry share it, so they also
/// share one sequence counter.
pub struct OutboundLink<W> {
    writer: W,
    sequence: SequenceCounter,
    connected: bool,
}

impl<W> OutboundLink<W>
where
    W: ByteSink,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            sequence: SequenceCounter::new(),
            connected: false,
        }
    }

    pub fn shared(writer: W) -> SharedLink<W> {
        Arc::new(Mutex::new(Self::new(writer)))
    }

    pub fn send(&mut self, message: &ProtocolMessage) -> Result<(), ProtocolError> {
        let bytes = message.encode(self.sequence.next())?;
        self.writer.write_all(&bytes)
    }

    /// Periodic traffic waits until a ground station answered the beacon.
    pub fn send_if_connected(&mut self, message: &ProtocolMessage) -> Result<bool, ProtocolError> {
        if !self.connected {
            return Ok(false);
        }
        self.send(message)?;
        Ok(true)
    }

    pub fn mark_connected(&mut self) {
        self.connected = true;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink(Vec<u8>);

    impl ByteSink for RecordingSink {
        fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
            self.0.extend_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    fn every_frame_takes_the_next_sequence() {
        let mut link = OutboundLink::new(RecordingSink::default());
        link.send(&ProtocolMessage::Beacon { cookie: 1 }).unwrap();
        link.send(&ProtocolMessage::Beacon { cookie: 1 }).unwrap();

        let bytes = &link.get_ref().0;
        let size = bytes.len() / 2;
        let (first, _) = ProtocolMessage::decode(&bytes[..size]).unwrap();
        let (second, _) = ProtocolMessage::decode(&bytes[size..]).unwrap();
        assert_eq!(first.sequence(), 0);
        assert_eq!(second.sequence(), 1);
    }

    #[test]
    fn periodic_traffic_waits_for_the_ground_station() {
        let mut link = OutboundLink::new(RecordingSink::default());
        assert_eq!(link.send_if_connected(&ProtocolMessage::GetControlMode), Ok(false));
        assert!(link.get_ref().0.is_empty());
        link.mark_connected();
        assert_eq!(link.send_if_connected(&ProtocolMessage::GetControlMode), Ok(true));
        assert!(link.is_connected());
    }
}
