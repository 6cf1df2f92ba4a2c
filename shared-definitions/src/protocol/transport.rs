use std::io::{ErrorKind, Read, Write};

use super::{error::ProtocolError, header::MessageHeader, messages::ProtocolMessage, ProtocolCodec};

/// Receiving half of an ordered byte channel.
pub trait ByteSource {
    /// `Ok(None)` when no byte is ready yet, callers keep polling.
    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError>;
}

/// Sending half of an ordered byte channel.
pub trait ByteSink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError>;
}

/// Ordered duplex byte channel, the serial link in the real aircraft.
pub trait ByteTransport: ByteSource + ByteSink {}

impl<T: ByteSource + ByteSink> ByteTransport for T {}

/// Adapts any blocking std stream, read timeouts surface as "no data ready".
pub struct StreamTransport<S> {
    stream: S,
}

impl<S> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        StreamTransport { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

impl<S: Read> ByteSource for StreamTransport<S> {
    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        let mut byte = [0_u8; 1];
        match self.stream.read(&mut byte) {
            Ok(0) => Err(ProtocolError::Io(ErrorKind::UnexpectedEof)),
            Ok(_) => Ok(Some(byte[0])),
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(ProtocolError::Io(error.kind())),
        }
    }
}

impl<S: Write> ByteSink for StreamTransport<S> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }
}

/// Encodes with the codec's outbound counter and writes the frame.
pub fn send_message<T: ByteSink + ?Sized>(
    transport: &mut T,
    codec: &mut ProtocolCodec,
    message: &ProtocolMessage,
) -> Result<(), ProtocolError> {
    let bytes = codec.encode(message)?;
    transport.write_all(&bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorFlow {
    Continue,
    Stop,
}

/// Receive loop shared by both peers.
pub trait ProtocolMonitor {
    fn read_transport_byte(&mut self) -> Result<Option<u8>, ProtocolError>;
    fn codec(&mut self) -> &mut ProtocolCodec;
    fn is_monitoring(&self) -> bool;
    fn process_message(&mut self, header: MessageHeader, message: ProtocolMessage) -> MonitorFlow;

    /// Runs until `is_monitoring` turns false, a handler asks to stop, or the transport fails.
    fn start_monitor(&mut self) -> Result<(), ProtocolError> {
        while self.is_monitoring() {
            let byte = match self.read_transport_byte()? {
                Some(byte) => byte,
                None => continue,
            };
            let frame = match self.codec().push_byte(byte) {
                Some(Ok(frame)) => frame,
                Some(Err(error)) => {
                    log::warn!("Dropping malformed frame: {}", error);
                    continue;
                }
                None => continue,
            };
            let (header, message) = match ProtocolMessage::decode(&frame) {
                Ok(decoded) => decoded,
                Err(error) => {
                    log::warn!("Failed to decode message: {}", error);
                    continue;
                }
            };
            if !self.codec().accept(&header) {
                log::debug!(
                    "Dropping stale message {:#06x} seq {}",
                    header.message_type(),
                    header.sequence()
                );
                continue;
            }
            if let MonitorFlow::Stop = self.process_message(header, message) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// In-memory duplex stream, reads from the script and records writes.
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct RecordingMonitor {
        transport: StreamTransport<ScriptedStream>,
        codec: ProtocolCodec,
        received: Vec<ProtocolMessage>,
    }

    impl ProtocolMonitor for RecordingMonitor {
        fn read_transport_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
            self.transport.read_byte()
        }
        fn codec(&mut self) -> &mut ProtocolCodec {
            &mut self.codec
        }
        fn is_monitoring(&self) -> bool {
            true
        }
        fn process_message(&mut self, _: MessageHeader, message: ProtocolMessage) -> MonitorFlow {
            let flow = match message {
                ProtocolMessage::Halt { .. } => MonitorFlow::Stop,
                _ => MonitorFlow::Continue,
            };
            self.received.push(message);
            flow
        }
    }

    #[test]
    fn monitor_drops_stale_messages_and_stops_on_request() {
        let mut stream = Vec::new();
        stream.extend(ProtocolMessage::Arm { cookie: 1 }.encode(10).unwrap());
        stream.extend(ProtocolMessage::Arm { cookie: 2 }.encode(9).unwrap());
        stream.extend([0xde, 0xad]);
        stream.extend(ProtocolMessage::Halt { status: 0 }.encode(11).unwrap());
        stream.extend(ProtocolMessage::Arm { cookie: 3 }.encode(12).unwrap());

        let mut monitor = RecordingMonitor {
            transport: StreamTransport::new(ScriptedStream {
                input: Cursor::new(stream),
                output: Vec::new(),
            }),
            codec: ProtocolCodec::new(),
            received: Vec::new(),
        };
        assert!(monitor.start_monitor().is_ok());
        assert_eq!(
            monitor.received,
            vec![
                ProtocolMessage::Arm { cookie: 1 },
                ProtocolMessage::Halt { status: 0 }
            ]
        );
    }

    #[test]
    fn closed_stream_is_a_transport_error() {
        let mut transport = StreamTransport::new(ScriptedStream {
            input: Cursor::new(Vec::new()),
            output: Vec::new(),
        });
        assert_eq!(
            transport.read_byte(),
            Err(ProtocolError::Io(ErrorKind::UnexpectedEof))
        );
        let mut codec = ProtocolCodec::new();
        assert!(send_message(&mut transport, &mut codec, &ProtocolMessage::GetControlMode).is_ok());
        assert_eq!(transport.get_ref().output.len(), 8);
    }
}
