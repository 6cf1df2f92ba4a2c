use shared_definitions::protocol::error::ProtocolError;

/// A source of remote commands for the aircraft.
pub trait RemoteControl {
    /// Blocks while commands keep arriving, returns once the link is told to stop or fails.
    fn start_changes_monitor(&mut self) -> Result<(), ProtocolError>;
}
