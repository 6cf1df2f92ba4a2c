/// Outbound sequence numbers for one direction of the link.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    next_sequence: u16,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> u16 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        sequence
    }
}

/// Inbound staleness filter for one direction of the link.
///
/// A message is accepted when its sequence is not older than the last accepted one.
/// Once the last accepted sequence sits at `u16::MAX` anything is accepted, which lets
/// the sender's counter wrap back to zero.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    last_accepted: u16,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_accepted(&self) -> u16 {
        self.last_accepted
    }

    pub fn accept(&mut self, sequence: u16) -> bool {
        if sequence < self.last_accepted && self.last_accepted != u16::MAX {
            return false;
        }
        self.last_accepted = sequence;
        true
    }

    pub fn reset(&mut self) {
        self.last_accepted = 0;
    }
}
