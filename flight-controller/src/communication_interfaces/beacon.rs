use std::time::{Duration, Instant};

use shared_definitions::protocol::messages::ProtocolMessage;

/// Discovery broadcast the aircraft repeats until a ground station acknowledges it.
pub struct Beacon {
    cookie: u32,
    period: Duration,
    last_sent: Option<Instant>,
    acknowledged: bool,
}

impl Beacon {
    pub fn new(cookie: u32, period: Duration) -> Self {
        Self {
            cookie,
            period,
            last_sent: None,
            acknowledged: false,
        }
    }

    pub fn cookie(&self) -> u32 {
        self.cookie
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// The beacon to send at `now`, if one is due.
    pub fn poll(&mut self, now: Instant) -> Option<ProtocolMessage> {
        if self.acknowledged {
            return None;
        }
        let due = match self.last_sent {
            Some(last_sent) => now.saturating_duration_since(last_sent) >= self.period,
            None => true,
        };
        if !due {
            return None;
        }
        self.last_sent = Some(now);
        Some(ProtocolMessage::Beacon {
            cookie: self.cookie,
        })
    }

    /// Only an ack carrying our cookie ends the broadcast.
    pub fn acknowledge(&mut self, cookie: u32) -> bool {
        if cookie == self.cookie {
            self.acknowledged = true;
        }
        self.acknowledged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_repeats_once_per_period() {
        let start = Instant::now();
        let mut beacon = Beacon::new(1, Duration::from_millis(1000));
        assert_eq!(beacon.poll(start), Some(ProtocolMessage::Beacon { cookie: 1 }));
        assert_eq!(beacon.poll(start + Duration::from_millis(999)), None);
        assert!(beacon.poll(start + Duration::from_millis(1000)).is_some());
    }

    #[test]
    fn matching_ack_stops_the_broadcast() {
        let start = Instant::now();
        let mut beacon = Beacon::new(1, Duration::ZERO);
        assert!(!beacon.acknowledge(2));
        assert!(beacon.poll(start).is_some());
        assert!(beacon.acknowledge(1));
        assert_eq!(beacon.poll(start + Duration::from_secs(5)), None);
        assert!(beacon.is_acknowledged());
    }
}
