use chrono::{DateTime, Duration, Utc};

/// Debounces forwarding of samples to the durable metrics sink.
///
/// Every sample is forwarded while the car is moving; at rest, writes are
/// suppressed until the idle timeout elapses so the sink still gets a
/// heartbeat during prolonged parking.
#[derive(Clone, Debug)]
pub struct PersistenceGate {
    idle_timeout: Duration,
    last_forward: Option<DateTime<Utc>>,
}

impl PersistenceGate {
    pub fn new(idle_timeout: Duration) -> Self {
        PersistenceGate {
            idle_timeout,
            last_forward: None,
        }
    }

    /// Decide whether the current sample goes to the sink. A true result
    /// records `now` as the last forward instant.
    pub fn should_forward(&mut self, moving: bool, now: DateTime<Utc>) -> bool {
        let due = match self.last_forward {
            // Nothing written yet this process lifetime.
            None => true,
            Some(last) => now.signed_duration_since(last) > self.idle_timeout,
        };
        if moving || due {
            self.last_forward = Some(now);
            return true;
        }
        false
    }

    pub fn last_forward(&self) -> Option<DateTime<Utc>> {
        self.last_forward
    }
}
