//! Dead-peer detection based on the last time a session delivered any bytes.

use crate::error::DisconnectReason;
use crate::session::Session;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct LivenessMonitor {
    timeout: Duration,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Fails a session that has been silent for longer than the timeout,
    /// whatever its state and however healthy its socket.
    pub fn check<S>(&self, session: &Session<S>, now: Instant) -> Result<(), DisconnectReason> {
        let idle = session.idle_for(now);
        if idle > self.timeout {
            return Err(DisconnectReason::TimedOut(idle));
        }
        Ok(())
    }
}
