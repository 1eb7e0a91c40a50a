//! Per-tick session processing, independent of how connections are accepted.
//!
//! Each tick every registered session gets, in registry order:
//! 1. a liveness check against the silence accumulated before this tick,
//! 2. at most one non-blocking read,
//! 3. at most one complete frame interpreted by the state machine,
//! 4. a non-blocking flush of any queued output.
//!
//! Any step may fail with a [`DisconnectReason`]; the session is then removed
//! before the next one is serviced. Failures never leave the lobby.

use crate::config::ServerConfig;
use crate::error::DisconnectReason;
use crate::liveness::LivenessMonitor;
use crate::roster::{group_roster, group_size};
use crate::session::{Frame, SessionId};
use crate::session_manager::SessionManager;
use log::{debug, info};
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::Instant;

pub struct Lobby<S> {
    sessions: SessionManager<S>,
    liveness: LivenessMonitor,
}

impl<S: Read + Write> Lobby<S> {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            sessions: SessionManager::new(config.max_sessions),
            liveness: LivenessMonitor::new(config.timeout),
        }
    }

    pub fn admit(&mut self, stream: S, addr: SocketAddr, now: Instant) -> Option<SessionId> {
        self.sessions.add_session(stream, addr, now)
    }

    /// Services every session once. Returns the sessions removed this tick
    /// and why.
    pub fn tick(&mut self, now: Instant) -> Vec<(SessionId, DisconnectReason)> {
        let mut removed = Vec::new();
        for id in self.sessions.ids() {
            if let Err(reason) = self.service(id, now) {
                self.sessions.remove_session(id, &reason);
                removed.push((id, reason));
            }
        }
        removed
    }

    fn service(&mut self, id: SessionId, now: Instant) -> Result<(), DisconnectReason> {
        let frame = {
            let Some(session) = self.sessions.get_mut(id) else {
                return Ok(());
            };
            self.liveness.check(session, now)?;
            session.receive(now)?;
            session.next_frame()?
        };

        if let Some(frame) = frame {
            self.apply(id, frame)?;
        }

        match self.sessions.get_mut(id) {
            Some(session) => session.flush(),
            None => Ok(()),
        }
    }

    /// Carries out the effect of one validated frame.
    fn apply(&mut self, id: SessionId, frame: Frame) -> Result<(), DisconnectReason> {
        match frame {
            Frame::Login(record) => {
                if self.sessions.mac_in_use(&record.mac) {
                    return Err(DisconnectReason::DuplicateMac(record.mac));
                }
                if let Some(session) = self.sessions.get_mut(id) {
                    session.login(record);
                    if let Some(identity) = session.identity() {
                        info!(
                            "Session {} logged in as {} ({} - {})",
                            id, identity.nickname, identity.mac, identity.ip
                        );
                    }
                }
            }
            Frame::Ping => debug!("Session {} ping", id),
            Frame::Connect(group) => {
                if let Some(session) = self.sessions.get_mut(id) {
                    session.join(group.clone());
                }
                info!(
                    "Session {} joined group {} ({} members)",
                    id,
                    group,
                    group_size(&self.sessions, &group)
                );
            }
            Frame::Disconnect => {
                if let Some(group) = self.sessions.get_mut(id).and_then(|s| s.leave()) {
                    info!("Session {} left group {}", id, group);
                }
            }
            Frame::Scan => {
                let peers = match self.sessions.get(id).and_then(|s| s.group()) {
                    Some(group) => group_roster(&self.sessions, group, id),
                    None => Vec::new(),
                };
                debug!("Session {} scan: {} peers", id, peers.len());
                if let Some(session) = self.sessions.get_mut(id) {
                    session.queue_roster(&peers);
                }
            }
        }
        Ok(())
    }
}

impl<S> Lobby<S> {
    pub fn sessions(&self) -> &SessionManager<S> {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Force-closes every remaining session.
    pub fn close_all(&mut self) {
        self.sessions.clear(&DisconnectReason::Shutdown);
    }
}
