//! Registry of every live session.
//!
//! The session manager is the only owner of [`Session`] values. Sessions are
//! keyed by a [`SessionId`] handed out in accept order, so iterating the map
//! visits sessions in the order they connected. Removing a session drops it,
//! which closes its socket and frees its buffers.

use crate::error::DisconnectReason;
use crate::session::{Session, SessionId};
use log::{info, warn};
use shared::MacAddr;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::Instant;

pub struct SessionManager<S> {
    /// Live sessions indexed by their accept-order id
    sessions: BTreeMap<SessionId, Session<S>>,
    /// Next id to hand out; ids are never reused
    next_session_id: u64,
    /// Maximum number of concurrent sessions allowed
    max_sessions: usize,
}

impl<S: Read + Write> SessionManager<S> {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_session_id: 1,
            max_sessions,
        }
    }

    /// Registers a freshly accepted connection in the awaiting-login state.
    ///
    /// Returns `None` (dropping the stream) when the server is at capacity.
    pub fn add_session(&mut self, stream: S, addr: SocketAddr, now: Instant) -> Option<SessionId> {
        if self.sessions.len() >= self.max_sessions {
            warn!(
                "Rejecting connection from {}: {}",
                addr,
                DisconnectReason::ServerFull
            );
            return None;
        }

        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        info!("Session {} connected from {}", id, addr);
        self.sessions.insert(id, Session::new(id, stream, addr, now));
        Some(id)
    }
}

impl<S> SessionManager<S> {
    /// Drops a session, closing its connection. Returns false if it was
    /// already gone.
    pub fn remove_session(&mut self, id: SessionId, reason: &DisconnectReason) -> bool {
        let Some(session) = self.sessions.remove(&id) else {
            return false;
        };
        let who = match session.identity() {
            Some(identity) => format!(
                "{} ({} - {} - {})",
                id,
                identity.nickname,
                identity.mac,
                session.remote_addr()
            ),
            None => format!("{} ({})", id, session.remote_addr()),
        };
        if reason.is_abnormal() {
            warn!("Session {} disconnected: {}", who, reason);
        } else {
            info!("Session {} disconnected: {}", who, reason);
        }
        true
    }

    pub fn get(&self, id: SessionId) -> Option<&Session<S>> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session<S>> {
        self.sessions.get_mut(&id)
    }

    /// Snapshot of the ids present right now, in accept order.
    ///
    /// A tick walks this snapshot instead of the live map, so removing the
    /// session being serviced never disturbs the visit of any other session.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session<S>> {
        self.sessions.values()
    }

    /// True if a logged-in session already presents `mac`.
    pub fn mac_in_use(&self, mac: &MacAddr) -> bool {
        self.iter()
            .filter_map(|session| session.identity())
            .any(|identity| identity.mac == *mac)
    }

    pub fn logged_in_count(&self) -> usize {
        self.iter().filter(|session| session.is_logged_in()).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes every session, e.g. at shutdown.
    pub fn clear(&mut self, reason: &DisconnectReason) {
        for id in self.ids() {
            self.remove_session(id, reason);
        }
    }
}
