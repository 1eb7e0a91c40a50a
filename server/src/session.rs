//! Server-side state for one connected handheld and the login/group state
//! machine that drives it.
//!
//! A session starts in [`SessionState::AwaitingLogin`]. The only way out is a
//! valid login frame, which installs the peer's [`Identity`] and moves it to
//! [`SessionState::LoggedIn`]. Identity lives inside the logged-in state, so a
//! session has an identity exactly when it is logged in, and nothing can
//! replace it afterwards. Group membership is data carried by the logged-in
//! state, not a state of its own.

use crate::error::DisconnectReason;
use crate::rx_buffer::RxBuffer;
use log::debug;
use shared::{
    ConnectRecord, GroupName, LoginRecord, MacAddr, Nickname, PeerEntry, ServerPacket,
    BARE_FRAME_LEN, CONNECT_FRAME_LEN, LOGIN_FRAME_LEN, OPCODE_CONNECT, OPCODE_DISCONNECT,
    OPCODE_LOGIN, OPCODE_PING, OPCODE_SCAN,
};
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

/// Outbound bytes a peer may leave unread before it is dropped.
pub const TX_CAPACITY: usize = 1 << 20;

/// Stable registry key, assigned in accept order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who a logged-in peer is, as advertised to the rest of its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub mac: MacAddr,
    pub nickname: Nickname,
    /// Address other peers use to reach this handheld directly.
    pub ip: Ipv4Addr,
}

impl Identity {
    pub fn peer_entry(&self) -> PeerEntry {
        PeerEntry {
            nickname: self.nickname.clone(),
            mac: self.mac,
            ip: self.ip,
        }
    }
}

#[derive(Debug)]
pub enum SessionState {
    AwaitingLogin,
    LoggedIn {
        identity: Identity,
        group: Option<GroupName>,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::AwaitingLogin => "awaiting-login",
            SessionState::LoggedIn { .. } => "logged-in",
        }
    }

    /// Total size of the frame `opcode` starts, or `None` when the opcode is
    /// not acceptable in this state.
    fn frame_len(&self, opcode: u8) -> Option<usize> {
        match (self, opcode) {
            (SessionState::AwaitingLogin, OPCODE_LOGIN) => Some(LOGIN_FRAME_LEN),
            (SessionState::LoggedIn { .. }, OPCODE_PING | OPCODE_DISCONNECT | OPCODE_SCAN) => {
                Some(BARE_FRAME_LEN)
            }
            (SessionState::LoggedIn { .. }, OPCODE_CONNECT) => Some(CONNECT_FRAME_LEN),
            _ => None,
        }
    }
}

/// A complete, validated request taken off the front of the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Login(LoginRecord),
    Ping,
    Connect(GroupName),
    Disconnect,
    Scan,
}

pub struct Session<S> {
    id: SessionId,
    stream: S,
    remote_addr: SocketAddr,
    state: SessionState,
    rx: RxBuffer,
    tx: Vec<u8>,
    last_recv: Instant,
}

impl<S: Read + Write> Session<S> {
    pub fn new(id: SessionId, stream: S, remote_addr: SocketAddr, now: Instant) -> Self {
        Self {
            id,
            stream,
            remote_addr,
            state: SessionState::AwaitingLogin,
            rx: RxBuffer::new(),
            tx: Vec::new(),
            last_recv: now,
        }
    }

    /// Attempts one non-blocking read. Returns the number of bytes taken in;
    /// zero when the peer had nothing for us or the buffer is already full.
    pub fn receive(&mut self, now: Instant) -> Result<usize, DisconnectReason> {
        if self.rx.is_full() {
            return Ok(0);
        }
        match self.rx.fill_from(&mut self.stream) {
            Ok(0) => Err(DisconnectReason::PeerClosed),
            Ok(n) => {
                self.refresh(now);
                Ok(n)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                Ok(0)
            }
            Err(e) => Err(DisconnectReason::ReadError(e.kind())),
        }
    }

    fn refresh(&mut self, now: Instant) {
        if now > self.last_recv {
            self.last_recv = now;
        }
    }

    /// Takes the oldest frame off the receive buffer if it has fully arrived.
    ///
    /// An opcode that is not valid for the current state is rejected as soon
    /// as its first byte is seen. A valid opcode whose payload is still in
    /// flight yields `Ok(None)` and stays buffered.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, DisconnectReason> {
        let Some(opcode) = self.rx.opcode() else {
            return Ok(None);
        };
        let size = self
            .state
            .frame_len(opcode)
            .ok_or_else(|| DisconnectReason::ProtocolViolation {
                opcode,
                state: self.state.name(),
            })?;
        let Some(bytes) = self.rx.frame(size) else {
            return Ok(None);
        };
        let frame = match opcode {
            OPCODE_LOGIN => {
                Frame::Login(LoginRecord::decode(bytes).map_err(DisconnectReason::MalformedFrame)?)
            }
            OPCODE_CONNECT => Frame::Connect(
                ConnectRecord::decode(bytes)
                    .map_err(DisconnectReason::MalformedFrame)?
                    .group,
            ),
            OPCODE_DISCONNECT => Frame::Disconnect,
            OPCODE_SCAN => Frame::Scan,
            _ => Frame::Ping,
        };
        self.rx.consume(size);
        Ok(Some(frame))
    }

    /// Completes the `AwaitingLogin -> LoggedIn` transition.
    ///
    /// The advertised address is the peer address of the accepted connection.
    pub fn login(&mut self, record: LoginRecord) {
        if !matches!(self.state, SessionState::AwaitingLogin) {
            return;
        }
        let ip = match self.remote_addr.ip() {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(ip) => ip.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
        };
        self.state = SessionState::LoggedIn {
            identity: Identity {
                mac: record.mac,
                nickname: record.nickname,
                ip,
            },
            group: None,
        };
    }

    /// Moves the session into `group`, leaving any previous one.
    pub fn join(&mut self, new_group: GroupName) {
        if let SessionState::LoggedIn { group, .. } = &mut self.state {
            *group = Some(new_group);
        }
    }

    pub fn leave(&mut self) -> Option<GroupName> {
        match &mut self.state {
            SessionState::LoggedIn { group, .. } => group.take(),
            SessionState::AwaitingLogin => None,
        }
    }

    /// Appends a full roster reply (entries then the completion marker).
    pub fn queue_roster(&mut self, peers: &[PeerEntry]) {
        for peer in peers {
            ServerPacket::ScanEntry(peer.clone()).encode_into(&mut self.tx);
        }
        ServerPacket::ScanComplete.encode_into(&mut self.tx);
    }

    /// Writes as much queued output as the socket takes without blocking.
    pub fn flush(&mut self) -> Result<(), DisconnectReason> {
        while !self.tx.is_empty() {
            match self.stream.write(&self.tx) {
                Ok(0) => return Err(DisconnectReason::WriteError(io::ErrorKind::WriteZero)),
                Ok(n) => {
                    self.tx.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(DisconnectReason::WriteError(e.kind())),
            }
        }
        if self.tx.len() > TX_CAPACITY {
            return Err(DisconnectReason::SlowConsumer(self.tx.len()));
        }
        if !self.tx.is_empty() {
            debug!("Session {} has {} bytes pending", self.id, self.tx.len());
        }
        Ok(())
    }
}

impl<S> Session<S> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn { .. })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::LoggedIn { identity, .. } => Some(identity),
            SessionState::AwaitingLogin => None,
        }
    }

    pub fn group(&self) -> Option<&GroupName> {
        match &self.state {
            SessionState::LoggedIn { group, .. } => group.as_ref(),
            SessionState::AwaitingLogin => None,
        }
    }

    #[cfg(test)]
    pub fn last_recv(&self) -> Instant {
        self.last_recv
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_recv)
    }

    #[cfg(test)]
    pub fn has_buffered_input(&self) -> bool {
        !self.rx.is_empty()
    }

    #[cfg(test)]
    pub fn pending_output(&self) -> usize {
        self.tx.len()
    }
}
