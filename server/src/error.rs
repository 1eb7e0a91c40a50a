//! Error taxonomy for the control server.
//!
//! Only [`ServerError`] ever leaves the library, and only during startup. Every
//! failure that happens while a session is live is expressed as a
//! [`DisconnectReason`] and handled by tearing that one session down.

use shared::{MacAddr, ProtocolError};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Why a session was removed from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectReason {
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("read failed ({0:?})")]
    ReadError(io::ErrorKind),
    #[error("write failed ({0:?})")]
    WriteError(io::ErrorKind),
    #[error("outbound backlog of {0} bytes not drained")]
    SlowConsumer(usize),
    #[error("nothing received for {0:?}")]
    TimedOut(Duration),
    #[error("invalid opcode 0x{opcode:02X} in {state} state")]
    ProtocolViolation { opcode: u8, state: &'static str },
    #[error("malformed frame: {0}")]
    MalformedFrame(ProtocolError),
    #[error("hardware address {0} is already logged in")]
    DuplicateMac(MacAddr),
    #[error("server is full")]
    ServerFull,
    #[error("server shutting down")]
    Shutdown,
}

impl DisconnectReason {
    /// Causes an operator should look at, as opposed to ordinary churn.
    pub fn is_abnormal(&self) -> bool {
        matches!(
            self,
            DisconnectReason::TimedOut(_)
                | DisconnectReason::ProtocolViolation { .. }
                | DisconnectReason::MalformedFrame(_)
                | DisconnectReason::DuplicateMac(_)
                | DisconnectReason::SlowConsumer(_)
        )
    }
}
