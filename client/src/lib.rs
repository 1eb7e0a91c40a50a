//! # Adhoc Control Client
//!
//! Blocking client for the adhoc control protocol. It logs a handheld in,
//! joins and leaves groups, keeps the session alive with pings and fetches
//! group rosters. Used by the `client` binary for manual testing and by the
//! workspace integration tests.

use log::debug;
use shared::{
    ClientPacket, ConnectRecord, GroupName, LoginRecord, MacAddr, Nickname, PeerEntry,
    ProtocolError, ServerPacket,
};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("server closed the connection")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ClientError>;

pub struct CtlClient {
    stream: TcpStream,
    server_addr: SocketAddr,
}

impl CtlClient {
    /// Opens a connection; nothing is sent until [`CtlClient::login`].
    pub fn connect<A: ToSocketAddrs>(addr: A, read_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_nodelay(true)?;
        let server_addr = stream.peer_addr()?;
        Ok(Self {
            stream,
            server_addr,
        })
    }

    pub fn login(&mut self, mac: MacAddr, nickname: &str) -> Result<()> {
        let packet = ClientPacket::Login(LoginRecord {
            mac,
            nickname: Nickname::new(nickname)?,
        });
        self.send(&packet)
    }

    pub fn ping(&mut self) -> Result<()> {
        self.send(&ClientPacket::Ping)
    }

    pub fn join(&mut self, group: &str) -> Result<()> {
        let packet = ClientPacket::Connect(ConnectRecord {
            group: GroupName::new(group)?,
        });
        self.send(&packet)
    }

    pub fn leave(&mut self) -> Result<()> {
        self.send(&ClientPacket::Disconnect)
    }

    /// Requests the roster of the current group and waits for all of it.
    pub fn scan(&mut self) -> Result<Vec<PeerEntry>> {
        self.send(&ClientPacket::Scan)?;
        let mut peers = Vec::new();
        loop {
            match ServerPacket::read_from(&mut self.stream) {
                Ok(ServerPacket::ScanEntry(peer)) => peers.push(peer),
                Ok(ServerPacket::ScanComplete) => return Ok(peers),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(ClientError::Closed)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Writes arbitrary bytes, for exercising the server with malformed or
    /// fragmented input.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }

    /// Waits until the server drops the connection. Returns false if the
    /// read timeout passes first or unexpected data arrives.
    pub fn wait_closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) => !matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut),
        }
    }

    fn send(&mut self, packet: &ClientPacket) -> Result<()> {
        debug!("Sending opcode 0x{:02X} to {}", packet.opcode(), self.server_addr);
        self.send_raw(&packet.encode())
    }
}
