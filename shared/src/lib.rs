//! Wire protocol shared by the adhoc control server and its clients.
//!
//! Every frame starts with a one-byte opcode and the opcode alone decides the
//! total frame size; there is no length field. All string fields are fixed
//! width and NUL padded.

use std::fmt;
use std::io::{self, Read};
use std::net::Ipv4Addr;
use thiserror::Error;

pub const OPCODE_PING: u8 = 0x00;
pub const OPCODE_LOGIN: u8 = 0x01;
pub const OPCODE_CONNECT: u8 = 0x02;
pub const OPCODE_DISCONNECT: u8 = 0x03;
pub const OPCODE_SCAN: u8 = 0x04;
pub const OPCODE_SCAN_COMPLETE: u8 = 0x05;

pub const ETHER_ADDR_LEN: usize = 6;
pub const NICKNAME_LEN: usize = 128;
pub const GROUP_NAME_LEN: usize = 8;
pub const IPV4_LEN: usize = 4;

/// `[opcode][mac][nickname]`
pub const LOGIN_FRAME_LEN: usize = 1 + ETHER_ADDR_LEN + NICKNAME_LEN;
/// `[opcode][group]`
pub const CONNECT_FRAME_LEN: usize = 1 + GROUP_NAME_LEN;
/// Ping, disconnect and scan requests carry no payload.
pub const BARE_FRAME_LEN: usize = 1;
/// `[opcode][nickname][mac][ipv4]`
pub const SCAN_ENTRY_FRAME_LEN: usize = 1 + NICKNAME_LEN + ETHER_ADDR_LEN + IPV4_LEN;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),
    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("invalid hardware address {0}")]
    InvalidMac(MacAddr),
    #[error("malformed hardware address {0:?}")]
    MalformedMac(String),
    #[error("invalid nickname")]
    InvalidNickname,
    #[error("invalid group name")]
    InvalidGroupName,
}

/// Hardware (ethernet) address of a handheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; ETHER_ADDR_LEN]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; ETHER_ADDR_LEN]);

    /// A usable device address is neither all-zero nor broadcast.
    pub fn is_assignable(&self) -> bool {
        self.0 != [0; ETHER_ADDR_LEN] && *self != Self::BROADCAST
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl std::str::FromStr for MacAddr {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError::MalformedMac(s.to_string());
        let mut bytes = [0u8; ETHER_ADDR_LEN];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(malformed)?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| malformed())?;
        }
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(MacAddr(bytes))
    }
}

/// Display name chosen by the player, at most `NICKNAME_LEN` bytes of UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nickname(String);

impl Nickname {
    pub fn new(name: &str) -> Result<Self, ProtocolError> {
        if name.is_empty() || name.len() > NICKNAME_LEN || name.contains('\0') {
            return Err(ProtocolError::InvalidNickname);
        }
        Ok(Self(name.to_string()))
    }

    fn from_field(field: &[u8]) -> Result<Self, ProtocolError> {
        let raw = trim_nul(field);
        let name = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidNickname)?;
        Self::new(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn write_field(&self, out: &mut Vec<u8>) {
        write_padded(out, self.0.as_bytes(), NICKNAME_LEN);
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a game room; ASCII alphanumerics only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(name: &str) -> Result<Self, ProtocolError> {
        if name.is_empty()
            || name.len() > GROUP_NAME_LEN
            || !name.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidGroupName);
        }
        Ok(Self(name.to_string()))
    }

    fn from_field(field: &[u8]) -> Result<Self, ProtocolError> {
        let raw = trim_nul(field);
        let name = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidGroupName)?;
        Self::new(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn trim_nul(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

fn write_padded(out: &mut Vec<u8>, value: &[u8], width: usize) {
    out.extend_from_slice(value);
    out.resize(out.len() + (width - value.len()), 0);
}

fn require(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        return Err(ProtocolError::Truncated {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

/// Payload of a login frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRecord {
    pub mac: MacAddr,
    pub nickname: Nickname,
}

impl LoginRecord {
    /// Decodes a complete login frame, opcode byte included.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        require(frame, LOGIN_FRAME_LEN)?;
        let mut mac = [0u8; ETHER_ADDR_LEN];
        mac.copy_from_slice(&frame[1..1 + ETHER_ADDR_LEN]);
        let mac = MacAddr(mac);
        if !mac.is_assignable() {
            return Err(ProtocolError::InvalidMac(mac));
        }
        let nickname = Nickname::from_field(&frame[1 + ETHER_ADDR_LEN..LOGIN_FRAME_LEN])?;
        Ok(Self { mac, nickname })
    }
}

/// Payload of a connect (join group) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRecord {
    pub group: GroupName,
}

impl ConnectRecord {
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        require(frame, CONNECT_FRAME_LEN)?;
        let group = GroupName::from_field(&frame[1..CONNECT_FRAME_LEN])?;
        Ok(Self { group })
    }
}

/// Frames a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    Ping,
    Login(LoginRecord),
    Connect(ConnectRecord),
    Disconnect,
    Scan,
}

impl ClientPacket {
    pub fn opcode(&self) -> u8 {
        match self {
            ClientPacket::Ping => OPCODE_PING,
            ClientPacket::Login(_) => OPCODE_LOGIN,
            ClientPacket::Connect(_) => OPCODE_CONNECT,
            ClientPacket::Disconnect => OPCODE_DISCONNECT,
            ClientPacket::Scan => OPCODE_SCAN,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.opcode()];
        match self {
            ClientPacket::Login(record) => {
                out.extend_from_slice(&record.mac.0);
                record.nickname.write_field(&mut out);
            }
            ClientPacket::Connect(record) => {
                write_padded(&mut out, record.group.as_str().as_bytes(), GROUP_NAME_LEN);
            }
            ClientPacket::Ping | ClientPacket::Disconnect | ClientPacket::Scan => {}
        }
        out
    }
}

/// One roster entry: a peer sharing the requester's group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub nickname: Nickname,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

/// Frames the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPacket {
    ScanEntry(PeerEntry),
    ScanComplete,
}

impl ServerPacket {
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            ServerPacket::ScanEntry(peer) => {
                out.push(OPCODE_SCAN);
                peer.nickname.write_field(out);
                out.extend_from_slice(&peer.mac.0);
                out.extend_from_slice(&peer.ip.octets());
            }
            ServerPacket::ScanComplete => out.push(OPCODE_SCAN_COMPLETE),
        }
    }

    /// Decodes one frame from the front of `buf`, returning it with its size.
    /// `Ok(None)` means more bytes are needed.
    pub fn decode(buf: &[u8]) -> Result<Option<(Self, usize)>, ProtocolError> {
        let Some(&opcode) = buf.first() else {
            return Ok(None);
        };
        match opcode {
            OPCODE_SCAN_COMPLETE => Ok(Some((ServerPacket::ScanComplete, BARE_FRAME_LEN))),
            OPCODE_SCAN => {
                if buf.len() < SCAN_ENTRY_FRAME_LEN {
                    return Ok(None);
                }
                let nick_end = 1 + NICKNAME_LEN;
                let mac_end = nick_end + ETHER_ADDR_LEN;
                let nickname = Nickname::from_field(&buf[1..nick_end])?;
                let mut mac = [0u8; ETHER_ADDR_LEN];
                mac.copy_from_slice(&buf[nick_end..mac_end]);
                let mut ip = [0u8; IPV4_LEN];
                ip.copy_from_slice(&buf[mac_end..SCAN_ENTRY_FRAME_LEN]);
                let peer = PeerEntry {
                    nickname,
                    mac: MacAddr(mac),
                    ip: Ipv4Addr::from(ip),
                };
                Ok(Some((ServerPacket::ScanEntry(peer), SCAN_ENTRY_FRAME_LEN)))
            }
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }

    /// Blocking read of exactly one frame.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut frame = [0u8; SCAN_ENTRY_FRAME_LEN];
        reader.read_exact(&mut frame[..1])?;
        let len = match frame[0] {
            OPCODE_SCAN => SCAN_ENTRY_FRAME_LEN,
            _ => BARE_FRAME_LEN,
        };
        reader.read_exact(&mut frame[1..len])?;
        match Self::decode(&frame[..len]) {
            Ok(Some((packet, _))) => Ok(packet),
            Ok(None) => Err(io::ErrorKind::UnexpectedEof.into()),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}
