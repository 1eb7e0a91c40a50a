//! End-to-end tests: a real server on loopback driven by real control clients.
//!
//! Frames from one connection are handled in order, so a scan reply proves
//! every earlier frame from that client was applied. Tests use that to
//! sequence actions across connections.

mod common;

use client::ClientError;
use common::{mac, TestServer};
use shared::{ClientPacket, LoginRecord, Nickname, OPCODE_LOGIN, OPCODE_SCAN};
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

/// LOGIN AND GROUP ROSTER TESTS
mod roster_tests {
    use super::*;

    /// Login, join, empty scan; a second member appears in the next scan.
    #[test]
    fn login_join_scan_roundtrip() {
        let server = TestServer::start();

        let mut first = server.member(1, "alice", "A");
        assert!(first.scan().unwrap().is_empty());

        let _second = server.member(2, "bob", "A");
        let peers = first.scan().unwrap();

        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].nickname.as_str(), "bob");
        assert_eq!(peers[0].mac, mac(2));
        assert_eq!(peers[0].ip, Ipv4Addr::LOCALHOST);
    }

    /// Scan never returns the requester or members of other groups.
    #[test]
    fn scan_is_scoped_to_group() {
        let server = TestServer::start();

        let mut a1 = server.member(1, "a1", "ROOMA");
        let _a2 = server.member(2, "a2", "ROOMA");
        let _b1 = server.member(3, "b1", "ROOMB");
        let _idle = server.logged_in(4, "lurker");

        let names: Vec<String> = a1
            .scan()
            .unwrap()
            .into_iter()
            .map(|p| p.nickname.to_string())
            .collect();
        assert_eq!(names, vec!["a2"]);
    }

    /// Leaving a group hides the member while its connection stays open.
    #[test]
    fn leave_group_removes_from_roster() {
        let server = TestServer::start();

        let _a = server.member(1, "a", "G1");
        let mut b = server.member(2, "b", "G1");
        let mut c = server.member(3, "c", "G1");
        assert_eq!(c.scan().unwrap().len(), 2);

        b.leave().unwrap();
        assert!(b.scan().unwrap().is_empty());

        let names: Vec<String> = c
            .scan()
            .unwrap()
            .into_iter()
            .map(|p| p.nickname.to_string())
            .collect();
        assert_eq!(names, vec!["a"]);

        // Still logged in and able to rejoin.
        b.join("G1").unwrap();
        assert_eq!(b.scan().unwrap().len(), 2);
    }

    /// Joining another group moves the member instead of adding a second one.
    #[test]
    fn join_switches_group() {
        let server = TestServer::start();

        let mut watcher = server.member(1, "watcher", "OLD");
        let mut mover = server.member(2, "mover", "OLD");
        assert_eq!(watcher.scan().unwrap().len(), 1);

        mover.join("NEW").unwrap();
        mover.scan().unwrap();
        assert!(watcher.scan().unwrap().is_empty());
    }

    /// A member that disconnects outright disappears from rosters.
    #[test]
    fn closed_connection_leaves_roster() {
        let server = TestServer::start();

        let mut stay = server.member(1, "stay", "G");
        let gone = server.member(2, "gone", "G");
        drop(gone);

        let mut empty = false;
        for _ in 0..100 {
            if stay.scan().unwrap().is_empty() {
                empty = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(empty);
    }
}

/// FRAMING AND PROTOCOL VIOLATION TESTS
mod protocol_tests {
    use super::*;

    /// A login trickled one byte at a time is accepted just like a whole one.
    #[test]
    fn bytewise_login_is_reassembled() {
        let server = TestServer::start();

        let frame = ClientPacket::Login(LoginRecord {
            mac: mac(1),
            nickname: Nickname::new("trickle").unwrap(),
        })
        .encode();

        let mut slow = server.client();
        for byte in frame {
            slow.send_raw(&[byte]).unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        slow.join("G").unwrap();
        slow.scan().unwrap();

        let mut observer = server.member(2, "observer", "G");
        let peers = observer.scan().unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].nickname.as_str(), "trickle");
    }

    /// Several frames written at once are all honoured, in order.
    #[test]
    fn pipelined_frames() {
        let server = TestServer::start();
        let _peer = server.member(2, "peer", "G");

        let mut client = server.client();
        let mut burst = ClientPacket::Login(LoginRecord {
            mac: mac(1),
            nickname: Nickname::new("burst").unwrap(),
        })
        .encode();
        burst.extend_from_slice(&[0x00, 0x02, b'G', 0, 0, 0, 0, 0, 0, 0]);
        client.send_raw(&burst).unwrap();

        let peers = client.scan().unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].nickname.as_str(), "peer");
    }

    /// Anything but login before logging in gets the connection closed.
    #[test]
    fn opcode_before_login_disconnects() {
        let server = TestServer::start();
        let mut client = server.client();
        client.send_raw(&[OPCODE_SCAN]).unwrap();
        assert!(client.wait_closed());
    }

    /// A second login on a logged-in session is a violation.
    #[test]
    fn login_after_login_disconnects() {
        let server = TestServer::start();
        let mut client = server.logged_in(1, "twice");
        client.send_raw(&[OPCODE_LOGIN]).unwrap();
        assert!(client.wait_closed());
    }

    /// Unknown opcodes are violations too.
    #[test]
    fn unknown_opcode_disconnects() {
        let server = TestServer::start();
        let mut client = server.logged_in(1, "odd");
        client.send_raw(&[0x7E]).unwrap();
        assert!(matches!(client.scan(), Err(ClientError::Closed) | Err(ClientError::Io(_))));
    }

    /// A violation by one client leaves everyone else untouched.
    #[test]
    fn violation_is_isolated() {
        let server = TestServer::start();
        let mut good = server.member(1, "good", "G");
        let mut bad = server.member(2, "bad", "G");

        bad.send_raw(&[0xEE]).unwrap();
        assert!(bad.wait_closed());
        assert!(good.scan().unwrap().is_empty());
    }

    /// Two sessions may not claim the same hardware address.
    #[test]
    fn duplicate_hardware_address_rejected() {
        let server = TestServer::start();
        let mut owner = server.member(1, "owner", "G");

        let mut imposter = server.client();
        imposter.login(mac(1), "imposter").unwrap();
        assert!(imposter.wait_closed());
        assert!(owner.scan().unwrap().is_empty());
    }
}

/// LIVENESS AND LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// A session that sends nothing is reaped after the timeout.
    #[test]
    fn silent_session_times_out() {
        let server = TestServer::with_timeout(Duration::from_millis(300));
        let mut silent = server.logged_in(1, "silent");
        thread::sleep(Duration::from_millis(600));
        assert!(silent.wait_closed());
    }

    /// Connections that never log in are reaped too.
    #[test]
    fn unauthenticated_session_times_out() {
        let server = TestServer::with_timeout(Duration::from_millis(300));
        let mut client = server.client();
        assert!(client.wait_closed());
    }

    /// Pings alone keep an otherwise idle session alive.
    #[test]
    fn ping_keeps_session_alive() {
        let server = TestServer::with_timeout(Duration::from_millis(300));
        let mut client = server.member(1, "pinger", "G");
        for _ in 0..10 {
            thread::sleep(Duration::from_millis(100));
            client.ping().unwrap();
        }
        assert!(client.scan().is_ok());
    }

    /// Stopping the server closes every open session.
    #[test]
    fn shutdown_closes_sessions() {
        let mut server = TestServer::start();
        let mut a = server.member(1, "a", "G");
        let mut b = server.client();

        server.stop();

        assert!(a.wait_closed());
        assert!(b.wait_closed());
        assert!(client::CtlClient::connect(server.addr, Duration::from_millis(200)).is_err());
    }
}
