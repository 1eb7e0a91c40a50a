//! # Adhoc Control Server Library
//!
//! Coordination server for handhelds that cannot discover each other over a
//! wide-area network. Clients connect over TCP, log in with a nickname and
//! hardware address, join or leave named game groups, and ask for the roster
//! of their group so they can open direct peer links afterwards. The server
//! never relays game traffic; it only keeps session books and hands out
//! rosters.
//!
//! ## Architecture
//!
//! ### Single-Threaded Event Loop
//! Everything runs on one thread. Every socket is non-blocking, so a silent or
//! hostile peer can never stall the others. Each tick drains the accept
//! backlog and then services each session once, in the order sessions
//! connected. Ticks are paced by a tokio interval and a shutdown request is
//! only honoured between ticks.
//!
//! ### Fixed-Size Framing
//! Each frame starts with an opcode byte, and the pair (session state, opcode)
//! alone decides how many bytes the frame spans. Bytes accumulate in a
//! per-session receive buffer until the whole frame is there; partial frames
//! wait, and frames are taken strictly from the front.
//!
//! ### Failure Isolation
//! Anything that goes wrong with one session (hangup, I/O error, protocol
//! violation, silence past the timeout) removes that session and nothing
//! else. Only startup failures escape as [`error::ServerError`].
//!
//! ## Module Organization
//!
//! - `rx_buffer`: frame reassembly over a fixed receive buffer
//! - `session`: per-connection state and the login/group state machine
//! - `session_manager`: the registry owning every session
//! - `liveness`: silence-based dead peer detection
//! - `roster`: group membership queries for scan replies
//! - `lobby`: per-tick processing over the registry
//! - `network`: listener, accept loop and the async run loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default())?;
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod liveness;
pub mod lobby;
pub mod network;
pub mod roster;
pub mod rx_buffer;
pub mod session;
pub mod session_manager;

#[cfg(test)]
mod testing;
