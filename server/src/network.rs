//! Server network layer: the listening socket, connection intake and the
//! tick-driven event loop.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::lobby::Lobby;
use log::{debug, error, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::future::Future;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};

/// How often the loop reports session counts at debug level.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Main server coordinating connection intake and session processing.
pub struct Server {
    listener: TcpListener,
    lobby: Lobby<TcpStream>,
    config: ServerConfig,
}

impl Server {
    /// Creates the listening socket with address reuse and the configured
    /// backlog. Any failure here is fatal; no session exists yet.
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.listen_addr();
        let bind_err = |source: io::Error| ServerError::Bind { addr, source };

        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(config.backlog).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        let listener: TcpListener = socket.into();

        info!(
            "Listening for connections on TCP {} (backlog {})",
            listener.local_addr()?,
            config.backlog
        );

        Ok(Self {
            listener,
            lobby: Lobby::new(&config),
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn lobby(&self) -> &Lobby<TcpStream> {
        &self.lobby
    }

    /// Accepts every pending connection until the listener would block.
    pub fn accept_connections(&mut self, now: Instant) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        error!("Failed to make connection from {} non-blocking: {}", addr, e);
                        continue;
                    }
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to disable Nagle for {}: {}", addr, e);
                    }
                    self.lobby.admit(stream, addr, now);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Accept error: {}", e);
                    break;
                }
            }
        }
    }

    /// One full iteration: drain the accept backlog, then service sessions.
    pub fn tick(&mut self, now: Instant) {
        self.accept_connections(now);
        self.lobby.tick(now);
    }

    /// Runs ticks until `shutdown` resolves, then closes everything.
    ///
    /// A tick never awaits, so a shutdown request is only acted on between
    /// ticks.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats = interval(STATS_INTERVAL);
        stats.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Server started successfully");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = stats.tick() => {
                    let sessions = self.lobby.sessions();
                    debug!(
                        "{} sessions ({} logged in)",
                        sessions.len(),
                        sessions.logged_in_count()
                    );
                }
                _ = ticker.tick() => self.tick(Instant::now()),
            }
        }

        self.shutdown();
    }

    /// Closes the listener and force-closes all remaining sessions.
    pub fn shutdown(mut self) {
        let remaining = self.lobby.len();
        self.lobby.close_all();
        drop(self.listener);
        info!("Server stopped ({} sessions closed)", remaining);
    }
}
