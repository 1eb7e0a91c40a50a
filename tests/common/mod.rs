//! Shared harness: a real server on a loopback ephemeral port.

#![allow(dead_code)]

use client::CtlClient;
use server::config::ServerConfig;
use server::network::Server;
use shared::MacAddr;
use std::net::{Ipv4Addr, SocketAddr};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::with_timeout(Duration::from_secs(15))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ServerConfig {
            host: Ipv4Addr::LOCALHOST,
            port: 0,
            timeout,
            ..ServerConfig::default()
        };
        let server = Server::bind(config).expect("bind test server");
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(server.run(async {
                let _ = rx.await;
            }));
        });

        Self {
            addr,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn client(&self) -> CtlClient {
        CtlClient::connect(self.addr, Duration::from_secs(3)).expect("connect to test server")
    }

    /// Connects and logs in; the returned client has had one round trip, so
    /// the login is known to be processed.
    pub fn logged_in(&self, n: u8, name: &str) -> CtlClient {
        let mut client = self.client();
        client.login(mac(n), name).unwrap();
        client.scan().unwrap();
        client
    }

    /// Logs in and joins `group`, synchronised like [`TestServer::logged_in`].
    pub fn member(&self, n: u8, name: &str, group: &str) -> CtlClient {
        let mut client = self.client();
        client.login(mac(n), name).unwrap();
        client.join(group).unwrap();
        client.scan().unwrap();
        client
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn mac(n: u8) -> MacAddr {
    MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, n])
}
