use clap::Parser;
use log::{error, info};
use server::config::{ServerConfig, DEFAULT_BACKLOG, DEFAULT_MAX_SESSIONS, DEFAULT_PORT};
use server::network::Server;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Adhoc control server: lobby and peer roster for handhelds")]
struct Args {
    /// IPv4 address to listen on
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: Ipv4Addr,
    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Listen backlog depth
    #[arg(short, long, default_value_t = DEFAULT_BACKLOG)]
    backlog: i32,
    /// Seconds of silence before a session is dropped
    #[arg(short, long, default_value = "15")]
    timeout: u64,
    /// Event loop tick in milliseconds
    #[arg(long, default_value = "1")]
    tick_ms: u64,
    /// Maximum concurrent sessions
    #[arg(short, long, default_value_t = DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            backlog: self.backlog,
            timeout: Duration::from_secs(self.timeout),
            tick: Duration::from_millis(self.tick_ms.max(1)),
            max_sessions: self.max_sessions,
        }
    }
}

/// Binds the listener and runs the event loop until Ctrl+C.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for connection logging");
    }

    let config = Args::parse().into_config();

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    server
        .run(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
                Err(e) => {
                    error!("Unable to listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;

    info!("Shutdown complete");
    Ok(())
}
