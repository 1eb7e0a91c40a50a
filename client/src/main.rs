use clap::Parser;
use client::CtlClient;
use log::{info, warn};
use shared::MacAddr;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Adhoc control client: log in, join a group and list peers")]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:27312")]
    server: String,

    /// Hardware address to log in with
    #[arg(short = 'm', long, default_value = "02:00:00:00:00:01")]
    mac: MacAddr,

    /// Nickname shown to other players
    #[arg(short = 'n', long, default_value = "player")]
    nickname: String,

    /// Group (game room) to join
    #[arg(short = 'g', long, default_value = "LOBBY")]
    group: String,

    /// Number of scans before logging off
    #[arg(long, default_value = "5")]
    scans: u32,

    /// Delay between scans in milliseconds; a ping is sent in between
    #[arg(short = 'i', long, default_value = "2000")]
    interval_ms: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let interval = Duration::from_millis(args.interval_ms);

    info!("Connecting to: {}", args.server);
    let mut client = CtlClient::connect(&args.server, Duration::from_secs(5))?;
    client.login(args.mac, &args.nickname)?;
    client.join(&args.group)?;
    info!("Logged in as {} ({}), joined {}", args.nickname, args.mac, args.group);

    for round in 1..=args.scans {
        let peers = client.scan()?;
        println!("Scan {}: {} peer(s) in {}", round, peers.len(), args.group);
        for peer in &peers {
            println!("  {:<24} {}  {}", peer.nickname, peer.mac, peer.ip);
        }
        if round < args.scans {
            thread::sleep(interval / 2);
            if let Err(e) = client.ping() {
                warn!("Ping failed: {}", e);
                break;
            }
            thread::sleep(interval / 2);
        }
    }

    client.leave()?;
    info!("Left {}", args.group);
    Ok(())
}
