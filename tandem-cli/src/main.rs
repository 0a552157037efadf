mod call;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use tandem_core::RoomId;
use tandem_relay::RelayConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Two-party media sessions over WebRTC")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh room id and print its route.
    Room {
        /// Print the id of an existing `/room/{id}` route instead.
        #[arg(long)]
        route: Option<String>,
    },

    /// Run the signaling relay.
    Relay {
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
    },

    /// Connect two local peers and optionally record the first one's stream.
    Call(call::CallArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Room { route } => {
            let room = match route {
                Some(route) => RoomId::from_route(&route)
                    .with_context(|| format!("'{}' is not a /room/{{id}} route", route))?,
                None => RoomId::new(),
            };
            println!("{} {}", "Room:".green().bold(), room);
            println!("{} {}", "Route:".cyan(), room.route());
            println!("{} {}", "Recording:".cyan(), room.recording_file_name());
        }

        Commands::Relay { bind } => {
            println!(
                "{}",
                format!("📡 Relay on ws://{}/room/{{roomId}}", bind).green().bold()
            );
            tandem_relay::serve(RelayConfig { bind_addr: bind }).await?;
        }

        Commands::Call(args) => call::run(args).await?,
    }

    Ok(())
}
