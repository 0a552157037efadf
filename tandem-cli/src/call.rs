use anyhow::{Context, Result, bail};
use colored::*;
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tandem_core::{ConnectionState, RoomId};
use tandem_peer::{
    DownloadDir, LocalBus, OpenedSession, Recorder, RoleLedger, RtcTransport, SessionConfig,
    SessionSetup, SignalingChannel, SyntheticSource, TransportConfig, open_session,
    transport_events,
};
use tandem_relay::RelayChannel;
use tracing::info;

#[derive(clap::Args)]
pub struct CallArgs {
    /// Room to meet in. A new one is generated when omitted.
    #[arg(long)]
    room: Option<String>,

    /// Signal through a relay (`ws://host:port`) instead of in-process.
    #[arg(long)]
    relay: Option<String>,

    /// Skip STUN and use host candidates only.
    #[arg(long)]
    local_only: bool,

    /// JSON file with session settings.
    #[arg(long)]
    session_config: Option<PathBuf>,

    /// Record the first peer's stream for this many seconds once connected.
    #[arg(long)]
    record_secs: Option<u64>,

    /// Where recordings are saved.
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Overwrite an existing recording without asking.
    #[arg(short, long)]
    yes: bool,

    #[arg(long, default_value_t = 20)]
    connect_timeout_secs: u64,
}

fn load_session_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid session config {}", path.display()))
}

async fn open_peer(
    name: &str,
    room: &RoomId,
    ledger: &RoleLedger,
    channel: &dyn SignalingChannel,
    config: &SessionConfig,
    transport_config: &TransportConfig,
) -> Result<OpenedSession> {
    let mut setup = SessionSetup::new(room.clone(), ledger.claim(room));
    setup.config = config.clone();

    let (tx, rx) = transport_events(config);
    let transport = RtcTransport::new(transport_config.clone(), tx)
        .await
        .with_context(|| format!("Failed to create transport for {}", name))?;

    let session = open_session(setup, &SyntheticSource::default(), channel, Arc::new(transport), rx)
        .await
        .with_context(|| format!("{} could not join room {}", name, room))?;

    println!(
        "   {} {} as {} ({} local tracks)",
        "→".cyan(),
        name.bold(),
        session.handle.role(),
        session.local_stream.tracks().len()
    );
    Ok(session)
}

pub async fn run(args: CallArgs) -> Result<()> {
    let room = args.room.map(RoomId::from).unwrap_or_default();
    let config = load_session_config(args.session_config.as_deref())?;
    let transport_config = if args.local_only {
        TransportConfig::local_only()
    } else {
        TransportConfig::default()
    };

    let channel: Box<dyn SignalingChannel> = match &args.relay {
        Some(url) => Box::new(RelayChannel::new(url.as_str())),
        None => Box::new(LocalBus::new()),
    };
    let ledger = RoleLedger::new();

    println!("{}", format!("📞 Calling in room {}", room).green().bold());

    let alice = open_peer("alice", &room, &ledger, channel.as_ref(), &config, &transport_config).await?;
    let bob = open_peer("bob", &room, &ledger, channel.as_ref(), &config, &transport_config).await?;

    let timeout = Duration::from_secs(args.connect_timeout_secs);
    for (name, session) in [("alice", &alice), ("bob", &bob)] {
        match session.handle.wait_for_state(ConnectionState::Connected, timeout).await {
            Some(ConnectionState::Connected) => {
                println!("   {} {} connected", "✔".green(), name.bold());
            }
            Some(state) => bail!("{} ended in state {:?}", name, state),
            None => bail!("{} did not connect within {:?}", name, timeout),
        }
    }

    for (name, session) in [("alice", &alice), ("bob", &bob)] {
        if let Some(remote) = session.handle.wait_for_remote_tracks(1, timeout).await {
            println!(
                "   {} {} receives stream {} with {} tracks",
                "✔".green(),
                name.bold(),
                remote.stream_id,
                remote.tracks.len()
            );
        }
    }

    if let Some(secs) = args.record_secs {
        record(&room, &alice, &args.out, secs, args.yes).await?;
    }

    alice.handle.dispose();
    bob.handle.dispose();
    alice.local_stream.stop();
    bob.local_stream.stop();

    println!("{}", "✨ Call finished".green().bold());
    Ok(())
}

async fn record(
    room: &RoomId,
    session: &OpenedSession,
    out: &Path,
    secs: u64,
    assume_yes: bool,
) -> Result<()> {
    let sink = DownloadDir::new(out);
    let target = sink.dir().join(room.recording_file_name());

    if target.exists() && !assume_yes {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", target.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("{}", "Recording skipped".yellow());
            return Ok(());
        }
    }

    let mut recorder = Recorder::new(room.clone(), Arc::new(sink));
    let recording = recorder.start(Some(&session.local_stream))?;
    println!("{}", format!("⏺  Recording for {}s...", secs).red().bold());
    info!("Recording {} started", recording.id());

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
        _ = tokio::signal::ctrl_c() => {
            recorder.reset();
            println!("{}", "Recording cancelled, nothing saved".yellow());
            return Ok(());
        }
    }

    match recorder.stop(&recording).await? {
        Some(artifact) => {
            println!("   {} {}", "📂 Saved:".cyan(), target.display());
            println!("   {} {} bytes ({})", "📦".cyan(), artifact.len(), artifact.mime_type);
            println!("   {} {}", "🔗".cyan(), artifact.reference);
        }
        None => println!("{}", "Nothing was recorded".yellow()),
    }
    Ok(())
}
