mod negotiator;
mod role_ledger;
mod session_config;
mod session_event;
mod session_handle;

pub use negotiator::*;
pub use role_ledger::*;
pub use session_config::*;
pub use session_event::*;
pub use session_handle::SessionHandle;

use crate::media::{LocalStream, MediaSource};
use crate::signaling::SignalingChannel;
use crate::transport::{PeerTransport, TransportEvent};
use std::sync::Arc;
use tandem_core::{MediaConstraints, NegotiationError, Role, RoomId};
use tokio::sync::mpsc;
use tracing::{error, info};

/// What a room view knows when it mounts.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub room: RoomId,
    pub role: Role,
    pub constraints: MediaConstraints,
    pub config: SessionConfig,
}

impl SessionSetup {
    pub fn new(room: RoomId, role: Role) -> Self {
        Self {
            room,
            role,
            constraints: MediaConstraints::default(),
            config: SessionConfig::default(),
        }
    }
}

/// A running session and the local stream it sends.
pub struct OpenedSession {
    pub handle: SessionHandle,
    pub local_stream: LocalStream,
}

/// Channel a transport reports on, sized from the session config.
pub fn transport_events(
    config: &SessionConfig,
) -> (mpsc::Sender<TransportEvent>, mpsc::Receiver<TransportEvent>) {
    mpsc::channel(config.transport_event_capacity.max(1))
}

/// Acquire local media, initialize a negotiator on `transport` and spawn its event loop.
///
/// Media failure aborts before anything is subscribed or attached.
pub async fn open_session(
    setup: SessionSetup,
    source: &dyn MediaSource,
    channel: &dyn SignalingChannel,
    transport: Arc<dyn PeerTransport>,
    transport_rx: mpsc::Receiver<TransportEvent>,
) -> Result<OpenedSession, NegotiationError> {
    let SessionSetup {
        room,
        role,
        constraints,
        config,
    } = setup;

    let local_stream = match source.acquire(constraints).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Media acquisition failed in room {}: {}", room, e);
            if let Err(close_err) = transport.close().await {
                error!("Failed to close unused transport: {:#}", close_err);
            }
            return Err(e.into());
        }
    };

    let (mut negotiator, handle) =
        SessionNegotiator::new(room.clone(), role, config, transport, transport_rx);

    if let Err(e) = negotiator.initialize(channel, &local_stream).await {
        error!("Failed to initialize session in room {}: {}", room, e);
        negotiator.dispose().await;
        local_stream.stop();
        return Err(e);
    }

    tokio::spawn(negotiator.run());
    info!("Session in room {} opened as {}", room, role);

    Ok(OpenedSession {
        handle,
        local_stream,
    })
}
