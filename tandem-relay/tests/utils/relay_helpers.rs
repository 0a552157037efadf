use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tandem_core::{RoomId, SignalMessage};
use tandem_peer::{SignalingChannel, SignalingSubscription};
use tandem_relay::{RelayChannel, RelayService, serve_on};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Timeout for a relayed message to arrive (ms).
pub const RELAY_TIMEOUT_MS: u64 = 2000;

/// A relay running on an ephemeral local port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub service: RelayService,
    server: JoinHandle<()>,
}

impl TestRelay {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test listener")?;
        let addr = listener.local_addr()?;
        let service = RelayService::new();

        let server = tokio::spawn({
            let service = service.clone();
            async move {
                if let Err(e) = serve_on(listener, service).await {
                    tracing::error!("[TestRelay] server error: {:#}", e);
                }
            }
        });

        Ok(Self {
            addr,
            service,
            server,
        })
    }

    pub fn channel(&self) -> RelayChannel {
        RelayChannel::new(format!("ws://{}", self.addr))
    }

    /// Wait until `count` sockets are attached to `room`.
    pub async fn wait_for_peers(&self, room: &RoomId, count: usize) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(RELAY_TIMEOUT_MS);
        while self.service.peer_count(room) != count {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!(
                    "Room {} has {} peers, expected {}",
                    room,
                    self.service.peer_count(room),
                    count
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Subscribe and wait until the relay has registered the socket.
pub async fn join(
    relay: &TestRelay,
    room: &RoomId,
    expected_peers: usize,
) -> Result<Box<dyn SignalingSubscription>> {
    let sub = relay.channel().subscribe(room).await?;
    relay.wait_for_peers(room, expected_peers).await?;
    Ok(sub)
}

pub async fn recv_message(sub: &mut Box<dyn SignalingSubscription>) -> Result<SignalMessage> {
    let text = tokio::time::timeout(Duration::from_millis(RELAY_TIMEOUT_MS), sub.recv())
        .await
        .context("Timeout waiting for relayed message")?
        .context("Relay subscription closed")?;
    Ok(SignalMessage::from_json(&text)?)
}
