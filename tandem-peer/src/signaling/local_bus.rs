use crate::signaling::{SignalingChannel, SignalingSubscription};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tandem_core::{RoomId, SignalMessage, SignalingError};
use tokio::sync::mpsc;
use tracing::{debug, info};

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<String>,
}

struct BusInner {
    scopes: DashMap<RoomId, Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn detach(&self, room: &RoomId, id: u64) {
        let now_empty = match self.scopes.get_mut(room) {
            Some(mut subscribers) => {
                subscribers.retain(|s| s.id != id);
                subscribers.is_empty()
            }
            None => false,
        };

        if now_empty {
            self.scopes.remove_if(room, |_, subscribers| subscribers.is_empty());
        }
    }
}

/// In-process signaling bus, the same-process equivalent of a browser `BroadcastChannel`.
///
/// Cheap to clone; every clone talks to the same set of scopes.
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                scopes: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Number of live subscribers attached to `room`.
    pub fn subscriber_count(&self, room: &RoomId) -> usize {
        self.inner
            .scopes
            .get(room)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingChannel for LocalBus {
    async fn subscribe(
        &self,
        room: &RoomId,
    ) -> Result<Box<dyn SignalingSubscription>, SignalingError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.inner
            .scopes
            .entry(room.clone())
            .or_default()
            .push(Subscriber { id, tx });

        info!("Subscriber {} attached to room {}", id, room);

        Ok(Box::new(LocalSubscription {
            id,
            room: room.clone(),
            bus: self.inner.clone(),
            rx,
            closed: false,
        }))
    }
}

pub struct LocalSubscription {
    id: u64,
    room: RoomId,
    bus: Arc<BusInner>,
    rx: mpsc::UnboundedReceiver<String>,
    closed: bool,
}

#[async_trait]
impl SignalingSubscription for LocalSubscription {
    async fn publish(&self, msg: &SignalMessage) -> Result<(), SignalingError> {
        if self.closed {
            return Err(SignalingError::Closed);
        }

        let json = msg.to_json()?;

        let Some(mut subscribers) = self.bus.scopes.get_mut(&self.room) else {
            return Ok(());
        };

        // Receivers that went away without closing are pruned on the way.
        subscribers.retain(|s| s.id == self.id || s.tx.send(json.clone()).is_ok());

        debug!(
            "Subscriber {} published '{}' to room {}",
            self.id,
            msg.kind(),
            self.room
        );
        Ok(())
    }

    async fn recv(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.bus.detach(&self.room, self.id);
        self.rx.close();
        info!("Subscriber {} detached from room {}", self.id, self.room);
    }
}

impl Drop for LocalSubscription {
    fn drop(&mut self) {
        if !self.closed {
            self.bus.detach(&self.room, self.id);
        }
    }
}
