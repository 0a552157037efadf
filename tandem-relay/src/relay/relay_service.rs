use axum::extract::ws::{Message, Utf8Bytes};
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::RoomId;
use tracing::{debug, warn};
use uuid::Uuid;

struct RelayPeer {
    id: Uuid,
    tx: tokio::sync::mpsc::UnboundedSender<Message>,
}

struct RelayInner {
    rooms: DashMap<RoomId, Vec<RelayPeer>>,
}

/// Shared relay state: which sockets are attached to which room.
///
/// Messages are not interpreted; text is forwarded as-is to every other peer in the room.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                rooms: DashMap::new(),
            }),
        }
    }

    pub fn add_peer(&self, room: RoomId, id: Uuid, tx: tokio::sync::mpsc::UnboundedSender<Message>) {
        self.inner
            .rooms
            .entry(room)
            .or_default()
            .push(RelayPeer { id, tx });
    }

    pub fn remove_peer(&self, room: &RoomId, id: Uuid) {
        self.inner.rooms.remove_if_mut(room, |_, peers| {
            peers.retain(|p| p.id != id);
            peers.is_empty()
        });
    }

    pub fn peer_count(&self, room: &RoomId) -> usize {
        self.inner.rooms.get(room).map(|p| p.len()).unwrap_or(0)
    }

    /// Forward `text` from `from` to every other peer in the room.
    pub fn forward(&self, room: &RoomId, from: Uuid, text: Utf8Bytes) -> usize {
        let Some(peers) = self.inner.rooms.get(room) else {
            warn!("Message for unknown room {}", room);
            return 0;
        };

        let mut delivered = 0;
        for peer in peers.iter().filter(|p| p.id != from) {
            if peer.tx.send(Message::Text(text.clone())).is_ok() {
                delivered += 1;
            }
        }

        debug!(
            "Relayed {} bytes in room {} to {} peers",
            text.len(),
            room,
            delivered
        );
        delivered
    }
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}
