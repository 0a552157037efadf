use async_trait::async_trait;
use tandem_core::{RoomId, SignalMessage, SignalingError};

/// Broadcast-style message bus scoped to a room, consumed by the negotiator.
///
/// Whatever implements it promises only this much: a message published by one subscriber
/// reaches every *other* subscriber currently attached to the same room, at most once, with no
/// ordering across senders and no replay for subscribers that attach later.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Attach to the room's scope.
    async fn subscribe(&self, room: &RoomId)
    -> Result<Box<dyn SignalingSubscription>, SignalingError>;
}

/// One participant's attachment to a room scope.
#[async_trait]
pub trait SignalingSubscription: Send + Sync {
    /// Send a message to every other subscriber of the scope.
    async fn publish(&self, msg: &SignalMessage) -> Result<(), SignalingError>;

    /// Next raw inbound message. `None` once the subscription is closed.
    ///
    /// Must be cancel safe: the negotiator polls it inside `tokio::select!`.
    async fn recv(&mut self) -> Option<String>;

    /// Detach from the scope. Safe to call more than once.
    async fn close(&mut self);
}
