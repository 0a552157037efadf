use crate::session::{RemoteStream, SessionEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tandem_core::{ConnectionState, Role, RoomId};
use tokio::sync::{mpsc, watch};
use tracing::info;

pub(crate) enum Control {
    Dispose,
}

/// The room view's grip on a running negotiator.
///
/// Dropping the handle is the same as unmounting the view: the session is disposed.
pub struct SessionHandle {
    room: RoomId,
    role: Role,
    alive: Arc<AtomicBool>,
    control_tx: mpsc::Sender<Control>,
    state_rx: watch::Receiver<ConnectionState>,
    remote_rx: watch::Receiver<Option<RemoteStream>>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionHandle {
    pub(crate) fn new(
        room: RoomId,
        role: Role,
        alive: Arc<AtomicBool>,
        control_tx: mpsc::Sender<Control>,
        state_rx: watch::Receiver<ConnectionState>,
        remote_rx: watch::Receiver<Option<RemoteStream>>,
        events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Self {
        Self {
            room,
            role,
            alive,
            control_tx,
            state_rx,
            remote_rx,
            events_rx,
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn remote_stream(&self) -> Option<RemoteStream> {
        self.remote_rx.borrow().clone()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Wait until the session reaches `target` or closes.
    ///
    /// Returns the state it settled in, or `None` if neither happened within `timeout`.
    pub async fn wait_for_state(
        &self,
        target: ConnectionState,
        timeout: Duration,
    ) -> Option<ConnectionState> {
        let mut rx = self.state_rx.clone();
        let reached = tokio::time::timeout(timeout, async move {
            rx.wait_for(|s| *s == target || s.is_closed())
                .await
                .map(|state| *state)
                .unwrap_or(ConnectionState::Closed)
        })
        .await;
        reached.ok()
    }

    /// Wait until the remote stream carries at least `count` tracks.
    pub async fn wait_for_remote_tracks(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Option<RemoteStream> {
        let mut rx = self.remote_rx.clone();
        let attached = tokio::time::timeout(timeout, async move {
            rx.wait_for(|remote| remote.as_ref().is_some_and(|r| r.tracks.len() >= count))
                .await
                .ok()
                .and_then(|remote| remote.clone())
        })
        .await;
        attached.ok().flatten()
    }

    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Tear the session down. Completions still in flight become no-ops from this point on.
    pub fn dispose(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            info!("Disposing session in room {}", self.room);
        }
        let _ = self.control_tx.try_send(Control::Dispose);
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}
