use crate::transport::TransportEvent;
use serde::Serialize;
use tandem_core::{ConnectionState, MediaTrack, NegotiationError};

/// The peer's media as attached to the room view's remote sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteStream {
    pub stream_id: String,
    pub tracks: Vec<MediaTrack>,
}

impl RemoteStream {
    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == track_id)
    }
}

/// Notifications a session raises for the room view.
#[derive(Debug)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    RemoteStreamAttached(RemoteStream),
    RemoteTrackAdded(MediaTrack),
    /// A failure that ended the session.
    Failed(NegotiationError),
}

/// Everything the negotiator's single dispatch function reacts to.
#[derive(Debug)]
pub enum NegotiatorEvent {
    /// Raw text received on the signaling channel.
    Inbound(String),
    Transport(TransportEvent),
    /// Time to re-publish an unanswered offer.
    ResendOffer,
    /// The negotiation window closed.
    DeadlineElapsed,
}
