use tandem_core::{IceCandidateInfo, MediaTrack};

/// Connection health as reported by the transport itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events the transport raises for the negotiator's event loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A local ICE candidate was gathered and must be sent to the peer.
    CandidateGenerated(IceCandidateInfo),

    /// The peer's media started arriving on a new track.
    TrackArrived(MediaTrack),

    StateChanged(TransportState),
}
