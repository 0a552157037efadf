use crate::model::TrackKind;
use std::time::Duration;
use thiserror::Error;

/// Local camera/microphone could not be opened.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no {0} device available")]
    DeviceUnavailable(TrackKind),

    #[error("stream carries no tracks")]
    NoTracks,
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("malformed signaling message: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("signaling channel closed")]
    Closed,

    #[error("signaling transport failure: {0}")]
    Transport(String),
}

/// Which rule of the offer/answer exchange an inbound message broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateViolation {
    /// Answer arrived but this side never sent an offer.
    AnswerWithoutOffer,
    /// Answer arrived after a remote description was already applied.
    DuplicateAnswer,
    /// The initiator received an offer.
    OfferToInitiator,
    /// A second, different offer arrived after one was answered.
    ConflictingOffer,
}

impl std::fmt::Display for StateViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StateViolation::AnswerWithoutOffer => "answer received with no pending offer",
            StateViolation::DuplicateAnswer => "answer received twice",
            StateViolation::OfferToInitiator => "offer received by the initiator",
            StateViolation::ConflictingOffer => "second offer received after answering",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("media acquisition failed: {0}")]
    MediaAcquisitionFailed(#[from] MediaError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error("invalid negotiation state: {0}")]
    InvalidState(StateViolation),

    #[error("negotiation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("transport failure: {0:#}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("no active stream to record")]
    NoActiveStream,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("capture task failed: {0}")]
    Capture(String),

    #[error("failed to deliver recording: {0}")]
    Delivery(#[from] std::io::Error),
}
