use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tandem_core::{MediaConstraints, MediaError, MediaTrack, TrackKind};
use tandem_peer::{LocalStream, MediaSource};

enum Outcome {
    Tracks(Vec<TrackKind>),
    Denied,
}

/// Media source with a scripted outcome.
#[derive(Clone)]
pub struct MockMediaSource {
    label: String,
    outcome: Arc<Outcome>,
    acquired: Arc<AtomicUsize>,
}

impl MockMediaSource {
    /// Camera and microphone.
    pub fn av(label: &str) -> Self {
        Self::with_tracks(label, vec![TrackKind::Audio, TrackKind::Video])
    }

    /// An empty `kinds` yields a stream without tracks.
    pub fn with_tracks(label: &str, kinds: Vec<TrackKind>) -> Self {
        Self {
            label: label.to_string(),
            outcome: Arc::new(Outcome::Tracks(kinds)),
            acquired: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The user refuses the permission prompt.
    pub fn denied() -> Self {
        Self {
            label: "denied".to_string(),
            outcome: Arc::new(Outcome::Denied),
            acquired: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// The stream this source hands out, built without going through `acquire`.
    pub fn stream(&self) -> LocalStream {
        let kinds = match self.outcome.as_ref() {
            Outcome::Tracks(kinds) => kinds.clone(),
            Outcome::Denied => Vec::new(),
        };
        let stream_id = format!("stream-{}", self.label);
        let tracks = kinds
            .into_iter()
            .map(|kind| MediaTrack::new(format!("{}-{}", self.label, kind), kind, &stream_id))
            .collect();
        LocalStream::new(stream_id, tracks)
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn acquire(&self, _constraints: MediaConstraints) -> Result<LocalStream, MediaError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        match self.outcome.as_ref() {
            Outcome::Denied => Err(MediaError::PermissionDenied("camera blocked".into())),
            Outcome::Tracks(_) => Ok(self.stream()),
        }
    }
}
