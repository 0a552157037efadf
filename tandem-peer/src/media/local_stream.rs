use std::sync::Arc;
use tandem_core::{MediaSample, MediaTrack};
use tokio::sync::{broadcast, watch};

const SAMPLE_BUFFER: usize = 512;

struct StreamInner {
    id: String,
    tracks: Vec<MediaTrack>,
    samples: broadcast::Sender<MediaSample>,
    ended: watch::Sender<bool>,
}

/// Live local audio/video stream.
///
/// Shared read-only between the display, the peer transport and the recorder: each consumer
/// calls [`LocalStream::subscribe`] and gets its own copy of every encoded unit produced after
/// that point. Cloning the handle does not duplicate the stream.
#[derive(Clone)]
pub struct LocalStream {
    inner: Arc<StreamInner>,
}

impl LocalStream {
    pub fn new(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        let (samples, _) = broadcast::channel(SAMPLE_BUFFER);
        let (ended, _) = watch::channel(false);

        Self {
            inner: Arc::new(StreamInner {
                id: id.into(),
                tracks,
                samples,
                ended,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.inner.tracks
    }

    pub fn has_tracks(&self) -> bool {
        !self.inner.tracks.is_empty()
    }

    /// Receive every encoded unit produced from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MediaSample> {
        self.inner.samples.subscribe()
    }

    /// Handle used by the capture side to feed encoded units into the stream.
    pub fn producer(&self) -> StreamProducer {
        StreamProducer {
            samples: self.inner.samples.clone(),
            ended: self.inner.ended.subscribe(),
        }
    }

    /// Stop every track. Producers observe it through [`StreamProducer::ended`].
    pub fn stop(&self) {
        self.inner.ended.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.inner.ended.borrow()
    }
}

impl std::fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStream")
            .field("id", &self.inner.id)
            .field("tracks", &self.inner.tracks)
            .finish()
    }
}

pub struct StreamProducer {
    samples: broadcast::Sender<MediaSample>,
    ended: watch::Receiver<bool>,
}

impl StreamProducer {
    /// Publish one encoded unit. Returns how many consumers will see it.
    pub fn push(&self, sample: MediaSample) -> usize {
        self.samples.send(sample).unwrap_or(0)
    }

    /// Resolves once the stream is stopped or every stream handle is gone.
    pub async fn ended(&mut self) {
        let _ = self.ended.wait_for(|stopped| *stopped).await;
    }
}
