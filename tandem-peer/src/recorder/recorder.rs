use crate::media::LocalStream;
use crate::recorder::{Artifact, ArtifactSink};
use bytes::Bytes;
use std::sync::Arc;
use tandem_core::{MediaSample, RecorderError, RecordingStatus, RoomId};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Ticket for one recording started by [`Recorder::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    id: Uuid,
    stream_id: String,
}

impl RecordingSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }
}

struct Capture {
    session: RecordingSession,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Vec<Bytes>>,
}

/// Records a live local stream into a single downloadable file.
///
/// The capture task owns the chunk buffer while recording. On stop the buffer moves into the
/// produced [`Artifact`] and nothing is kept behind.
pub struct Recorder {
    room: RoomId,
    sink: Arc<dyn ArtifactSink>,
    status: RecordingStatus,
    capture: Option<Capture>,
}

impl Recorder {
    pub fn new(room: RoomId, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            room,
            sink,
            status: RecordingStatus::Idle,
            capture: None,
        }
    }

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    pub fn is_recording(&self) -> bool {
        self.status == RecordingStatus::Recording
    }

    pub fn start(&mut self, stream: Option<&LocalStream>) -> Result<RecordingSession, RecorderError> {
        let Some(stream) = stream.filter(|s| s.has_tracks()) else {
            warn!("Cannot record in room {}: no active stream", self.room);
            return Err(RecorderError::NoActiveStream);
        };
        if self.status == RecordingStatus::Recording {
            return Err(RecorderError::AlreadyRecording);
        }

        // Subscribe before returning so no unit produced after start is missed.
        let samples = stream.subscribe();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(capture(samples, stop_rx));

        let session = RecordingSession {
            id: Uuid::new_v4(),
            stream_id: stream.id().to_owned(),
        };
        self.capture = Some(Capture {
            session: session.clone(),
            stop_tx,
            task,
        });
        self.status = RecordingStatus::Recording;

        info!(
            "Recording stream {} in room {} ({})",
            session.stream_id, self.room, session.id
        );
        Ok(session)
    }

    /// Finalize `session` and deliver it. Returns `None` when nothing was being recorded.
    pub async fn stop(
        &mut self,
        session: &RecordingSession,
    ) -> Result<Option<Artifact>, RecorderError> {
        if self.status != RecordingStatus::Recording {
            debug!("Stop ignored in room {}: status {:?}", self.room, self.status);
            return Ok(None);
        }
        let Some(capture) = self.capture.take_if(|c| c.session == *session) else {
            warn!("Stop ignored: {} is not the active recording", session.id);
            return Ok(None);
        };

        self.status = RecordingStatus::Finalizing;
        let _ = capture.stop_tx.send(());

        let units = match capture.task.await {
            Ok(units) => units,
            Err(e) => {
                self.status = RecordingStatus::Done;
                return Err(RecorderError::Capture(e.to_string()));
            }
        };

        let count = units.len();
        let artifact = Artifact::assemble(&self.room, units);
        info!(
            "Recording {} finalized: {} units, {} bytes, {}",
            session.id,
            count,
            artifact.len(),
            artifact.reference
        );

        let delivered = self.sink.deliver(&artifact).await;
        self.status = RecordingStatus::Done;
        delivered?;

        Ok(Some(artifact))
    }

    /// Abandon any capture in progress without producing a file.
    pub fn reset(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.task.abort();
        }
        self.status = RecordingStatus::Idle;
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.reset();
    }
}

async fn capture(
    mut samples: broadcast::Receiver<MediaSample>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Vec<Bytes> {
    let mut units = Vec::new();

    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => break,

            sample = samples.recv() => match sample {
                Ok(sample) => append(&mut units, sample),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Recorder fell behind, {} units lost", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("Recorded stream ended");
                    // Wait for the explicit stop; the stop is what finalizes.
                    let _ = stop_rx.await;
                    return units;
                }
            },
        }
    }

    // Units already produced when stop arrived still belong to the recording.
    loop {
        match samples.try_recv() {
            Ok(sample) => append(&mut units, sample),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Recorder fell behind, {} units lost", skipped);
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    units
}

fn append(units: &mut Vec<Bytes>, sample: MediaSample) {
    if sample.is_empty() {
        return;
    }
    units.push(sample.data);
}
