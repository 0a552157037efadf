use crate::media::{LocalStream, MediaSource, StreamProducer};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tandem_core::{MediaConstraints, MediaError, MediaSample, MediaTrack, TrackKind};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

/// Media source that fabricates encoded units at a fixed cadence.
///
/// Stands in for camera and microphone on hosts without capture devices. `devices` says which
/// kinds of hardware exist; asking for a missing kind fails the same way a real device would.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    pub devices: MediaConstraints,
    pub frame_interval: Duration,
    pub unit_size: usize,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            devices: MediaConstraints::default(),
            frame_interval: Duration::from_millis(20),
            unit_size: 160,
        }
    }
}

#[async_trait]
impl MediaSource for SyntheticSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalStream, MediaError> {
        if constraints.video && !self.devices.video {
            return Err(MediaError::DeviceUnavailable(TrackKind::Video));
        }
        if constraints.audio && !self.devices.audio {
            return Err(MediaError::DeviceUnavailable(TrackKind::Audio));
        }

        let stream_id = Uuid::new_v4().to_string();
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(MediaTrack::new(
                Uuid::new_v4().to_string(),
                TrackKind::Audio,
                &stream_id,
            ));
        }
        if constraints.video {
            tracks.push(MediaTrack::new(
                Uuid::new_v4().to_string(),
                TrackKind::Video,
                &stream_id,
            ));
        }

        if tracks.is_empty() {
            return Err(MediaError::NoTracks);
        }

        let stream = LocalStream::new(stream_id, tracks);
        info!(
            "Synthetic stream {} opened with {} tracks",
            stream.id(),
            stream.tracks().len()
        );

        tokio::spawn(generate(
            stream.producer(),
            stream.tracks().to_vec(),
            self.frame_interval,
            self.unit_size,
        ));

        Ok(stream)
    }
}

async fn generate(
    mut producer: StreamProducer,
    tracks: Vec<MediaTrack>,
    interval: Duration,
    unit_size: usize,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frame: u64 = 0;

    loop {
        tokio::select! {
            _ = producer.ended() => break,
            _ = ticker.tick() => {
                for track in &tracks {
                    let fill = (frame % 251) as u8;
                    producer.push(MediaSample {
                        track_id: track.id.clone(),
                        data: Bytes::from(vec![fill; unit_size]),
                        duration: interval,
                    });
                }
                frame += 1;
            }
        }
    }

    debug!("Synthetic generator stopped after {} frames", frame);
}
