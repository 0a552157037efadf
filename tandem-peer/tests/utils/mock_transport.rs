use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidateInfo, MediaTrack, SessionDescription, TrackKind};
use tandem_peer::{LocalStream, PeerTransport, TransportEvent, TransportState};
use tokio::sync::{Mutex, mpsc};

#[derive(Default)]
struct MockState {
    local_tracks: Vec<MediaTrack>,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    /// Every `add_ice_candidate` call, duplicates included.
    applied_candidates: Vec<IceCandidateInfo>,
    connected: bool,
    close_calls: usize,
    create_answer_calls: usize,
    candidate_attempts: usize,
    /// Upcoming `create_answer` calls that fail.
    failing_answers: usize,
    /// Upcoming `add_ice_candidate` calls that fail.
    failing_candidates: usize,
}

/// In-memory connection object.
///
/// Descriptions carry the sender's tracks as `a=track:<kind> <stream> <id>` lines. The mock
/// "connects" once it has a local description, a remote description and at least one remote
/// candidate, then reports the tracks named in the remote description.
#[derive(Clone)]
pub struct MockTransport {
    label: String,
    candidates_per_description: usize,
    events: mpsc::Sender<TransportEvent>,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new(label: &str, events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            label: label.to_string(),
            candidates_per_description: 2,
            events,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Same transport behind the trait object a negotiator takes.
    pub fn as_dyn(&self) -> Arc<dyn PeerTransport> {
        Arc::new(self.clone())
    }

    pub async fn applied_candidates(&self) -> Vec<IceCandidateInfo> {
        self.state.lock().await.applied_candidates.clone()
    }

    pub async fn local_tracks(&self) -> Vec<MediaTrack> {
        self.state.lock().await.local_tracks.clone()
    }

    pub async fn remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().await.remote.clone()
    }

    pub async fn close_calls(&self) -> usize {
        self.state.lock().await.close_calls
    }

    pub async fn create_answer_calls(&self) -> usize {
        self.state.lock().await.create_answer_calls
    }

    pub async fn candidate_attempts(&self) -> usize {
        self.state.lock().await.candidate_attempts
    }

    /// Make the next `count` calls to `create_answer` fail.
    pub async fn fail_next_answers(&self, count: usize) {
        self.state.lock().await.failing_answers = count;
    }

    /// Make the next `count` calls to `add_ice_candidate` fail.
    pub async fn fail_next_candidates(&self, count: usize) {
        self.state.lock().await.failing_candidates = count;
    }

    /// Report a transport failure, as a dropped network path would.
    pub async fn fail(&self) {
        let _ = self
            .events
            .send(TransportEvent::StateChanged(TransportState::Failed))
            .await;
    }

    fn describe(&self, tracks: &[MediaTrack]) -> String {
        let mut sdp = format!("v=0\r\no=mock-{}\r\n", self.label);
        for track in tracks {
            sdp.push_str(&format!(
                "a=track:{} {} {}\r\n",
                track.kind, track.stream_id, track.id
            ));
        }
        sdp
    }

    async fn try_connect(&self) {
        let remote_tracks = {
            let mut state = self.state.lock().await;
            let ready = state.local.is_some()
                && state.remote.is_some()
                && !state.applied_candidates.is_empty();
            if state.connected || !ready || state.close_calls > 0 {
                return;
            }
            state.connected = true;
            state
                .remote
                .as_ref()
                .map(|d| parse_tracks(&d.sdp))
                .unwrap_or_default()
        };

        tracing::debug!("[MockTransport {}] connected", self.label);
        let _ = self
            .events
            .send(TransportEvent::StateChanged(TransportState::Connected))
            .await;
        for track in remote_tracks {
            let _ = self.events.send(TransportEvent::TrackArrived(track)).await;
        }
    }
}

fn parse_tracks(sdp: &str) -> Vec<MediaTrack> {
    sdp.lines()
        .filter_map(|line| line.strip_prefix("a=track:"))
        .filter_map(|rest| {
            let mut parts = rest.split_whitespace();
            let kind = match parts.next()? {
                "audio" => TrackKind::Audio,
                "video" => TrackKind::Video,
                _ => return None,
            };
            let stream_id = parts.next()?;
            let id = parts.next()?;
            Some(MediaTrack::new(id, kind, stream_id))
        })
        .collect()
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn add_track(&self, track: &MediaTrack, _stream: &LocalStream) -> Result<()> {
        self.state.lock().await.local_tracks.push(track.clone());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let tracks = self.state.lock().await.local_tracks.clone();
        Ok(SessionDescription::offer(self.describe(&tracks)))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let mut state = self.state.lock().await;
        state.create_answer_calls += 1;
        if state.failing_answers > 0 {
            state.failing_answers -= 1;
            bail!("create_answer failed");
        }
        if state.remote.is_none() {
            bail!("create_answer without remote offer");
        }
        Ok(SessionDescription::answer(self.describe(&state.local_tracks)))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.state.lock().await.local = Some(desc);

        for n in 0..self.candidates_per_description {
            let candidate = IceCandidateInfo {
                candidate: format!("candidate:{} {} udp 2130706431 127.0.0.1 5{}000 typ host", self.label, n, n),
                sdp_mid: Some("0".into()),
                sdp_m_line_index: Some(0),
                username_fragment: None,
            };
            let _ = self
                .events
                .send(TransportEvent::CandidateGenerated(candidate))
                .await;
        }

        self.try_connect().await;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.state.lock().await.remote = Some(desc);
        self.try_connect().await;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInfo) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.candidate_attempts += 1;
            if state.failing_candidates > 0 {
                state.failing_candidates -= 1;
                bail!("add_ice_candidate failed");
            }
            if state.remote.is_none() {
                bail!("remote description not set");
            }
            state.applied_candidates.push(candidate);
        }
        self.try_connect().await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().await.close_calls += 1;
        Ok(())
    }
}
