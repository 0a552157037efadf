use crate::media::LocalStream;
use crate::session::session_handle::Control;
use crate::session::{
    NegotiatorEvent, RemoteStream, SessionConfig, SessionEvent, SessionHandle,
};
use crate::signaling::{SignalingChannel, SignalingSubscription};
use crate::transport::{PeerTransport, TransportEvent, TransportState};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tandem_core::{
    ConnectionState, IceCandidateInfo, MediaError, MediaTrack, NegotiationError, Role, RoomId,
    SessionDescription, SignalMessage, StateViolation,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

enum Step {
    Event(NegotiatorEvent),
    SignalingClosed,
    TransportGone,
    Stop,
}

/// Drives one participant from startup to a connected two-party media session.
///
/// Every input (signaling text, transport event, timer) goes through [`dispatch`], one at a
/// time. The liveness flag shared with the [`SessionHandle`] is checked after every suspension
/// point, so work that completes after dispose never touches state.
///
/// [`dispatch`]: SessionNegotiator::dispatch
pub struct SessionNegotiator {
    room: RoomId,
    role: Role,
    config: SessionConfig,

    transport: Arc<dyn PeerTransport>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_closed: bool,
    subscription: Option<Box<dyn SignalingSubscription>>,

    state: ConnectionState,
    local_offer: Option<SessionDescription>,
    local_answer: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,

    /// Remote candidates that arrived before the remote description.
    pending_candidates: Vec<IceCandidateInfo>,
    seen_candidates: HashSet<IceCandidateInfo>,
    /// Everything we have published so far, replayed on offer resend.
    local_candidates: Vec<IceCandidateInfo>,
    remote_stream: Option<RemoteStream>,

    alive: Arc<AtomicBool>,
    control_rx: mpsc::Receiver<Control>,
    state_tx: watch::Sender<ConnectionState>,
    remote_tx: watch::Sender<Option<RemoteStream>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionNegotiator {
    pub fn new(
        room: RoomId,
        role: Role,
        config: SessionConfig,
        transport: Arc<dyn PeerTransport>,
        transport_rx: mpsc::Receiver<TransportEvent>,
    ) -> (Self, SessionHandle) {
        let alive = Arc::new(AtomicBool::new(true));
        let (control_tx, control_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(ConnectionState::New);
        let (remote_tx, remote_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let handle = SessionHandle::new(
            room.clone(),
            role,
            alive.clone(),
            control_tx,
            state_rx,
            remote_rx,
            events_rx,
        );

        let negotiator = Self {
            room,
            role,
            config,
            transport,
            transport_rx,
            transport_closed: false,
            subscription: None,
            state: ConnectionState::New,
            local_offer: None,
            local_answer: None,
            remote_description: None,
            pending_candidates: Vec::new(),
            seen_candidates: HashSet::new(),
            local_candidates: Vec::new(),
            remote_stream: None,
            alive,
            control_rx,
            state_tx,
            remote_tx,
            events_tx,
        };

        (negotiator, handle)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_description.is_some()
    }

    pub fn pending_candidate_count(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn remote_stream(&self) -> Option<&RemoteStream> {
        self.remote_stream.as_ref()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Subscribe to the room, attach every local track and, as initiator, publish the offer.
    ///
    /// Runs once per negotiator; later calls are ignored.
    pub async fn initialize(
        &mut self,
        channel: &dyn SignalingChannel,
        stream: &LocalStream,
    ) -> Result<(), NegotiationError> {
        if self.state != ConnectionState::New {
            warn!(
                "Negotiator for room {} already initialized (state {:?})",
                self.room, self.state
            );
            return Ok(());
        }
        if !self.is_alive() {
            return Ok(());
        }

        if !stream.has_tracks() {
            error!("Refusing to negotiate room {} without local tracks", self.room);
            return Err(MediaError::NoTracks.into());
        }

        let mut subscription = channel.subscribe(&self.room).await?;
        if !self.is_alive() {
            subscription.close().await;
            return Ok(());
        }
        self.subscription = Some(subscription);

        for track in stream.tracks() {
            self.transport.add_track(track, stream).await?;
            if !self.is_alive() {
                return Ok(());
            }
        }

        self.transition(ConnectionState::Negotiating);
        info!(
            "Joined room {} as {} with {} local tracks",
            self.room,
            self.role,
            stream.tracks().len()
        );

        if self.role == Role::Initiator {
            self.send_offer().await?;
        }

        Ok(())
    }

    /// Single entry point for everything that happens to the session.
    ///
    /// Errors are per-event: the state machine stays usable unless the session closed.
    pub async fn dispatch(&mut self, event: NegotiatorEvent) -> Result<(), NegotiationError> {
        if !self.is_alive() || self.state.is_closed() {
            debug!("Ignoring {:?} for disposed session in room {}", event, self.room);
            return Ok(());
        }

        match event {
            NegotiatorEvent::Inbound(text) => {
                let msg = SignalMessage::from_json(&text)?;
                self.handle_signal(msg).await
            }
            NegotiatorEvent::Transport(event) => self.handle_transport_event(event).await,
            NegotiatorEvent::ResendOffer => self.resend_offer().await,
            NegotiatorEvent::DeadlineElapsed => self.handle_deadline().await,
        }
    }

    async fn handle_signal(&mut self, msg: SignalMessage) -> Result<(), NegotiationError> {
        debug!(
            "Received '{}' in room {} as {}",
            msg.kind(),
            self.room,
            self.role
        );

        match msg {
            SignalMessage::Offer { offer } => self.handle_offer(offer).await,
            SignalMessage::Answer { answer } => self.handle_answer(answer).await,
            SignalMessage::IceCandidate { candidate } => {
                self.handle_remote_candidate(candidate).await
            }
        }
    }

    async fn send_offer(&mut self) -> Result<(), NegotiationError> {
        let offer = self.transport.create_offer().await?;
        if !self.is_alive() {
            return Ok(());
        }

        self.transport.set_local_description(offer.clone()).await?;
        if !self.is_alive() {
            return Ok(());
        }

        self.local_offer = Some(offer.clone());
        info!("Sending offer in room {}", self.room);
        self.publish(SignalMessage::Offer { offer }).await
    }

    async fn handle_offer(&mut self, offer: SessionDescription) -> Result<(), NegotiationError> {
        if self.role == Role::Initiator {
            return Err(NegotiationError::InvalidState(
                StateViolation::OfferToInitiator,
            ));
        }

        if let Some(remote) = &self.remote_description {
            if *remote != offer {
                return Err(NegotiationError::InvalidState(
                    StateViolation::ConflictingOffer,
                ));
            }
            // Same offer again: the initiator never saw our answer.
            if let Some(answer) = self.local_answer.clone() {
                debug!("Offer repeated in room {}, re-sending answer", self.room);
                return self.publish(SignalMessage::Answer { answer }).await;
            }
            debug!("Offer repeated in room {}, answering again", self.room);
            return self.answer_offer().await;
        }

        self.transport.set_remote_description(offer.clone()).await?;
        if !self.is_alive() {
            return Ok(());
        }
        self.remote_description = Some(offer);
        self.flush_pending_candidates().await;

        self.answer_offer().await
    }

    /// Create and publish the answer for the applied remote offer.
    ///
    /// Leaves `local_answer` unset on failure so a repeated offer retries it.
    async fn answer_offer(&mut self) -> Result<(), NegotiationError> {
        let answer = self.transport.create_answer().await?;
        if !self.is_alive() {
            return Ok(());
        }

        self.transport.set_local_description(answer.clone()).await?;
        if !self.is_alive() {
            return Ok(());
        }

        self.local_answer = Some(answer.clone());
        info!("Sending answer in room {}", self.room);
        self.publish(SignalMessage::Answer { answer }).await
    }

    async fn handle_answer(&mut self, answer: SessionDescription) -> Result<(), NegotiationError> {
        if self.role != Role::Initiator || self.local_offer.is_none() {
            return Err(NegotiationError::InvalidState(
                StateViolation::AnswerWithoutOffer,
            ));
        }
        if self.remote_description.is_some() {
            return Err(NegotiationError::InvalidState(
                StateViolation::DuplicateAnswer,
            ));
        }

        self.transport.set_remote_description(answer.clone()).await?;
        if !self.is_alive() {
            return Ok(());
        }

        self.remote_description = Some(answer);
        info!("Answer applied in room {}", self.room);
        self.flush_pending_candidates().await;
        Ok(())
    }

    async fn handle_remote_candidate(
        &mut self,
        candidate: IceCandidateInfo,
    ) -> Result<(), NegotiationError> {
        if self.seen_candidates.contains(&candidate) || self.pending_candidates.contains(&candidate)
        {
            debug!("Duplicate ICE candidate ignored in room {}", self.room);
            return Ok(());
        }

        if self.remote_description.is_none() {
            self.pending_candidates.push(candidate);
            debug!(
                "Queued ICE candidate in room {} ({} waiting for remote description)",
                self.room,
                self.pending_candidates.len()
            );
            return Ok(());
        }

        self.apply_candidate(candidate).await?;
        Ok(())
    }

    /// A candidate counts as seen only once the connection accepted it, so a resend retries it.
    async fn apply_candidate(&mut self, candidate: IceCandidateInfo) -> anyhow::Result<()> {
        self.transport.add_ice_candidate(candidate.clone()).await?;
        self.seen_candidates.insert(candidate);
        Ok(())
    }

    async fn flush_pending_candidates(&mut self) {
        let pending = std::mem::take(&mut self.pending_candidates);
        if pending.is_empty() {
            return;
        }

        debug!(
            "Applying {} queued ICE candidates in room {}",
            pending.len(),
            self.room
        );
        for candidate in pending {
            if !self.is_alive() {
                return;
            }
            if let Err(e) = self.apply_candidate(candidate).await {
                warn!("Failed to add queued ICE candidate in room {}: {:#}", self.room, e);
            }
        }
    }

    async fn handle_transport_event(
        &mut self,
        event: TransportEvent,
    ) -> Result<(), NegotiationError> {
        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                self.local_candidates.push(candidate.clone());
                self.publish(SignalMessage::IceCandidate { candidate }).await
            }
            TransportEvent::TrackArrived(track) => {
                self.attach_remote_track(track);
                Ok(())
            }
            TransportEvent::StateChanged(TransportState::Connected) => {
                self.transition(ConnectionState::Connected);
                Ok(())
            }
            TransportEvent::StateChanged(TransportState::Connecting) => Ok(()),
            TransportEvent::StateChanged(state) => {
                warn!("Transport in room {} reported {:?}", self.room, state);
                self.dispose().await;
                Ok(())
            }
        }
    }

    fn attach_remote_track(&mut self, track: MediaTrack) {
        let event = match self.remote_stream.as_mut() {
            None => {
                let stream = RemoteStream {
                    stream_id: track.stream_id.clone(),
                    tracks: vec![track],
                };
                info!(
                    "Remote stream {} attached in room {}",
                    stream.stream_id, self.room
                );
                self.remote_stream = Some(stream.clone());
                SessionEvent::RemoteStreamAttached(stream)
            }
            Some(stream) if stream.contains(&track.id) => {
                debug!("Remote track {} already attached", track.id);
                return;
            }
            Some(stream) => {
                debug!("Remote {} track {} added", track.kind, track.id);
                stream.tracks.push(track.clone());
                SessionEvent::RemoteTrackAdded(track)
            }
        };

        self.remote_tx.send_replace(self.remote_stream.clone());
        self.notify(event);
        self.transition(ConnectionState::Connected);
    }

    async fn resend_offer(&mut self) -> Result<(), NegotiationError> {
        if self.role != Role::Initiator || self.remote_description.is_some() {
            return Ok(());
        }
        let Some(offer) = self.local_offer.clone() else {
            return Ok(());
        };

        debug!(
            "No answer yet in room {}, re-publishing offer and {} candidates",
            self.room,
            self.local_candidates.len()
        );
        self.publish(SignalMessage::Offer { offer }).await?;
        for candidate in self.local_candidates.clone() {
            self.publish(SignalMessage::IceCandidate { candidate }).await?;
        }
        Ok(())
    }

    async fn handle_deadline(&mut self) -> Result<(), NegotiationError> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        let timeout = self.config.negotiation_timeout().unwrap_or_default();
        error!(
            "Room {} not connected after {:?}, giving up",
            self.room, timeout
        );
        self.dispose().await;
        Err(NegotiationError::TimedOut(timeout))
    }

    async fn publish(&self, msg: SignalMessage) -> Result<(), NegotiationError> {
        let Some(subscription) = &self.subscription else {
            debug!("No signaling subscription, '{}' not sent", msg.kind());
            return Ok(());
        };
        subscription.publish(&msg).await?;
        Ok(())
    }

    fn transition(&mut self, next: ConnectionState) -> bool {
        if !self.state.can_transition_to(next) {
            if self.state != next {
                debug!(
                    "Ignoring transition {:?} -> {:?} in room {}",
                    self.state, next, self.room
                );
            }
            return false;
        }

        info!(
            "Session in room {} ({}): {:?} -> {:?}",
            self.room, self.role, self.state, next
        );
        self.state = next;
        self.state_tx.send_replace(next);
        self.notify(SessionEvent::StateChanged(next));
        true
    }

    fn notify(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Close the subscription and the connection. Idempotent.
    pub async fn dispose(&mut self) {
        self.alive.store(false, Ordering::Release);

        if let Some(mut subscription) = self.subscription.take() {
            subscription.close().await;
        }

        if !self.transport_closed {
            self.transport_closed = true;
            if let Err(e) = self.transport.close().await {
                warn!("Failed to close transport in room {}: {:#}", self.room, e);
            }
        }

        self.pending_candidates.clear();
        self.transition(ConnectionState::Closed);
    }

    /// Event loop: one event at a time until disposed, failed or abandoned.
    pub async fn run(mut self) {
        info!("Negotiator for room {} ({}) started", self.room, self.role);

        let mut resend = match (self.role, self.config.offer_resend_interval()) {
            (Role::Initiator, Some(period)) => {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Some(interval)
            }
            _ => None,
        };
        let mut deadline = self
            .config
            .negotiation_timeout()
            .map(|timeout| Instant::now() + timeout);

        loop {
            if self.state.is_closed() || !self.is_alive() {
                break;
            }
            if self.state == ConnectionState::Connected || self.remote_description.is_some() {
                resend = None;
            }
            if self.state == ConnectionState::Connected {
                deadline = None;
            }

            let step = tokio::select! {
                _ = self.control_rx.recv() => Step::Stop,

                text = next_inbound(&mut self.subscription) => match text {
                    Some(text) => Step::Event(NegotiatorEvent::Inbound(text)),
                    None => Step::SignalingClosed,
                },

                evt = self.transport_rx.recv() => match evt {
                    Some(evt) => Step::Event(NegotiatorEvent::Transport(evt)),
                    None => Step::TransportGone,
                },

                _ = next_tick(&mut resend) => Step::Event(NegotiatorEvent::ResendOffer),

                _ = wait_until(deadline) => Step::Event(NegotiatorEvent::DeadlineElapsed),
            };

            match step {
                Step::Event(event) => {
                    if let Err(e) = self.dispatch(event).await {
                        if self.state.is_closed() {
                            error!("Session in room {} failed: {}", self.room, e);
                            self.notify(SessionEvent::Failed(e));
                        } else {
                            warn!("Dropped event in room {}: {}", self.room, e);
                        }
                    }
                }
                Step::SignalingClosed => {
                    warn!("Signaling channel for room {} closed", self.room);
                    self.subscription = None;
                }
                Step::TransportGone => {
                    warn!("Transport event channel for room {} closed", self.room);
                    break;
                }
                Step::Stop => break,
            }
        }

        self.dispose().await;
        info!("Negotiator for room {} finished", self.room);
    }
}

async fn next_inbound(subscription: &mut Option<Box<dyn SignalingSubscription>>) -> Option<String> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
