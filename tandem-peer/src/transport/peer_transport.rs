use crate::media::LocalStream;
use anyhow::Result;
use async_trait::async_trait;
use tandem_core::{IceCandidateInfo, MediaTrack, SessionDescription};

/// The connection object a negotiator drives.
///
/// Implementations report asynchronous happenings (gathered candidates, arriving tracks,
/// connectivity changes) on the `TransportEvent` channel they were built with.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Send `track` of `stream` to the peer once connected.
    async fn add_track(&self, track: &MediaTrack, stream: &LocalStream) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Fails when no remote description is set yet; callers queue until then.
    async fn add_ice_candidate(&self, candidate: IceCandidateInfo) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
