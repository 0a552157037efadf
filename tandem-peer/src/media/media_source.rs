use crate::media::LocalStream;
use async_trait::async_trait;
use tandem_core::{MediaConstraints, MediaError};

/// Access to local capture hardware.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Open the devices named by `constraints` and return the live stream.
    ///
    /// Never returns a stream with zero tracks: that case is [`MediaError::NoTracks`].
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalStream, MediaError>;
}
