use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tandem_core::RoomId;
use tandem_core::utils::RECORDING_MIME_TYPE;
use tracing::info;

/// A finalized recording, ready to hand to the user.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub data: Bytes,
    /// Transient content-addressed handle, `blob:sha256-<hex>`.
    pub reference: String,
}

impl Artifact {
    /// Assemble the buffered units of a recording in `room` into one blob.
    pub fn assemble(room: &RoomId, units: Vec<Bytes>) -> Self {
        let total = units.iter().map(Bytes::len).sum();
        let mut data = BytesMut::with_capacity(total);
        for unit in units {
            data.extend_from_slice(&unit);
        }
        let data = data.freeze();

        let hash = Sha256::digest(&data);
        let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();

        Self {
            file_name: room.recording_file_name(),
            mime_type: RECORDING_MIME_TYPE,
            data,
            reference: format!("blob:sha256-{hex}"),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where finished recordings go.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn deliver(&self, artifact: &Artifact) -> std::io::Result<()>;
}

/// Saves recordings into a local download directory under their file name.
#[derive(Debug, Clone)]
pub struct DownloadDir {
    dir: PathBuf,
}

impl DownloadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, artifact: &Artifact) -> PathBuf {
        self.dir.join(&artifact.file_name)
    }
}

#[async_trait]
impl ArtifactSink for DownloadDir {
    async fn deliver(&self, artifact: &Artifact) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(artifact);
        tokio::fs::write(&path, &artifact.data).await?;

        info!(
            "Saved {} ({} bytes, {}) to {}",
            artifact.file_name,
            artifact.len(),
            artifact.mime_type,
            path.display()
        );
        Ok(())
    }
}
