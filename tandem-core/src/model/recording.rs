use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Idle,
    Recording,
    Finalizing,
    Done,
}

impl Default for RecordingStatus {
    fn default() -> Self {
        Self::Idle
    }
}
