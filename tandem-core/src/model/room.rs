use crate::utils::{RECORDING_FILE_EXTENSION, RECORDING_FILE_PREFIX, ROOM_ROUTE_PREFIX};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Negotiation scope shared by both ends of a call.
///
/// Opaque to everything below the room shell: two participants meet only when their ids are
/// byte-for-byte equal.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Route under which the room view is mounted, `/room/{id}`.
    pub fn route(&self) -> String {
        format!("{}{}", ROOM_ROUTE_PREFIX, self.0)
    }

    /// Parses a `/room/{id}` route back into its id.
    pub fn from_route(route: &str) -> Option<Self> {
        let id = route.strip_prefix(ROOM_ROUTE_PREFIX)?.trim_end_matches('/');
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Self(id.to_owned()))
    }

    /// Download name of a recording made in this room.
    pub fn recording_file_name(&self) -> String {
        format!(
            "{}{}.{}",
            RECORDING_FILE_PREFIX, self.0, RECORDING_FILE_EXTENSION
        )
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
