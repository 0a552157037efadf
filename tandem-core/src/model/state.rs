use serde::{Deserialize, Serialize};

/// Observable lifecycle of a negotiated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Negotiating,
    Connected,
    Closed,
}

impl ConnectionState {
    /// Forward-only lifecycle: `New -> Negotiating -> Connected -> Closed`, with `Closed`
    /// reachable from anywhere and no way back into `Negotiating`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (New, Negotiating) | (Negotiating, Connected) | (New | Negotiating | Connected, Closed)
        )
    }

    pub fn is_closed(self) -> bool {
        self == ConnectionState::Closed
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::New
    }
}
