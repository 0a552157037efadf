use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the offer/answer exchange a participant plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Creates and sends the first session offer.
    Initiator,
    /// Answers the initiator's offer.
    Joiner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "initiator"),
            Role::Joiner => write!(f, "joiner"),
        }
    }
}
