use serde::Deserialize;
use std::time::Duration;

/// Knobs of one negotiation attempt.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often an unanswered initiator re-publishes its offer and gathered candidates.
    /// `None` publishes exactly once.
    pub offer_resend_interval_ms: Option<u64>,

    /// Give up when not connected within this window. `None` waits forever.
    pub negotiation_timeout_ms: Option<u64>,

    /// Capacity of the transport event channel.
    pub transport_event_capacity: usize,
}

impl SessionConfig {
    pub fn offer_resend_interval(&self) -> Option<Duration> {
        self.offer_resend_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            offer_resend_interval_ms: Some(1000),
            negotiation_timeout_ms: None,
            transport_event_capacity: 256,
        }
    }
}
