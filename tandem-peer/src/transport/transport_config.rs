use serde::Deserialize;
use tandem_core::utils::DEFAULT_STUN_ADDR;

/// ICE configuration for a peer connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub ice_servers: Vec<String>,
}

impl TransportConfig {
    /// Host candidates only. Enough for two peers on one machine.
    pub fn local_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_ADDR.to_owned()],
        }
    }
}
