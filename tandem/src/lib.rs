pub use tandem_core::model::{ConnectionState, Role, RoomId};
pub use tandem_core::{NegotiationError, RecorderError};

pub mod model {
    pub use tandem_core::model::*;
}

pub mod peer {
    pub use tandem_peer::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use tandem_relay::*;
}
