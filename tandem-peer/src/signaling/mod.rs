mod local_bus;
mod signaling_channel;

pub use local_bus::*;
pub use signaling_channel::*;
