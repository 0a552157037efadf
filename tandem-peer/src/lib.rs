pub mod media;
pub mod recorder;
pub mod session;
pub mod signaling;
pub mod transport;

pub use media::*;
pub use recorder::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
