mod local_stream;
mod media_source;
mod synthetic_source;

pub use local_stream::*;
pub use media_source::*;
pub use synthetic_source::*;
