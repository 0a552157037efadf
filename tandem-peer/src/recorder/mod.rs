mod artifact;
mod recorder;

pub use artifact::*;
pub use recorder::*;
