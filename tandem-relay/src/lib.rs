pub mod client;
pub mod relay;

pub use client::*;
pub use relay::*;
