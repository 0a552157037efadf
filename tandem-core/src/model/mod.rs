mod media;
mod recording;
mod role;
mod room;
mod signaling;
mod state;

pub use media::{MediaConstraints, MediaSample, MediaTrack, TrackKind};
pub use recording::RecordingStatus;
pub use role::Role;
pub use room::RoomId;
pub use signaling::{IceCandidateInfo, SdpKind, SessionDescription, SignalMessage};
pub use state::ConnectionState;
