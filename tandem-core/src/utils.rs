/// Public reflection service handed to every peer connection.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Media type stamped on every finished recording.
pub const RECORDING_MIME_TYPE: &str = "video/webm";

pub const RECORDING_FILE_PREFIX: &str = "gravacao-";
pub const RECORDING_FILE_EXTENSION: &str = "webm";

pub const ROOM_ROUTE_PREFIX: &str = "/room/";
