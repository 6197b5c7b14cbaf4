use std::io;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("couldn't parse toml: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("couldn't serialize toml: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("couldn't decode sound payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("couldn't determine the config/data directories")]
    NoProjectDirs,

    #[error("invalid time of day `{0}` (expected HH:MM)")]
    InvalidTime(String),

    #[error("invalid weekday `{0}`")]
    InvalidWeekday(String),

    /// A persisted schedule record that failed to decode or validate.
    #[error("malformed schedule record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("invalid class: {0}")]
    InvalidClass(String),

    #[error("no class with id `{0}`")]
    UnknownClass(String),

    #[error("sound is {size} bytes, the limit is {limit} bytes")]
    OversizeAsset { size: usize, limit: usize },

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("advice service unavailable: {0}")]
    AdviceUnavailable(String),

    #[error("clock is already running")]
    ClockRunning,

    #[error("clock was torn down")]
    ClockTornDown,

    #[error("couldn't start clock thread: {0}")]
    ClockSpawn(#[source] io::Error),
}
