use std::fmt;

/// Failures inside the audio subsystem.
///
/// These never reach callers of the public playback or effect API: sound is
/// decorative, so every entry point logs them and carries on.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// The audio context was closed.
    Closed,
    /// Playback is blocked until a user gesture unlocks the host.
    Blocked,
    /// Too many live voices in the context.
    VoiceLimit { max: usize },
    /// A gain bus id that does not exist (anymore).
    UnknownBus,
    UnknownTrack { index: usize, count: usize },
    /// The effect does not belong to the active theme.
    UnsupportedEffect { effect: String, theme: String },
}

/// Why a frequency set was rejected as a chord.
#[derive(Debug, Clone, PartialEq)]
pub enum ChordError {
    Empty,
    InvalidFrequency { index: usize, frequency: f64 },
}

/// Rejected configuration.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Closed => write!(f, "audio context is closed"),
            AudioError::Blocked => write!(f, "audio playback is blocked until a user gesture"),
            AudioError::VoiceLimit { max } => write!(f, "voice limit of {max} reached"),
            AudioError::UnknownBus => write!(f, "unknown gain bus"),
            AudioError::UnknownTrack { index, count } => {
                write!(f, "track {index} out of range ({count} tracks)")
            }
            AudioError::UnsupportedEffect { effect, theme } => {
                write!(f, "effect '{effect}' is not available in theme '{theme}'")
            }
        }
    }
}

impl std::error::Error for AudioError {}

impl fmt::Display for ChordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordError::Empty => write!(f, "a chord needs at least one frequency"),
            ChordError::InvalidFrequency { index, frequency } => {
                write!(f, "frequency {frequency} at position {index} must be finite and > 0")
            }
        }
    }
}

impl std::error::Error for ChordError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}
