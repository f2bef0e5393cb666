//! `.4q` bundle parsing error types

use core::fmt;

use quartet_song::SongError;
use quartet_voiceset::VoiceSetError;

/// Errors raised while parsing a `.4q` bundle.
#[derive(Debug, Clone, PartialEq)]
pub enum BundleError {
    /// File too small to contain the 16-byte bundle header
    TooSmall,
    /// Magic bytes were not `QUAR`
    InvalidMagic,
    /// A section-size field in the header disagrees with the actual file length
    SizeMismatch,
    /// The embedded `.4v` section failed to parse
    Song(SongError),
    /// The embedded `.set` section failed to parse
    VoiceSet(VoiceSetError),
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::TooSmall => write!(f, "bundle file too small to contain a header"),
            BundleError::InvalidMagic => write!(f, "bundle magic is not \"QUAR\""),
            BundleError::SizeMismatch => {
                write!(f, "bundle section sizes do not match the file length")
            }
            BundleError::Song(e) => write!(f, "bundle song section: {e}"),
            BundleError::VoiceSet(e) => write!(f, "bundle voice-set section: {e}"),
        }
    }
}

impl std::error::Error for BundleError {}

impl From<SongError> for BundleError {
    fn from(e: SongError) -> Self {
        BundleError::Song(e)
    }
}

impl From<VoiceSetError> for BundleError {
    fn from(e: VoiceSetError) -> Self {
        BundleError::VoiceSet(e)
    }
}
