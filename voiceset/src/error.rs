//! `.set` parsing error types

use core::fmt;

/// Errors raised while parsing or unrolling a `.set` voice-set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSetError {
    /// File is larger than `VSET_MAX_SIZE`
    TooLarge(usize),
    /// File too small to contain the 222-byte header
    TooSmall,
    /// `khz` outside `[4, 20]`
    InvalidKhz(u8),
    /// An instrument's sample data offset fell outside the buffer
    OffsetOutOfBounds(u8),
    /// An instrument's length/loop fields did not shift cleanly by 16 bits
    MisalignedLengthField(u8),
    /// An instrument's loop length exceeds its sample length
    LoopExceedsLength(u8),
    /// An instrument's sample data runs past the end of the buffer
    SampleRunsPastBuffer(u8),
    /// A slot the song references was never validated (tainted or absent)
    SongUsesTaintedInstrument(u8),
}

impl fmt::Display for VoiceSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceSetError::TooLarge(n) => write!(f, "voice-set file too large ({n} bytes)"),
            VoiceSetError::TooSmall => write!(f, "voice-set file too small to contain a header"),
            VoiceSetError::InvalidKhz(k) => write!(f, "invalid khz {k}, expected 4..=20"),
            VoiceSetError::OffsetOutOfBounds(i) => {
                write!(f, "instrument {i} sample offset outside buffer")
            }
            VoiceSetError::MisalignedLengthField(i) => write!(
                f,
                "instrument {i} length/loop field does not shift cleanly by 16 bits"
            ),
            VoiceSetError::LoopExceedsLength(i) => {
                write!(f, "instrument {i} loop length exceeds sample length")
            }
            VoiceSetError::SampleRunsPastBuffer(i) => {
                write!(f, "instrument {i} sample data runs past end of buffer")
            }
            VoiceSetError::SongUsesTaintedInstrument(i) => write!(
                f,
                "song references instrument {i}, which is unavailable or tainted in this voice-set"
            ),
        }
    }
}

impl std::error::Error for VoiceSetError {}
