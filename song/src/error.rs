//! `.4v` parsing error types

use core::fmt;

/// Errors raised while parsing a `.4v` score
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongError {
    /// File is larger than `SONG_MAX_SIZE`
    TooLarge(usize),
    /// File too small to contain the 16-byte header
    TooSmall,
    /// `khz` outside `[4, 20]`
    InvalidKhz(u16),
    /// `bar` not a multiple of 4 in `[4, 48]`
    InvalidBar(u16),
    /// `tempo` outside `[1, 64]`
    InvalidTempo(u16),
    /// Time signature `m/d` violates `1 <= m <= d <= 4`
    InvalidSignature(u8, u8),
    /// Unknown command opcode byte
    UnknownOpcode(u8),
    /// `S` command step outside `[SEQ_STP_MIN, SEQ_STP_MAX]`
    StepOutOfRange(u32),
    /// `V` command referenced an invalid instrument slot
    InvalidInstrumentRef(u32),
    /// The command stream ended before a trailing read completed
    Truncated,
}

impl fmt::Display for SongError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongError::TooLarge(n) => write!(f, "song file too large ({n} bytes)"),
            SongError::TooSmall => write!(f, "song file too small to contain a header"),
            SongError::InvalidKhz(k) => write!(f, "invalid khz {k}, expected 4..=20"),
            SongError::InvalidBar(b) => write!(f, "invalid bar {b}, expected a multiple of 4 in 4..=48"),
            SongError::InvalidTempo(t) => write!(f, "invalid tempo {t}, expected 1..=64"),
            SongError::InvalidSignature(m, d) => {
                write!(f, "invalid time signature {m}/{d}, expected 1 <= m <= d <= 4")
            }
            SongError::UnknownOpcode(op) => write!(f, "unknown opcode byte 0x{op:02X}"),
            SongError::StepOutOfRange(s) => write!(f, "slide step 0x{s:X} outside valid range"),
            SongError::InvalidInstrumentRef(par) => {
                write!(f, "voice-change references invalid instrument (par=0x{par:X})")
            }
            SongError::Truncated => write!(f, "command stream truncated"),
        }
    }
}

impl std::error::Error for SongError {}
