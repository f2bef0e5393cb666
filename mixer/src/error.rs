//! Mixer runtime error types

use core::fmt;

use quartet_fixed::FixedError;

/// Errors raised while operating the mixer kernel or a back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerError {
    /// Pitch-step computation over/underflowed or produced a non-finite rate
    PitchStep(FixedError),
    /// `spr` fell outside `[SPR_MIN, SPR_MAX]` and was not a recognized sentinel
    InvalidSampleRate(u32),
    /// `lr8` stereo-blend parameter fell outside `[0, 256]`
    InvalidBlend(u16),
    /// A hardware back-end operation has no software equivalent
    Unsupported(&'static str),
}

impl fmt::Display for MixerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerError::PitchStep(e) => write!(f, "pitch step computation failed: {e}"),
            MixerError::InvalidSampleRate(spr) => {
                write!(f, "invalid output sample rate {spr}")
            }
            MixerError::InvalidBlend(lr8) => write!(f, "invalid stereo blend lr8={lr8}"),
            MixerError::Unsupported(what) => write!(f, "unsupported on this back-end: {what}"),
        }
    }
}

impl std::error::Error for MixerError {}

impl From<FixedError> for MixerError {
    fn from(e: FixedError) -> Self {
        MixerError::PitchStep(e)
    }
}
