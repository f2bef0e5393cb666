//! Unified error taxonomy for the player's external interface (spec §7)

use core::fmt;

use quartet_bundle::BundleError;
use quartet_mixer::MixerError;
use quartet_sequencer::SequencerError;
use quartet_song::SongError;
use quartet_voiceset::VoiceSetError;

/// A player-level fault: loop-stack overflow or other unreachable internal
/// state surfaced by the sequencer during playback (spec §7 *PlayerError*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerFault {
    /// A voice's loop stack exceeded its maximum depth.
    LoopStackOverflow,
    /// The sequencer referenced an instrument slot outside `[0, 20)`.
    InstrumentOutOfRange(u32),
    /// The sequencer referenced an instrument the loaded voice-set never validated.
    TaintedInstrument(u32),
}

impl fmt::Display for PlayerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerFault::LoopStackOverflow => write!(f, "voice loop stack overflowed"),
            PlayerFault::InstrumentOutOfRange(i) => write!(f, "instrument index {i} out of range"),
            PlayerFault::TaintedInstrument(i) => {
                write!(f, "instrument {i} is tainted or absent in the current voice-set")
            }
        }
    }
}

impl From<SequencerError> for PlayerFault {
    fn from(e: SequencerError) -> Self {
        match e {
            SequencerError::LoopStackOverflow => PlayerFault::LoopStackOverflow,
            SequencerError::InstrumentOutOfRange(i) => PlayerFault::InstrumentOutOfRange(i),
            SequencerError::TaintedInstrument(i) => PlayerFault::TaintedInstrument(i),
        }
    }
}

/// Every error the player's external control surface can raise (spec §7).
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// I/O failure, truncated read, or seek past end while loading a file.
    Input(String),
    /// `.4v` parse failure.
    Song(SongError),
    /// `.set` parse failure.
    VoiceSet(VoiceSetError),
    /// `.4q` bundle parse failure.
    Bundle(BundleError),
    /// Mixer `init`/`push` failure, pitch-step overflow, or an unsupported
    /// back-end operation.
    Mixer(MixerError),
    /// Loop-stack overflow or other unreachable sequencer state.
    Player(PlayerFault),
    /// Bad parameter: rate out of range, unknown mixer id, blend out of range.
    Arg(String),
    /// Called out of order (e.g. `play` before `load`/`setup`/`init`).
    Internal,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Input(msg) => write!(f, "input error: {msg}"),
            Error::Song(e) => write!(f, "song error: {e}"),
            Error::VoiceSet(e) => write!(f, "voice-set error: {e}"),
            Error::Bundle(e) => write!(f, "bundle error: {e}"),
            Error::Mixer(e) => write!(f, "mixer error: {e}"),
            Error::Player(e) => write!(f, "player error: {e}"),
            Error::Arg(msg) => write!(f, "argument error: {msg}"),
            Error::Internal => write!(f, "internal error (666)"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Input(e.to_string())
    }
}

impl From<SongError> for Error {
    fn from(e: SongError) -> Self {
        Error::Song(e)
    }
}

impl From<VoiceSetError> for Error {
    fn from(e: VoiceSetError) -> Self {
        Error::VoiceSet(e)
    }
}

impl From<BundleError> for Error {
    fn from(e: BundleError) -> Self {
        Error::Bundle(e)
    }
}

impl From<MixerError> for Error {
    fn from(e: MixerError) -> Self {
        Error::Mixer(e)
    }
}

impl From<SequencerError> for Error {
    fn from(e: SequencerError) -> Self {
        Error::Player(PlayerFault::from(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequencer_loop_overflow_maps_to_player_fault() {
        let e: Error = SequencerError::LoopStackOverflow.into();
        assert_eq!(e, Error::Player(PlayerFault::LoopStackOverflow));
    }

    #[test]
    fn display_messages_are_nonempty() {
        assert!(!Error::Internal.to_string().is_empty());
        assert!(!Error::Arg("bad rate".into()).to_string().is_empty());
    }
}
