//! Read-only playback summary (spec §6 `info()`)

/// What kind of source a [`crate::Player`] most recently loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadedFormat {
    /// A `.4v` score with no paired voice-set (measure-only mode).
    SongOnly,
    /// A `.4v` score plus a `.set` voice-set.
    SongAndVoiceSet,
    /// A `.4q` bundle (score, voice-set, and optional comment).
    Bundle,
}

/// Snapshot of the player's current format, rates, and mixer choice.
#[derive(Debug, Clone)]
pub struct Info {
    pub format: LoadedFormat,
    /// The voice-set's native sample rate in Hz, if one is loaded.
    pub input_rate_hz: Option<u32>,
    /// The mixer's configured output sample rate in Hz.
    pub output_rate_hz: u32,
    /// Name of the active mixer back-end (spec §4.K variant name).
    pub mixer_name: &'static str,
    /// Sequencer tick rate in Hz.
    pub tick_hz: u32,
    /// Free-text comment from a loaded bundle's info section, if any.
    pub comment: Option<String>,
}
