//! Top-level playback control surface for the Quartet player (spec §6)
//!
//! [`Player`] ties together every other crate in the workspace: it loads a
//! score (and, usually, a voice-set), drives a [`Sequencer`] tick by tick,
//! and renders the result through a [`quartet_mixer`] back-end. It owns
//! everything it touches (the song via `Rc`, so the sequencer can share it
//! without borrowing from the struct that contains both of them) rather
//! than handing out references, so a host can keep one `Player` alive for
//! an entire playback session.

mod config;
mod error;
mod info;

pub use config::{ChannelMap, PlayerConfig, MAX_TICKS_AUTO, TICK_HZ_FROM_SONG};
pub use error::{Error, PlayerFault};
pub use info::{Info, LoadedFormat};
pub use quartet_mixer::{Interpolator, MixerVariant, SampleRateRequest};
pub use quartet_sequencer::{DEFAULT_TICK_HZ, TICK_HZ_RANGE};

use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use quartet_bundle::parse_bundle;
use quartet_mixer::{make_backend, Backend, Mixer};
use quartet_song::{parse_song, Song};
use quartet_sequencer::Sequencer;
use quartet_voiceset::{check_song_coverage, parse_voiceset, VoiceSet};

/// Where a [`Player::load`] call should read its score (and, optionally,
/// its voice-set) from.
///
/// Spec §6 describes `load` as taking a song path plus an optional
/// voice-set path and an optional bundle path; those three cases are
/// mutually exclusive in practice, so this crate expresses them as one
/// enum instead of two `Option<&Path>` parameters a caller could
/// misuse by supplying all three at once.
#[derive(Debug, Clone)]
pub enum LoadSource {
    /// A `.4v` score with no voice-set: measure-only mode (spec §6 `load`
    /// "without a voice-set, only `measure` is meaningful").
    Song(PathBuf),
    /// A `.4v` score paired with a `.set` voice-set.
    SongAndVoiceSet { song: PathBuf, voice_set: PathBuf },
    /// A `.4q` bundle containing both, plus an optional comment.
    Bundle(PathBuf),
}

/// Ties a loaded score and voice-set to a running sequencer and mixer
/// back-end (spec §6).
pub struct Player {
    song: Option<Rc<Song>>,
    voice_set: Option<VoiceSet>,
    comment: Option<String>,
    format: Option<LoadedFormat>,
    config: PlayerConfig,
    sequencer: Option<Sequencer>,
    backend: Option<Box<dyn Backend>>,
    /// Samples rendered by the current tick but not yet handed to a caller.
    pending: VecDeque<i32>,
}

impl Default for Player {
    fn default() -> Self {
        Player::new()
    }
}

impl Player {
    /// An empty player with nothing loaded (spec §6 `new`).
    pub fn new() -> Player {
        Player {
            song: None,
            voice_set: None,
            comment: None,
            format: None,
            config: PlayerConfig::default(),
            sequencer: None,
            backend: None,
            pending: VecDeque::new(),
        }
    }

    /// Read and parse `source`, replacing anything previously loaded.
    ///
    /// Any `sequencer`/`backend` built against the old song or voice-set is
    /// discarded; call [`Player::init`] (and, if the mixer variant or
    /// sample rate should change, [`Player::setup`]) again afterwards.
    pub fn load(&mut self, source: LoadSource) -> Result<LoadedFormat, Error> {
        let (song, voice_set, comment, format) = match source {
            LoadSource::Song(path) => {
                let bytes = std::fs::read(&path)?;
                let song = parse_song(&bytes)?;
                (song, None, None, LoadedFormat::SongOnly)
            }
            LoadSource::SongAndVoiceSet { song: song_path, voice_set: vset_path } => {
                let song_bytes = std::fs::read(&song_path)?;
                let vset_bytes = std::fs::read(&vset_path)?;
                let song = parse_song(&song_bytes)?;
                let voice_set = parse_voiceset(&vset_bytes)?;
                check_song_coverage(&voice_set, song.instrument_use)?;
                (song, Some(voice_set), None, LoadedFormat::SongAndVoiceSet)
            }
            LoadSource::Bundle(path) => {
                let bytes = std::fs::read(&path)?;
                let bundle = parse_bundle(&bytes)?;
                (bundle.song, Some(bundle.voice_set), bundle.comment, LoadedFormat::Bundle)
            }
        };

        if song.had_trailing_garbage {
            tracing::warn!("song has trailing bytes past its last voice's closing F command");
        }

        self.song = Some(Rc::new(song));
        self.voice_set = voice_set;
        self.comment = comment;
        self.format = Some(format);
        self.sequencer = None;
        self.backend = None;
        self.pending.clear();

        Ok(format)
    }

    /// Select the mixer variant and output sample rate (spec §6 `setup`).
    ///
    /// Safe to call before a voice-set is loaded (measure-only mode defers
    /// building the back-end until a voice-set and a call to `init` make
    /// one meaningful); harmless to call again later to switch variants.
    pub fn setup(&mut self, mixer: MixerVariant, spr: SampleRateRequest) -> Result<(), Error> {
        self.config.mixer = mixer;
        self.config.sample_rate = spr;
        self.rebuild_backend()
    }

    fn rebuild_backend(&mut self) -> Result<(), Error> {
        let Some(voice_set) = &self.voice_set else {
            self.backend = None;
            return Ok(());
        };
        let mixer = Mixer::init(self.config.sample_rate, voice_set.khz as u32, self.config.interpolator);
        let mut backend = make_backend(self.config.mixer, mixer);
        // Best-effort: only the stereo-capable back-ends implement this, and
        // the default `lr8` is itself a no-op blend for them.
        let _ = backend.set_blend(self.config.lr8);
        self.backend = Some(backend);
        self.pending.clear();
        Ok(())
    }

    /// Build the sequencer and cap playback length (spec §6 `init`).
    ///
    /// `rate_hz` of [`TICK_HZ_FROM_SONG`] resolves to [`DEFAULT_TICK_HZ`]:
    /// a `.4v` header's `tempo` field is a bars/beats value in `[1, 64]`,
    /// not a tick rate, and spec.md names no formula for deriving one from
    /// it, so this implementation does not invent one. Callers that want a
    /// tempo-derived tick rate should compute and pass it explicitly.
    pub fn init(&mut self, rate_hz: u32, max_ticks: u64) -> Result<(), Error> {
        let Some(song) = self.song.clone() else {
            return Err(Error::Internal);
        };

        let tick_hz = if rate_hz == TICK_HZ_FROM_SONG {
            DEFAULT_TICK_HZ
        } else {
            rate_hz
        };
        if !TICK_HZ_RANGE.contains(&tick_hz) {
            return Err(Error::Arg(format!(
                "tick rate {tick_hz} outside {:?}",
                TICK_HZ_RANGE
            )));
        }
        self.config.tick_hz = tick_hz;
        self.config.max_ticks = max_ticks;

        let valid_instruments = self.voice_set.as_ref().map(|vs| vs.used).unwrap_or(u32::MAX);
        let mut sequencer = Sequencer::new(song, valid_instruments, 0);
        sequencer.set_max_ticks(max_ticks);
        sequencer.set_end_detect(self.config.end_detect);
        self.sequencer = Some(sequencer);
        self.pending.clear();

        if self.voice_set.is_some() && self.backend.is_none() {
            self.rebuild_backend()?;
        }
        Ok(())
    }

    /// Run the sequencer to its natural end (or `max_ticks`) without
    /// mixing any audio, returning `(ticks, milliseconds)` (spec §6
    /// `measure`).
    ///
    /// Uses a scratch sequencer independent of the one `play` drives, so
    /// calling `measure` mid-playback does not disturb playback position.
    pub fn measure(&mut self) -> Result<(u64, u64), Error> {
        let Some(song) = self.song.clone() else {
            return Err(Error::Internal);
        };
        let valid_instruments = self.voice_set.as_ref().map(|vs| vs.used).unwrap_or(u32::MAX);
        let mut probe = Sequencer::new(song, valid_instruments, 0);
        probe.set_max_ticks(self.config.max_ticks);
        probe.set_end_detect(self.config.end_detect);
        while !probe.is_done() {
            probe.tick()?;
        }
        let ticks = probe.tick_count();
        let ms = ticks.saturating_mul(1000) / self.config.tick_hz.max(1) as u64;
        Ok((ticks, ms))
    }

    /// How many output samples one sequencer tick covers at the current
    /// back-end sample rate (spec §6 `pcm_per_tick = round(spr / rate)`).
    fn pcm_per_tick(&self) -> usize {
        let Some(backend) = &self.backend else { return 0 };
        let spr = backend.sample_rate() as u64;
        let hz = self.config.tick_hz.max(1) as u64;
        ((spr + hz / 2) / hz) as usize
    }

    /// Render up to `buf.len()` samples, ticking the sequencer as needed.
    /// Returns the number of samples written, which is less than
    /// `buf.len()` only once playback has reached its end.
    pub fn push(&mut self, buf: &mut [i16]) -> Result<usize, Error> {
        let mut written = 0;
        while written < buf.len() {
            if self.pending.is_empty() {
                let is_done = match &self.sequencer {
                    Some(sequencer) => sequencer.is_done(),
                    None => return Err(Error::Internal),
                };
                if is_done {
                    break;
                }
                let pcm_per_tick = self.pcm_per_tick();
                if pcm_per_tick == 0 {
                    return Err(Error::Internal);
                }

                let sequencer = self.sequencer.as_mut().ok_or(Error::Internal)?;
                sequencer.tick()?;

                let voice_set = self.voice_set.as_ref().ok_or(Error::Internal)?;
                let backend = self.backend.as_mut().ok_or(Error::Internal)?;
                let mut tick_buf = vec![0i32; pcm_per_tick];
                backend.push(sequencer.chans(), voice_set, &mut tick_buf)?;
                self.pending.extend(tick_buf);
            }

            let take = (buf.len() - written).min(self.pending.len());
            for slot in buf[written..written + take].iter_mut() {
                *slot = clamp_i16(self.pending.pop_front().unwrap());
            }
            written += take;
        }
        Ok(written)
    }

    /// C-ABI-shaped mirror of [`Player::push`] (spec §6 `play(buf, N) ->
    /// i16`): fills the first `n` entries of `buf`, returning the count
    /// produced, or a negative sentinel on error.
    pub fn play(&mut self, buf: &mut [i16], n: usize) -> i32 {
        let n = n.min(buf.len());
        match self.push(&mut buf[..n]) {
            Ok(written) => written as i32,
            Err(_) => -1,
        }
    }

    /// Set the stereo crosstalk blend and voice/output-channel permutation
    /// (spec §6 `blend`). Returns [`Error::Mixer`] wrapping
    /// [`quartet_mixer::MixerError::Unsupported`] on a back-end with no
    /// stereo blend (Falcon DMA, YM-2149, the generic software mixer).
    pub fn blend(&mut self, channel_map: ChannelMap, lr8: u16) -> Result<(), Error> {
        let config = self.config.clone().with_blend(lr8, channel_map)?;
        self.config = config;
        match &mut self.backend {
            Some(backend) => backend.set_blend(lr8).map_err(Error::from),
            None => Ok(()),
        }
    }

    /// A read-only snapshot of the player's current format, rates, and
    /// mixer choice (spec §6 `info`).
    pub fn info(&self) -> Info {
        Info {
            format: self.format.unwrap_or(LoadedFormat::SongOnly),
            input_rate_hz: self.voice_set.as_ref().map(|vs| vs.khz as u32 * 1000),
            output_rate_hz: self.backend.as_ref().map(|b| b.sample_rate()).unwrap_or(0),
            mixer_name: self.config.mixer.name(),
            tick_hz: self.config.tick_hz,
            comment: self.comment.clone(),
        }
    }

    /// Replace this player's configuration wholesale (e.g. from a
    /// previously built [`PlayerConfig`]).
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// The free-text comment from a loaded `.4q` bundle, if any (also
    /// available via [`Player::info`]).
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

fn clamp_i16(sample: i32) -> i16 {
    sample.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
