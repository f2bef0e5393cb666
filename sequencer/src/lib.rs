//! Per-voice command interpreter and tick clock for Quartet scores (spec
//! components F and G)
//!
//! Four voices share one tick clock. Each tick, every unmuted voice's
//! command stream is walked until it blocks on a non-zero `wait`; the
//! resulting [`Trig`] and pitch state feed the mixer front-end.

mod error;
mod module;
mod tick;

pub use error::SequencerError;
pub use module::{Chan, LoopFrame, NoteState, Trig, LOOP_STACK_DEPTH};

use std::rc::Rc;

use quartet_song::{Opcode, Song};

/// Number of voices a [`Sequencer`] drives.
pub const NUM_VOICES: usize = 4;

/// Default tick rate in Hz.
pub const DEFAULT_TICK_HZ: u32 = 200;

/// Valid range for the tick rate.
pub const TICK_HZ_RANGE: std::ops::RangeInclusive<u32> = 50..=800;

/// Drives four [`Chan`]s against a [`Song`] at a fixed tick rate, detecting
/// the song's natural end.
///
/// Owns the song via `Rc` rather than borrowing it, so a long-lived player
/// can hold both the song and its sequencer without a self-referential
/// struct (spec §3 "Lifecycle").
pub struct Sequencer {
    song: Rc<Song>,
    valid_instruments: u32,
    chans: [Chan; NUM_VOICES],
    tick: u64,
    has_loop_mask: u8,
    muted_voices: u8,
    max_ticks: u64,
    end_detect: bool,
}

impl Sequencer {
    /// Build a sequencer for `song`, restricted to the instrument slots
    /// `valid_instruments` that the paired voice-set actually validated.
    pub fn new(song: Rc<Song>, valid_instruments: u32, muted_voices: u8) -> Sequencer {
        let chans = std::array::from_fn(|k| {
            let muted = muted_voices & (1 << k) != 0;
            let end = voice_end(&song, k);
            let mut chan = Chan::new(song.seq[k], end, muted);
            let (sq0, sqn) = sound_span(&song, song.seq[k], end);
            chan.sq0 = sq0;
            chan.sqn = sqn;
            chan
        });

        let mut has_loop_mask = 0u8;
        for (k, chan) in chans.iter().enumerate() {
            if chan.has_loop > 0 {
                has_loop_mask |= 1 << k;
            }
        }

        Sequencer {
            song,
            valid_instruments,
            chans,
            tick: 0,
            has_loop_mask,
            muted_voices,
            max_ticks: 0,
            end_detect: true,
        }
    }

    /// Cap playback at `max_ticks` ticks (0 = unlimited, run until natural end).
    pub fn set_max_ticks(&mut self, max_ticks: u64) {
        self.max_ticks = max_ticks;
    }

    /// Enable or disable the all-voices-looped end check.
    pub fn set_end_detect(&mut self, end_detect: bool) {
        self.end_detect = end_detect;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn chans(&self) -> &[Chan; NUM_VOICES] {
        &self.chans
    }

    /// Advance every unmuted voice by one tick.
    pub fn tick(&mut self) -> Result<(), SequencerError> {
        for k in 0..NUM_VOICES {
            if self.muted_voices & (1 << k) != 0 {
                continue;
            }
            let before = self.chans[k].has_loop;
            tick::tick_voice(&mut self.chans[k], &self.song, self.valid_instruments)?;
            if self.chans[k].has_loop > before {
                self.has_loop_mask |= 1 << k;
            }
        }
        self.tick += 1;
        Ok(())
    }

    /// `true` once the song's natural end (or a `max_ticks` cutoff) has been
    /// reached (spec §4.F end detection).
    pub fn is_done(&self) -> bool {
        if self.end_detect && self.has_loop_mask == 0b1111 {
            return true;
        }
        if self.max_ticks > 0 && self.tick > self.max_ticks {
            return true;
        }
        false
    }
}

/// One past the last command belonging to voice `k` (the next voice's start,
/// or the end of the command array for the last voice).
fn voice_end(song: &Song, k: usize) -> usize {
    song.seq
        .get(k + 1)
        .copied()
        .filter(|&next| next > song.seq[k])
        .unwrap_or(song.commands.len())
}

/// First and last `Play`/`Slide` command indices within `[start, end)`, used
/// by the whole-sequence loop suppression rule.
fn sound_span(song: &Song, start: usize, end: usize) -> (Option<usize>, Option<usize>) {
    let mut first = None;
    let mut last = None;
    for (i, cmd) in song.commands[start..end].iter().enumerate() {
        if matches!(cmd.cmd, Opcode::Play | Opcode::Slide) {
            let idx = start + i;
            first.get_or_insert(idx);
            last = Some(idx);
        }
    }
    (first, last)
}
