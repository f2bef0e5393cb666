//! Per-tick command interpreter (spec §4.F)

use quartet_song::{Opcode, SeqCmd, Song};

use crate::error::SequencerError;
use crate::module::{Chan, LoopFrame, Trig, LOOP_STACK_DEPTH};

/// Advance one voice by a single tick.
///
/// `valid_instruments` is the bitmask of instrument slots the active
/// voice-set actually validated; a `P` command referencing anything outside
/// it fails the whole load rather than silently mis-playing.
pub(crate) fn tick_voice(
    chan: &mut Chan,
    song: &Song,
    valid_instruments: u32,
) -> Result<(), SequencerError> {
    chan.trig = Trig::Nop;

    // Slide step.
    if chan.note.stp != 0 {
        let next = chan.note.cur as i64 + chan.note.stp as i64;
        if chan.note.stp > 0 {
            if next >= chan.note.aim as i64 {
                chan.note.cur = chan.note.aim;
                chan.note.stp = 0;
            } else {
                chan.note.cur = next as u32;
            }
        } else if next <= chan.note.aim as i64 {
            chan.note.cur = chan.note.aim;
            chan.note.stp = 0;
        } else {
            chan.note.cur = next as u32;
        }
        chan.trig = Trig::Slide;
    }

    if chan.wait > 0 {
        chan.wait -= 1;
        return Ok(());
    }

    while chan.wait == 0 {
        let cmd = song.commands[chan.cur];
        let this_pos = chan.cur;
        chan.cur += 1;

        match cmd.cmd {
            Opcode::Play => {
                validate_instrument(chan.curi, valid_instruments)?;
                chan.note.cur = cmd.step;
                chan.note.aim = cmd.step;
                chan.note.stp = 0;
                chan.trig = Trig::Note;
                chan.wait = cmd.len as u32;
            }
            Opcode::Slide => {
                chan.note.aim = cmd.step;
                chan.note.stp = cmd.par as i32;
                chan.trig = Trig::Slide;
                chan.wait = cmd.len as u32;
            }
            Opcode::Rest => {
                chan.trig = Trig::Stop;
                chan.wait = cmd.len as u32;
            }
            Opcode::VoiceChange => {
                validate_instrument(cmd.par >> 2, valid_instruments)?;
                chan.curi = cmd.par >> 2;
            }
            Opcode::LoopSet => push_loop(chan, this_pos + 1)?,
            Opcode::LoopTo => do_loop(chan, &cmd, this_pos),
            Opcode::Fin => {
                chan.cur = chan.seq;
                chan.has_loop += 1;
                chan.loop_stack.clear();
            }
        }
    }

    Ok(())
}

fn validate_instrument(idx: u32, valid_instruments: u32) -> Result<(), SequencerError> {
    if idx >= 20 {
        return Err(SequencerError::InstrumentOutOfRange(idx));
    }
    if valid_instruments & (1 << idx) == 0 {
        return Err(SequencerError::TaintedInstrument(idx));
    }
    Ok(())
}

fn push_loop(chan: &mut Chan, return_position: usize) -> Result<(), SequencerError> {
    if chan.loop_stack.len() >= LOOP_STACK_DEPTH {
        return Err(SequencerError::LoopStackOverflow);
    }
    chan.loop_stack.push(LoopFrame {
        return_position,
        remaining: 0,
    });
    Ok(())
}

/// `L` — loop back to the last pushed point, with the whole-sequence
/// suppression rule (spec §3 `SeqCmd`).
fn do_loop(chan: &mut Chan, cmd: &SeqCmd, loop_cmd_pos: usize) {
    if chan.loop_stack.is_empty() {
        // `L` with no prior `l`: loop back to the voice's own start, as if
        // an `l` had been set there with a zero count.
        chan.loop_stack.push(LoopFrame {
            return_position: chan.seq,
            remaining: 0,
        });
    }
    let top = chan.loop_stack.last_mut().unwrap();

    if top.remaining == 0 {
        let mut count = (cmd.par >> 16) + 1;
        if let (Some(sq0), Some(sqn)) = (chan.sq0, chan.sqn) {
            if top.return_position <= sq0 && loop_cmd_pos > sqn {
                count = 1;
            }
        }
        top.remaining = count;
    }

    top.remaining -= 1;
    if top.remaining > 0 {
        chan.cur = top.return_position;
    } else {
        chan.loop_stack.pop();
    }
}
