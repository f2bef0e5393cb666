//! Parser for the Quartet `.4v` score format (spec component C)
//!
//! A `.4v` file is a 16-byte header followed by a stream of fixed 12-byte
//! commands, four independent voices multiplexed into one stream and
//! delimited by `F` (end-of-voice) commands.

mod error;

pub use error::SongError;

use quartet_fixed::{Step, SEQ_STP_MAX, SEQ_STP_MIN};
use quartet_format::{Bin, Reader};

/// Maximum accepted `.4v` file size (2^18 bytes).
pub const SONG_MAX_SIZE: usize = 1 << 18;

/// Size in bytes of one encoded sequence command.
pub const SEQ_CMD_SIZE: usize = 12;

/// Size in bytes of the `.4v` header.
pub const SONG_HEADER_SIZE: usize = 16;

/// Number of voices in a Quartet score.
pub const NUM_VOICES: usize = 4;

/// Number of instrument slots a voice-set can hold.
pub const NUM_INSTRUMENTS: usize = 20;

const OP_PLAY: u8 = b'P';
const OP_SLIDE: u8 = b'S';
const OP_REST: u8 = b'R';
const OP_VOICE: u8 = b'V';
const OP_LOOP_SET: u8 = b'l';
const OP_LOOP_TO: u8 = b'L';
const OP_FIN: u8 = b'F';

/// A decoded sequence opcode (spec §3 `SeqCmd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `P` — play a note.
    Play,
    /// `S` — slide to a target pitch.
    Slide,
    /// `R` — rest.
    Rest,
    /// `V` — change the current instrument.
    VoiceChange,
    /// `l` — push a loop return point.
    LoopSet,
    /// `L` — loop back to the last pushed point.
    LoopTo,
    /// `F` — end of this voice's sequence.
    Fin,
}

impl Opcode {
    fn from_byte(b: u8) -> Option<Opcode> {
        match b {
            OP_PLAY => Some(Opcode::Play),
            OP_SLIDE => Some(Opcode::Slide),
            OP_REST => Some(Opcode::Rest),
            OP_VOICE => Some(Opcode::VoiceChange),
            OP_LOOP_SET => Some(Opcode::LoopSet),
            OP_LOOP_TO => Some(Opcode::LoopTo),
            OP_FIN => Some(Opcode::Fin),
            _ => None,
        }
    }
}

/// One fixed 12-byte sequence command (spec §3 `SeqCmd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqCmd {
    pub cmd: Opcode,
    pub len: u16,
    pub step: u32,
    pub par: u32,
}

/// A parsed `.4v` score.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub khz: u16,
    pub bar: u16,
    pub tempo: u16,
    pub sig_m: u8,
    pub sig_d: u8,
    /// Decoded command stream (includes synthetic stub commands appended
    /// for silent/missing voices).
    pub commands: Vec<SeqCmd>,
    /// Start index into `commands` for each voice.
    pub seq: [usize; NUM_VOICES],
    /// Observed minimum pitch step across `P`/`S` commands, if any.
    pub stepmin: Option<u32>,
    /// Observed maximum pitch step across `P`/`S` commands, if any.
    pub stepmax: Option<u32>,
    /// Bitmask of instrument slots referenced by any `P` command.
    pub instrument_use: u32,
    /// `true` if trailing bytes existed past the last voice's closing `F`.
    pub had_trailing_garbage: bool,
}

impl Song {
    /// A one-tick rest followed by `F`, used to fill a missing/silent voice.
    fn stub_commands() -> [SeqCmd; 2] {
        [
            SeqCmd {
                cmd: Opcode::Rest,
                len: 1,
                step: 0,
                par: 0,
            },
            SeqCmd {
                cmd: Opcode::Fin,
                len: 0,
                step: 0,
                par: 0,
            },
        ]
    }
}

struct VoiceBuild {
    seq: Option<usize>,
    has_note: bool,
    cur_instrument: u32,
}

impl VoiceBuild {
    fn new() -> VoiceBuild {
        VoiceBuild {
            seq: None,
            has_note: false,
            cur_instrument: 0,
        }
    }
}

/// Parse a `.4v` file.
pub fn parse_song(data: &[u8]) -> Result<Song, SongError> {
    if data.len() > SONG_MAX_SIZE {
        return Err(SongError::TooLarge(data.len()));
    }
    if data.len() < SONG_HEADER_SIZE {
        return Err(SongError::TooSmall);
    }

    let mut r = Reader::new(data);
    let khz = r.u16be().map_err(|_| SongError::TooSmall)?;
    let bar = r.u16be().map_err(|_| SongError::TooSmall)?;
    let tempo = r.u16be().map_err(|_| SongError::TooSmall)?;
    let sig_m = r.u8().map_err(|_| SongError::TooSmall)?;
    let sig_d = r.u8().map_err(|_| SongError::TooSmall)?;
    r.skip(8); // reserved

    if !(4..=20).contains(&khz) {
        return Err(SongError::InvalidKhz(khz));
    }
    if bar == 0 || !(4..=48).contains(&bar) || bar % 4 != 0 {
        return Err(SongError::InvalidBar(bar));
    }
    if !(1..=64).contains(&tempo) {
        return Err(SongError::InvalidTempo(tempo));
    }
    if !(sig_m >= 1 && sig_m <= sig_d && sig_d <= 4) {
        return Err(SongError::InvalidSignature(sig_m, sig_d));
    }

    let body = &data[SONG_HEADER_SIZE..];
    let logical_len = (body.len() / SEQ_CMD_SIZE) * SEQ_CMD_SIZE;
    let bin = Bin::with_logical_len(body.to_vec(), logical_len);
    let num_cmds = bin.logical_len() / SEQ_CMD_SIZE;

    let mut commands = Vec::with_capacity(num_cmds);
    let mut seq: [usize; NUM_VOICES] = [usize::MAX; NUM_VOICES];
    let mut stepmin: Option<u32> = None;
    let mut stepmax: Option<u32> = None;
    let mut instrument_use: u32 = 0;
    let mut k: usize = 0;
    let mut voice = VoiceBuild::new();

    let mut cr = Reader::new(bin.logical_slice());
    for _ in 0..num_cmds {
        if k >= NUM_VOICES {
            break;
        }
        let cmd_byte_hi = cr.u8().map_err(|_| SongError::Truncated)?;
        let cmd_byte_lo = cr.u8().map_err(|_| SongError::Truncated)?;
        let cmd_word = u16::from_be_bytes([cmd_byte_hi, cmd_byte_lo]);
        let len = cr.u16be().map_err(|_| SongError::Truncated)?;
        let step = cr.u32be().map_err(|_| SongError::Truncated)?;
        let par = cr.u32be().map_err(|_| SongError::Truncated)?;

        let op_byte = (cmd_word & 0xFF) as u8;
        let op = Opcode::from_byte(op_byte).ok_or(SongError::UnknownOpcode(op_byte))?;

        if voice.seq.is_none() {
            voice.seq = Some(commands.len());
        }

        let track_step = |stepmin: &mut Option<u32>, stepmax: &mut Option<u32>, s: u32| {
            *stepmin = Some(stepmin.map_or(s, |m| m.min(s)));
            *stepmax = Some(stepmax.map_or(s, |m| m.max(s)));
        };

        match op {
            Opcode::Play => {
                voice.has_note = true;
                instrument_use |= 1 << voice.cur_instrument;
                track_step(&mut stepmin, &mut stepmax, step);
            }
            Opcode::Slide => {
                if step < SEQ_STP_MIN || step > SEQ_STP_MAX {
                    return Err(SongError::StepOutOfRange(step));
                }
                voice.has_note = true;
                track_step(&mut stepmin, &mut stepmax, step);
            }
            Opcode::VoiceChange => {
                if (par & !(31 << 2)) != 0 || (par >> 2) >= NUM_INSTRUMENTS as u32 {
                    return Err(SongError::InvalidInstrumentRef(par));
                }
                voice.cur_instrument = par >> 2;
            }
            Opcode::Rest | Opcode::LoopSet | Opcode::LoopTo => {}
            Opcode::Fin => {
                if !voice.has_note {
                    tracing::warn!(voice = k, "voice has no Play/Slide command, replacing with silence stub");
                    let stub_start = commands.len();
                    commands.truncate(voice.seq.unwrap_or(stub_start));
                    let stub_start = commands.len();
                    commands.extend_from_slice(&Song::stub_commands());
                    seq[k] = stub_start;
                } else {
                    seq[k] = voice.seq.unwrap();
                    commands.push(SeqCmd {
                        cmd: Opcode::Fin,
                        len,
                        step,
                        par,
                    });
                }
                voice = VoiceBuild::new();
                k += 1;
                continue;
            }
        }

        commands.push(SeqCmd {
            cmd: op,
            len,
            step,
            par,
        });
    }

    let had_trailing_garbage = bin.tail_remainder(SEQ_CMD_SIZE) != 0;

    // Close a voice left open at end of stream, and fill any voices never
    // delimited by an `F` at all.
    if k < NUM_VOICES && voice.seq.is_some() {
        if voice.has_note {
            commands.push(SeqCmd {
                cmd: Opcode::Fin,
                len: 0,
                step: 0,
                par: 0,
            });
            seq[k] = voice.seq.unwrap();
        } else {
            let stub_start = commands.len();
            commands.extend_from_slice(&Song::stub_commands());
            seq[k] = stub_start;
        }
        k += 1;
    }
    while k < NUM_VOICES {
        let stub_start = commands.len();
        commands.extend_from_slice(&Song::stub_commands());
        seq[k] = stub_start;
        k += 1;
    }

    Ok(Song {
        khz,
        bar,
        tempo,
        sig_m,
        sig_d,
        commands,
        seq,
        stepmin,
        stepmax,
        instrument_use,
        had_trailing_garbage,
    })
}

/// `true` if `step` lies in the valid slide range; exposed so callers that
/// build synthetic commands can reuse the same bound the parser enforces.
pub fn step_in_range(step: u32) -> bool {
    let s = Step::from_raw(step);
    s.in_valid_range()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(khz: u16, bar: u16, tempo: u16, sig_m: u8, sig_d: u8) -> Vec<u8> {
        let mut h = Vec::with_capacity(SONG_HEADER_SIZE);
        h.extend_from_slice(&khz.to_be_bytes());
        h.extend_from_slice(&bar.to_be_bytes());
        h.extend_from_slice(&tempo.to_be_bytes());
        h.push(sig_m);
        h.push(sig_d);
        h.extend_from_slice(&[0u8; 8]);
        h
    }

    fn cmd(op: u8, len: u16, step: u32, par: u32) -> Vec<u8> {
        let mut c = Vec::with_capacity(SEQ_CMD_SIZE);
        c.extend_from_slice(&(op as u16).to_be_bytes());
        c.extend_from_slice(&len.to_be_bytes());
        c.extend_from_slice(&step.to_be_bytes());
        c.extend_from_slice(&par.to_be_bytes());
        c
    }

    fn voice_with_note() -> Vec<u8> {
        let mut v = Vec::new();
        v.extend(cmd(b'P', 4, 0x10000, 0));
        v.extend(cmd(b'F', 0, 0, 0));
        v
    }

    #[test]
    fn rejects_bad_header_fields() {
        assert!(matches!(
            parse_song(&header(3, 4, 1, 1, 1)),
            Err(SongError::InvalidKhz(3))
        ));
        assert!(matches!(
            parse_song(&header(8, 5, 1, 1, 1)),
            Err(SongError::InvalidBar(5))
        ));
        assert!(matches!(
            parse_song(&header(8, 4, 0, 1, 1)),
            Err(SongError::InvalidTempo(0))
        ));
        assert!(matches!(
            parse_song(&header(8, 4, 1, 3, 2)),
            Err(SongError::InvalidSignature(3, 2))
        ));
    }

    #[test]
    fn parses_four_voices_with_notes() {
        let mut data = header(8, 4, 1, 1, 1);
        for _ in 0..4 {
            data.extend(voice_with_note());
        }
        let song = parse_song(&data).unwrap();
        assert_eq!(song.seq.len(), 4);
        for k in 0..4 {
            assert_eq!(song.commands[song.seq[k]].cmd, Opcode::Play);
        }
        assert_eq!(song.stepmin, Some(0x10000));
        assert_eq!(song.stepmax, Some(0x10000));
        assert_eq!(song.instrument_use, 1);
    }

    #[test]
    fn silent_voice_is_replaced_by_stub() {
        let mut data = header(8, 4, 1, 1, 1);
        data.extend(cmd(b'F', 0, 0, 0)); // voice 0: empty, immediate F
        for _ in 0..3 {
            data.extend(voice_with_note());
        }
        let song = parse_song(&data).unwrap();
        assert_eq!(song.commands[song.seq[0]].cmd, Opcode::Rest);
        assert_eq!(song.commands[song.seq[0] + 1].cmd, Opcode::Fin);
    }

    #[test]
    fn missing_voices_are_filled_with_stubs() {
        let mut data = header(8, 4, 1, 1, 1);
        data.extend(voice_with_note()); // only one voice present
        let song = parse_song(&data).unwrap();
        assert_eq!(song.commands[song.seq[0]].cmd, Opcode::Play);
        for k in 1..4 {
            assert_eq!(song.commands[song.seq[k]].cmd, Opcode::Rest);
        }
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        let mut data = header(8, 4, 1, 1, 1);
        data.extend(cmd(b'Z', 0, 0, 0));
        assert!(matches!(
            parse_song(&data),
            Err(SongError::UnknownOpcode(b'Z'))
        ));
    }

    #[test]
    fn slide_step_out_of_range_is_an_error() {
        let mut data = header(8, 4, 1, 1, 1);
        data.extend(cmd(b'S', 4, 1, 0x1000));
        assert!(matches!(
            parse_song(&data),
            Err(SongError::StepOutOfRange(1))
        ));
    }

    #[test]
    fn voice_change_out_of_range_is_an_error() {
        let mut data = header(8, 4, 1, 1, 1);
        data.extend(cmd(b'V', 0, 0, 20 << 2));
        assert!(matches!(
            parse_song(&data),
            Err(SongError::InvalidInstrumentRef(_))
        ));
    }

    #[test]
    fn trailing_bytes_after_last_voice_are_a_warning_not_an_error() {
        let mut data = header(8, 4, 1, 1, 1);
        for _ in 0..4 {
            data.extend(voice_with_note());
        }
        data.extend_from_slice(&[0xAA; 5]);
        let song = parse_song(&data).unwrap();
        assert!(song.had_trailing_garbage);
    }

    #[test]
    fn parse_is_idempotent_on_canonical_form() {
        let mut data = header(8, 4, 1, 1, 1);
        for _ in 0..4 {
            data.extend(voice_with_note());
        }
        let first = parse_song(&data).unwrap();
        // Tail padding beyond a whole number of 12-byte commands must not
        // affect the parse.
        let mut padded = data.clone();
        padded.extend_from_slice(&[0, 0, 0]);
        let second = parse_song(&padded).unwrap();
        assert_eq!(first.commands, second.commands);
        assert_eq!(first.seq, second.seq);
    }
}
