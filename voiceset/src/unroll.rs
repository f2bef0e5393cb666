//! The unroll pass (spec §4.D)
//!
//! The original engine moved instruments downward in a single shared
//! buffer, sorted by descending address, so that copying never clobbered
//! data it hadn't read yet. This workspace builds a fresh arena per
//! instrument instead (§9's "arena + index" re-architecture), so the
//! descending-address ordering no longer has a correctness role — but it is
//! kept as the iteration order here anyway, since it is a harmless, free
//! fidelity to the source's behavior and makes output instrument ordering
//! deterministic and easy to diff against the original tool's output.

use crate::module::Inst;
use crate::parser::RawInstrument;

/// Target tail pad length appended past each instrument's valid samples.
pub const VSET_UNROLL: usize = 1024;

/// Build a fully unrolled [`Inst`] from a validated raw span.
pub(crate) fn unroll_instrument(data: &[u8], raw: &RawInstrument) -> Inst {
    let len = raw.len as usize;
    let tail = VSET_UNROLL;
    let end = len + tail;

    let mut pcm = Vec::with_capacity(end);
    for &byte in &data[raw.data_pos..raw.data_pos + len] {
        pcm.push((byte ^ 0x80) as i8);
    }

    if raw.lpl > 0 {
        let lpl = raw.lpl as usize;
        let loop_start = len - lpl;
        for j in 0..tail {
            pcm.push(pcm[loop_start + (j % lpl)]);
        }
    } else {
        // Carry the decay in 16.8 fixed point across the whole tail and
        // truncate only the output byte; re-rounding to `i8` every
        // iteration loses the fractional remainder and drifts from the
        // original tool's output after a handful of samples.
        let mut v: i32 = (pcm.last().copied().unwrap_or(0) as i32) << 8;
        for _ in 0..tail {
            v = (3 * v) >> 2;
            pcm.push((v >> 8) as i8);
        }
    }

    Inst {
        pcm,
        len: raw.len,
        lpl: raw.lpl,
        end: end as u32,
    }
}

/// Sort a batch of raw instruments by descending data address (see module
/// doc comment for why this ordering is now cosmetic rather than load
/// bearing).
pub(crate) fn sort_descending_address(instruments: &mut [RawInstrument]) {
    instruments.sort_by(|a, b| b.data_pos.cmp(&a.data_pos));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(data_pos: usize, len: u32, lpl: u32) -> RawInstrument {
        RawInstrument {
            slot: 0,
            data_pos,
            len,
            lpl,
        }
    }

    #[test]
    fn sign_flips_pcm() {
        let data = [0x00u8, 0x40, 0xC0, 0xFF];
        let inst = unroll_instrument(&data, &raw(0, 4, 0));
        assert_eq!(&inst.pcm[..4], &[-128, -64, 64, 127]);
    }

    #[test]
    fn end_is_len_plus_unroll_target() {
        let data = [0u8; 4];
        let inst = unroll_instrument(&data, &raw(0, 4, 0));
        assert_eq!(inst.end, 4 + VSET_UNROLL as u32);
        assert_eq!(inst.pcm.len(), inst.end as usize);
    }

    #[test]
    fn looped_tail_continues_loop_body() {
        // len=4, lpl=2: loop body is pcm[2..4]
        let data = [0x80u8, 0x80, 0x00, 0xFF]; // -> signed [0, 0, -128, 127]
        let inst = unroll_instrument(&data, &raw(0, 4, 2));
        let loop_body = &inst.pcm[2..4];
        for j in 0..VSET_UNROLL {
            assert_eq!(
                inst.pcm[4 + j],
                loop_body[j % 2],
                "tail sample {j} must continue the loop body"
            );
        }
    }

    #[test]
    fn one_shot_tail_decays_toward_silence() {
        let data = [0x80u8, 0x80, 0x80, 0xFF]; // last signed sample = 127
        let inst = unroll_instrument(&data, &raw(0, 4, 0));
        // Decay is monotonically non-increasing in magnitude and eventually
        // reaches zero well within the pad.
        assert!(inst.pcm[4] <= 127);
        assert_eq!(inst.pcm[inst.pcm.len() - 1], 0);
    }

    #[test]
    fn sort_descending_orders_by_address() {
        let mut instruments = vec![raw(10, 1, 0), raw(100, 1, 0), raw(50, 1, 0)];
        sort_descending_address(&mut instruments);
        let positions: Vec<usize> = instruments.iter().map(|r| r.data_pos).collect();
        assert_eq!(positions, vec![100, 50, 10]);
    }
}
