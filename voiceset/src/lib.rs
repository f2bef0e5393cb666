//! Parser and instrument unroller for the Quartet `.set` voice-set format
//! (spec component D)

mod error;
mod module;
mod parser;
mod unroll;

pub use error::VoiceSetError;
pub use module::{Inst, VoiceSet, NUM_INSTRUMENTS};
pub use parser::{VSET_HEADER_SIZE, VSET_MAX_SIZE, VSET_XSIZE};
pub use unroll::VSET_UNROLL;

use parser::parse_header;
use unroll::{sort_descending_address, unroll_instrument};

/// Parse and fully unroll a `.set` voice-set.
///
/// Every instrument that validates is unrolled immediately (spec §4.D); an
/// instrument that fails validation is logged and simply absent from the
/// result rather than failing the whole load, unless `song_uses` names a
/// slot that never validated.
pub fn parse_voiceset(data: &[u8]) -> Result<VoiceSet, VoiceSetError> {
    let mut header = parse_header(data)?;
    sort_descending_address(&mut header.instruments);

    let mut instruments: [Option<Inst>; NUM_INSTRUMENTS] = Default::default();
    let mut used = 0u32;
    for raw in &header.instruments {
        let inst = unroll_instrument(data, raw);
        instruments[raw.slot as usize] = Some(inst);
        used |= 1 << raw.slot;
    }

    Ok(VoiceSet {
        khz: header.khz,
        instruments,
        used,
    })
}

/// Confirm every instrument slot the song references actually validated in
/// this voice-set, per spec §4.D's subset check.
pub fn check_song_coverage(voice_set: &VoiceSet, song_instrument_use: u32) -> Result<(), VoiceSetError> {
    if voice_set.covers(song_instrument_use) {
        Ok(())
    } else {
        let missing = song_instrument_use & !voice_set.used;
        let slot = missing.trailing_zeros() as u8;
        Err(VoiceSetError::SongUsesTaintedInstrument(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSET_TABLE_START: usize = 142;

    fn header_with_one_instrument(len: u32, lpl: u32, samples: &[u8]) -> Vec<u8> {
        let mut h = vec![0u8; VSET_HEADER_SIZE];
        h[0] = 8; // khz
        h[1] = 2; // nbi_field -> nbi = 1
        let data_pos = VSET_HEADER_SIZE;
        let off = (data_pos as u32) + VSET_HEADER_SIZE as u32 - 8;
        h[OFFSET_TABLE_START..OFFSET_TABLE_START + 4].copy_from_slice(&off.to_be_bytes());
        h.resize(data_pos + samples.len(), 0);
        h[data_pos - 4..data_pos].copy_from_slice(&(len << 16).to_be_bytes());
        let lpl_field = if lpl == 0 { 0xFFFF_FFFFu32 } else { lpl << 16 };
        h[data_pos - 8..data_pos - 4].copy_from_slice(&lpl_field.to_be_bytes());
        h[data_pos..data_pos + samples.len()].copy_from_slice(samples);
        h
    }

    #[test]
    fn parses_and_unrolls_one_instrument() {
        let data = header_with_one_instrument(4, 0, &[0x00, 0x40, 0xC0, 0xFF]);
        let vs = parse_voiceset(&data).unwrap();
        assert_eq!(vs.khz, 8);
        assert_eq!(vs.used, 1);
        let inst = vs.instrument(0).unwrap();
        assert_eq!(&inst.pcm[..4], &[-128, -64, 64, 127]);
        assert_eq!(inst.end, 4 + VSET_UNROLL as u32);
    }

    #[test]
    fn covers_checks_song_usage_subset() {
        let data = header_with_one_instrument(4, 0, &[0, 0, 0, 0]);
        let vs = parse_voiceset(&data).unwrap();
        assert!(check_song_coverage(&vs, 0b1).is_ok());
        assert!(check_song_coverage(&vs, 0b10).is_err());
    }
}
