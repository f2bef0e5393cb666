//! `.set` header parsing and per-instrument validation

use quartet_format::Reader;
use tracing::warn;

use crate::module::NUM_INSTRUMENTS;
use crate::VoiceSetError;

/// Size in bytes of the `.set` header.
pub const VSET_HEADER_SIZE: usize = 222;

/// Maximum accepted `.set` file size (2^21 bytes).
pub const VSET_MAX_SIZE: usize = 1 << 21;

/// Headroom appended past the raw file for the unroller to write into.
pub const VSET_XSIZE: usize = NUM_INSTRUMENTS * 1024;

/// Byte offset of the 20-entry offset table within the header.
const OFFSET_TABLE_START: usize = 142;

/// A validated (but not yet unrolled) instrument span, located in the raw
/// file buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawInstrument {
    pub slot: u8,
    pub data_pos: usize,
    pub len: u32,
    pub lpl: u32,
}

pub(crate) struct ParsedHeader {
    pub khz: u8,
    /// Raw (validated) instruments; tainted/unused slots are simply absent.
    pub instruments: Vec<RawInstrument>,
}

/// Parse and validate the `.set` header and per-instrument metadata.
///
/// Sample data is *not* copied or sign-flipped here — that is the
/// unroller's job (`crate::unroll`). This pass only establishes which
/// instrument slots are well-formed.
pub(crate) fn parse_header(data: &[u8]) -> Result<ParsedHeader, VoiceSetError> {
    if data.len() > VSET_MAX_SIZE {
        return Err(VoiceSetError::TooLarge(data.len()));
    }
    if data.len() < VSET_HEADER_SIZE {
        return Err(VoiceSetError::TooSmall);
    }

    let mut r = Reader::new(data);
    let khz = r.u8().map_err(|_| VoiceSetError::TooSmall)?;
    if !(4..=20).contains(&khz) {
        return Err(VoiceSetError::InvalidKhz(khz));
    }
    let nbi_field = r.u8().map_err(|_| VoiceSetError::TooSmall)?;
    let nbi = nbi_field.saturating_sub(1).min(NUM_INSTRUMENTS as u8);

    let mut instruments = Vec::new();
    for slot in 0..nbi {
        let table_pos = OFFSET_TABLE_START + (slot as usize) * 4;
        let off = r
            .peek_u32be_at(table_pos)
            .map_err(|_| VoiceSetError::TooSmall)?;

        match validate_instrument(data, slot, off) {
            Ok(Some(raw)) => instruments.push(raw),
            Ok(None) => {
                // Offset of zero marks a genuinely absent slot; nothing to warn about.
            }
            Err(e) => {
                warn!("voice-set instrument {slot} tainted: {e}");
            }
        }
    }

    Ok(ParsedHeader { khz, instruments })
}

/// Validate a single instrument's offset/length/loop fields.
///
/// Returns `Ok(None)` for a slot that is present in the table but carries no
/// offset (a legitimately unused slot, skipped silently per spec §4.D).
fn validate_instrument(
    data: &[u8],
    slot: u8,
    off: u32,
) -> Result<Option<RawInstrument>, VoiceSetError> {
    if off == 0 {
        return Ok(None);
    }

    // "sample data begins at offset - 222 + 8"
    let data_pos = (off as i64) - (VSET_HEADER_SIZE as i64) + 8;
    if data_pos < 8 || data_pos as usize > data.len() {
        return Err(VoiceSetError::OffsetOutOfBounds(slot));
    }
    let data_pos = data_pos as usize;

    let len_pos = data_pos - 4;
    let lpl_pos = data_pos - 8;

    let raw_len = read_u32be(data, len_pos).ok_or(VoiceSetError::OffsetOutOfBounds(slot))?;
    let raw_lpl = read_u32be(data, lpl_pos).ok_or(VoiceSetError::OffsetOutOfBounds(slot))?;

    if raw_len & 0xFFFF != 0 {
        return Err(VoiceSetError::MisalignedLengthField(slot));
    }
    let len = raw_len >> 16;

    let lpl = if raw_lpl == 0xFFFF_FFFF {
        0
    } else {
        if raw_lpl & 0xFFFF != 0 {
            return Err(VoiceSetError::MisalignedLengthField(slot));
        }
        raw_lpl >> 16
    };

    if len == 0 {
        return Err(VoiceSetError::OffsetOutOfBounds(slot));
    }
    if lpl > len {
        return Err(VoiceSetError::LoopExceedsLength(slot));
    }
    if data_pos + len as usize > data.len() {
        return Err(VoiceSetError::SampleRunsPastBuffer(slot));
    }

    Ok(Some(RawInstrument {
        slot,
        data_pos,
        len,
        lpl,
    }))
}

fn read_u32be(data: &[u8], pos: usize) -> Option<u32> {
    let b = data.get(pos..pos + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(khz: u8, nbi_field: u8, offsets: &[(u8, u32)]) -> Vec<u8> {
        let mut h = vec![0u8; VSET_HEADER_SIZE];
        h[0] = khz;
        h[1] = nbi_field;
        for &(slot, off) in offsets {
            let pos = OFFSET_TABLE_START + slot as usize * 4;
            h[pos..pos + 4].copy_from_slice(&off.to_be_bytes());
        }
        h
    }

    #[test]
    fn rejects_bad_khz() {
        let h = header(3, 1, &[]);
        assert!(matches!(
            parse_header(&h),
            Err(VoiceSetError::InvalidKhz(3))
        ));
    }

    #[test]
    fn validates_one_instrument() {
        let mut data = header(8, 2, &[]);
        // instrument 0: data at header end (pos 222), len=4, lpl=0 (no loop)
        let data_pos = VSET_HEADER_SIZE;
        let off = (data_pos as u32) + VSET_HEADER_SIZE as u32 - 8;
        let pos = OFFSET_TABLE_START;
        data[pos..pos + 4].copy_from_slice(&off.to_be_bytes());

        data.resize(data_pos + 16, 0);
        data[data_pos - 4..data_pos].copy_from_slice(&(4u32 << 16).to_be_bytes());
        data[data_pos - 8..data_pos - 4].copy_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
        data[data_pos..data_pos + 4].copy_from_slice(&[0x00, 0x40, 0xC0, 0xFF]);

        let parsed = parse_header(&data).unwrap();
        assert_eq!(parsed.instruments.len(), 1);
        assert_eq!(parsed.instruments[0].len, 4);
        assert_eq!(parsed.instruments[0].lpl, 0);
    }

    #[test]
    fn misaligned_length_is_tainted_not_fatal() {
        let mut data = header(8, 2, &[]);
        let data_pos = VSET_HEADER_SIZE;
        let off = (data_pos as u32) + VSET_HEADER_SIZE as u32 - 8;
        data[OFFSET_TABLE_START..OFFSET_TABLE_START + 4].copy_from_slice(&off.to_be_bytes());
        data.resize(data_pos + 16, 0);
        // low 16 bits non-zero -> misaligned
        data[data_pos - 4..data_pos].copy_from_slice(&5u32.to_be_bytes());
        let parsed = parse_header(&data).unwrap();
        assert!(parsed.instruments.is_empty());
    }
}
