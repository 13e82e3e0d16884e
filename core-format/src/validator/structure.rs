//! Per-format byte-structure walkers.
//!
//! Each walker works on an in-memory window of the file and stops at its
//! end. Unit counts are capped so adversarial input cannot make a walk spin.

use crate::config::{FrameSkip, APPROXIMATE_FRAME_SKIP};
use crate::error::StructuralError;
use crate::mpeg::{adts_frame_len, is_adts_header, FrameHeader};
use crate::tags::id3v2::decode_synchsafe;
use serde::Serialize;

pub const MAX_FRAMES: usize = 100;
pub const MIN_FRAMES: usize = 10;
const FULL_CONFIDENCE_FRAMES: f64 = 50.0;

pub const MAX_PAGES: usize = 50;
pub const MIN_PAGES: usize = 2;
const FULL_CONFIDENCE_PAGES: f64 = 20.0;

/// Header-only AIFF check is weaker evidence than a full walk.
const AIFF_CONFIDENCE: f64 = 0.8;

const MAX_CHUNKS: usize = 1024;
const ID3V1_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralResult {
    pub is_valid: bool,
    pub confidence: f64,
    /// Frames, pages, blocks, chunks or boxes visited.
    pub units: usize,
    #[serde(skip)]
    pub error: Option<StructuralError>,
}

impl StructuralResult {
    fn valid(confidence: f64, units: usize) -> Self {
        Self {
            is_valid: true,
            confidence,
            units,
            error: None,
        }
    }

    fn invalid(error: StructuralError, units: usize) -> Self {
        Self {
            is_valid: false,
            confidence: 0.0,
            units,
            error: Some(error),
        }
    }

    /// Minimum-count rule shared by the frame and page scans.
    fn counted(units: usize, minimum: usize, full_at: f64, error: StructuralError) -> Self {
        if units >= minimum {
            Self::valid((units as f64 / full_at).min(1.0), units)
        } else {
            Self {
                is_valid: false,
                confidence: (units as f64 / full_at).min(1.0),
                units,
                error: Some(error),
            }
        }
    }
}

/// Offset of the first byte after a leading ID3v2 tag, or 0.
pub fn skip_id3v2(data: &[u8]) -> usize {
    match data.get(..10) {
        Some(header) if &header[..3] == b"ID3" => {
            let size = decode_synchsafe([header[6], header[7], header[8], header[9]]) as usize;
            // Only v2.4 defines a footer.
            let footer = if header[3] == 4 && header[5] & 0x10 != 0 { 10 } else { 0 };
            (10 + size + footer).min(data.len())
        }
        _ => 0,
    }
}

pub fn has_id3v1_trailer(data: &[u8]) -> bool {
    data.len() >= ID3V1_LEN && &data[data.len() - ID3V1_LEN..data.len() - ID3V1_LEN + 3] == b"TAG"
}

fn audio_end(data: &[u8]) -> usize {
    if has_id3v1_trailer(data) {
        data.len() - ID3V1_LEN
    } else {
        data.len()
    }
}

/// Counts MPEG frame headers after any ID3v2 tag.
pub fn walk_mp3(data: &[u8], frame_skip: FrameSkip) -> StructuralResult {
    let end = audio_end(data);
    let mut offset = skip_id3v2(data);
    let mut frames = 0;

    while offset + 4 <= end && frames < MAX_FRAMES {
        match FrameHeader::parse(&data[offset..end]) {
            Some(header) => {
                frames += 1;
                offset += match frame_skip {
                    FrameSkip::Approximate => APPROXIMATE_FRAME_SKIP,
                    FrameSkip::Exact => header
                        .frame_len()
                        .filter(|len| *len > 4)
                        .unwrap_or(APPROXIMATE_FRAME_SKIP),
                };
            }
            None => offset += 1,
        }
    }

    StructuralResult::counted(
        frames,
        MIN_FRAMES,
        FULL_CONFIDENCE_FRAMES,
        StructuralError::InsufficientFrames {
            found: frames,
            expected: MIN_FRAMES,
        },
    )
}

/// Raw AAC: same counting rules as MP3 with the ADTS sync word.
pub fn walk_adts(data: &[u8], frame_skip: FrameSkip) -> StructuralResult {
    let end = audio_end(data);
    let mut offset = skip_id3v2(data);
    let mut frames = 0;

    while offset + 7 <= end && frames < MAX_FRAMES {
        if is_adts_header(&data[offset..end]) {
            frames += 1;
            offset += match frame_skip {
                FrameSkip::Approximate => APPROXIMATE_FRAME_SKIP,
                FrameSkip::Exact => adts_frame_len(&data[offset..end]).unwrap_or(APPROXIMATE_FRAME_SKIP),
            };
        } else {
            offset += 1;
        }
    }

    StructuralResult::counted(
        frames,
        MIN_FRAMES,
        FULL_CONFIDENCE_FRAMES,
        StructuralError::InsufficientFrames {
            found: frames,
            expected: MIN_FRAMES,
        },
    )
}

pub fn starts_with_adts(data: &[u8]) -> bool {
    let offset = skip_id3v2(data);
    data.get(offset..).map(is_adts_header).unwrap_or(false)
}

/// Walks the metadata block chain looking for STREAMINFO.
pub fn walk_flac(data: &[u8]) -> StructuralResult {
    if !data.starts_with(b"fLaC") {
        return StructuralResult::invalid(StructuralError::InvalidSignature("fLaC".to_string()), 0);
    }

    let mut offset = 4usize;
    let mut blocks = 0;
    let mut has_stream_info = false;

    while let Some(header) = bytes_at(data, offset, 4) {
        let is_last = header[0] & 0x80 != 0;
        let block_type = header[0] & 0x7F;
        let block_size = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;

        blocks += 1;
        if block_type == 0 {
            has_stream_info = true;
        }
        if is_last || blocks >= MAX_CHUNKS {
            break;
        }
        offset = offset.saturating_add(4 + block_size);
    }

    if has_stream_info {
        StructuralResult::valid(1.0, blocks)
    } else {
        StructuralResult::invalid(StructuralError::MissingBlock("STREAMINFO".to_string()), blocks)
    }
}

/// RIFF chunk walk; needs both `fmt ` and `data`.
pub fn walk_wav(data: &[u8]) -> StructuralResult {
    let header_ok = data.get(..4) == Some(b"RIFF".as_slice())
        && data.get(8..12) == Some(b"WAVE".as_slice());
    if !header_ok {
        return StructuralResult::invalid(
            StructuralError::InvalidSignature("RIFF/WAVE".to_string()),
            0,
        );
    }

    let mut offset = 12usize;
    let mut chunks = 0;
    let mut has_fmt = false;
    let mut has_data = false;

    while let Some(header) = bytes_at(data, offset, 8) {
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        match &header[..4] {
            b"fmt " => has_fmt = true,
            b"data" => has_data = true,
            _ => {}
        }
        chunks += 1;
        if (has_fmt && has_data) || chunks >= MAX_CHUNKS {
            break;
        }
        // Payloads are padded to an even length.
        offset = offset.saturating_add(size.saturating_add(8 + (size & 1)));
    }

    match (has_fmt, has_data) {
        (true, true) => StructuralResult::valid(1.0, chunks),
        (false, _) => StructuralResult::invalid(StructuralError::MissingChunk("fmt ".to_string()), chunks),
        (true, false) => StructuralResult::invalid(StructuralError::MissingChunk("data".to_string()), chunks),
    }
}

/// FORM header check only.
pub fn walk_aiff(data: &[u8]) -> StructuralResult {
    let form_type = data.get(8..12);
    let header_ok = data.get(..4) == Some(b"FORM".as_slice())
        && (form_type == Some(b"AIFF".as_slice()) || form_type == Some(b"AIFC".as_slice()));
    if header_ok {
        StructuralResult::valid(AIFF_CONFIDENCE, 1)
    } else {
        StructuralResult::invalid(StructuralError::InvalidSignature("FORM/AIFF".to_string()), 0)
    }
}

/// Counts Ogg pages by following each page's segment table.
pub fn walk_ogg(data: &[u8]) -> StructuralResult {
    let mut offset = 0usize;
    let mut pages = 0;

    while pages < MAX_PAGES {
        let Some(start) = find(data, b"OggS", offset) else {
            break;
        };
        let Some(&segment_count) = data.get(start + 26) else {
            break;
        };
        let table_start = start + 27;
        let Some(segments) = data.get(table_start..table_start + segment_count as usize) else {
            break;
        };
        let payload: usize = segments.iter().map(|len| *len as usize).sum();

        pages += 1;
        offset = table_start + segments.len() + payload;
    }

    StructuralResult::counted(
        pages,
        MIN_PAGES,
        FULL_CONFIDENCE_PAGES,
        StructuralError::InsufficientPages {
            found: pages,
            expected: MIN_PAGES,
        },
    )
}

/// Top-level MP4 box walk; needs `ftyp` plus `moov` or `mdat`.
pub fn walk_mp4(data: &[u8]) -> StructuralResult {
    let mut offset = 0usize;
    let mut boxes = 0;
    let mut has_ftyp = false;
    let mut has_media = false;

    while let Some(header) = bytes_at(data, offset, 8) {
        let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let box_type = &header[4..8];

        boxes += 1;
        match box_type {
            b"ftyp" => has_ftyp = true,
            b"moov" | b"mdat" => has_media = true,
            _ => {}
        }

        let (size, header_len) = match declared {
            // Extends to end of file.
            0 => break,
            1 => match bytes_at(data, offset + 8, 8) {
                Some(large) => {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(large);
                    (u64::from_be_bytes(raw), 16)
                }
                None => break,
            },
            size => (size, 8),
        };

        if size < header_len || boxes >= MAX_CHUNKS {
            break;
        }
        match usize::try_from(size) {
            Ok(size) => offset = offset.saturating_add(size),
            Err(_) => break,
        }
    }

    if !has_ftyp {
        StructuralResult::invalid(StructuralError::MissingAtom("ftyp".to_string()), boxes)
    } else if !has_media {
        StructuralResult::invalid(StructuralError::MissingAtom("moov/mdat".to_string()), boxes)
    } else {
        StructuralResult::valid(1.0, boxes)
    }
}

/// Box walk result downgraded when the codec could not be confirmed.
pub fn require_codec(walk: StructuralResult, codec_confirmed: bool) -> StructuralResult {
    if walk.is_valid && !codec_confirmed {
        return StructuralResult::invalid(
            StructuralError::CodecUnverified("no playable audio track".to_string()),
            walk.units,
        );
    }
    walk
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

/// `len` bytes at `offset`, without overflowing on huge offsets.
fn bytes_at(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    data.get(offset..)?.get(..len)
}
