//! ID3v2.2, v2.3 and v2.4 tag parsing.
//!
//! Tag header: `"ID3"`, major version, revision, flags, then a synchsafe
//! 32-bit body size. Frame headers are 6 bytes in v2.2 (3-byte id, 24-bit
//! size) and 10 bytes in v2.3/v2.4 (4-byte id, 32-bit size, two flag bytes).
//! v2.4 frame sizes are synchsafe as well.

use super::encoding::TextEncoding;
use super::{genre, ArtworkType, AudioArtwork, AudioMetadata};
use crate::error::{FormatError, Result};
use bytes::Bytes;
use tracing::{debug, warn};

pub const HEADER_LEN: usize = 10;

const FLAG_UNSYNCHRONISATION: u8 = 0x80;
const FLAG_EXTENDED_HEADER: u8 = 0x40;
const FLAG_V22_COMPRESSION: u8 = 0x40;
const FLAG_FOOTER: u8 = 0x10;

/// Decodes a synchsafe integer; the top bit of each byte is ignored.
pub fn decode_synchsafe(bytes: [u8; 4]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, byte| (acc << 7) | u32::from(byte & 0x7F))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub major: u8,
    pub revision: u8,
    pub flags: u8,
    /// Body length, excluding header and footer.
    pub size: usize,
}

impl TagHeader {
    /// `Ok(None)` if `data` does not start with an ID3v2 tag.
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        if !data.starts_with(b"ID3") {
            return Ok(None);
        }
        let header = data.get(..HEADER_LEN).ok_or_else(|| {
            FormatError::CorruptedMetadata(format!(
                "truncated ID3v2 header: {} bytes",
                data.len()
            ))
        })?;

        let major = header[3];
        if !(2..=4).contains(&major) {
            return Err(FormatError::CorruptedMetadata(format!(
                "unsupported ID3v2 version 2.{}",
                major
            )));
        }

        Ok(Some(Self {
            major,
            revision: header[4],
            flags: header[5],
            size: decode_synchsafe([header[6], header[7], header[8], header[9]]) as usize,
        }))
    }

    /// Bytes occupied by the whole tag, including an optional footer.
    pub fn total_len(&self) -> usize {
        let footer = if self.major == 4 && self.flags & FLAG_FOOTER != 0 {
            HEADER_LEN
        } else {
            0
        };
        HEADER_LEN + self.size + footer
    }
}

#[derive(Debug, Default)]
pub struct Id3v2Tag {
    pub header: Option<TagHeader>,
    pub metadata: AudioMetadata,
    pub artwork: Vec<AudioArtwork>,
}

/// Parses a leading ID3v2 tag. Returns `Ok(None)` when there is none.
pub fn parse(data: &[u8]) -> Result<Option<Id3v2Tag>> {
    let Some(header) = TagHeader::parse(data)? else {
        return Ok(None);
    };

    let declared_end = HEADER_LEN + header.size;
    if declared_end > data.len() {
        warn!(
            declared = header.size,
            available = data.len() - HEADER_LEN,
            "ID3v2 tag size exceeds file, clamping"
        );
    }
    let body = &data[HEADER_LEN..declared_end.min(data.len())];

    let mut tag = Id3v2Tag {
        header: Some(header),
        ..Id3v2Tag::default()
    };

    if header.major == 2 && header.flags & FLAG_V22_COMPRESSION != 0 {
        // No compression scheme was ever defined for v2.2.
        warn!("Compressed ID3v2.2 tag, skipping frames");
        return Ok(Some(tag));
    }

    let body = if header.major < 4 && header.flags & FLAG_UNSYNCHRONISATION != 0 {
        remove_unsynchronisation(body)
    } else {
        body.to_vec()
    };

    let start = if header.major >= 3 && header.flags & FLAG_EXTENDED_HEADER != 0 {
        extended_header_len(&body, header.major)
    } else {
        0
    };

    let mut frames = FrameReader {
        body: &body,
        offset: start,
        major: header.major,
    };
    while let Some(frame) = frames.next_frame() {
        apply_frame(&mut tag, &frame);
    }

    tag.metadata.has_artwork = !tag.artwork.is_empty();
    Ok(Some(tag))
}

fn extended_header_len(body: &[u8], major: u8) -> usize {
    let Some(raw) = body.get(..4) else {
        return body.len();
    };
    let raw = [raw[0], raw[1], raw[2], raw[3]];
    let len = if major == 4 {
        // v2.4 counts the size field itself.
        decode_synchsafe(raw) as usize
    } else {
        u32::from_be_bytes(raw) as usize + 4
    };
    len.min(body.len())
}

/// Reverses `0xFF 0x00` byte stuffing.
pub fn remove_unsynchronisation(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut previous_ff = false;
    for &byte in data {
        if previous_ff && byte == 0x00 {
            previous_ff = false;
            continue;
        }
        out.push(byte);
        previous_ff = byte == 0xFF;
    }
    out
}

struct Frame {
    /// Normalised to the v2.3/v2.4 four-character id where one exists.
    id: String,
    data: Vec<u8>,
    /// v2.2 `PIC` frames carry a 3-byte image format instead of a MIME type.
    legacy_picture: bool,
}

struct FrameReader<'a> {
    body: &'a [u8],
    offset: usize,
    major: u8,
}

impl FrameReader<'_> {
    fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let (id_len, header_len) = if self.major == 2 { (3, 6) } else { (4, 10) };
            let header = self.body.get(self.offset..)?.get(..header_len)?;
            let raw_id = &header[..id_len];
            if raw_id.iter().all(|b| *b == 0) {
                return None;
            }

            let size = match self.major {
                2 => u32::from_be_bytes([0, header[3], header[4], header[5]]) as usize,
                3 => u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize,
                _ => decode_synchsafe([header[4], header[5], header[6], header[7]]) as usize,
            };
            if size == 0 {
                return None;
            }

            let data_start = self.offset + header_len;
            let data = self.body.get(data_start..)?.get(..size)?;
            self.offset = data_start + size;

            let id = String::from_utf8_lossy(raw_id).into_owned();
            let format_flags = if self.major == 2 { 0 } else { header[9] };

            match self.frame_payload(format_flags, data) {
                Some(payload) => {
                    let legacy_picture = self.major == 2 && id == "PIC";
                    return Some(Frame {
                        id: normalise_id(&id, self.major),
                        data: payload,
                        legacy_picture,
                    });
                }
                None => {
                    debug!(frame = %id, "Skipping compressed or encrypted frame");
                }
            }
        }
    }

    /// Strips per-frame prefixes; `None` for frames that cannot be read.
    fn frame_payload(&self, flags: u8, data: &[u8]) -> Option<Vec<u8>> {
        match self.major {
            3 => {
                if flags & 0x80 != 0 || flags & 0x40 != 0 {
                    return None;
                }
                let skip = if flags & 0x20 != 0 { 1 } else { 0 };
                Some(data.get(skip..)?.to_vec())
            }
            4 => {
                if flags & 0x08 != 0 || flags & 0x04 != 0 {
                    return None;
                }
                let mut skip = 0;
                if flags & 0x40 != 0 {
                    skip += 1;
                }
                if flags & 0x01 != 0 {
                    skip += 4;
                }
                let payload = data.get(skip..)?;
                if flags & 0x02 != 0 {
                    Some(remove_unsynchronisation(payload))
                } else {
                    Some(payload.to_vec())
                }
            }
            _ => Some(data.to_vec()),
        }
    }
}

fn normalise_id(id: &str, major: u8) -> String {
    if major != 2 {
        return id.to_string();
    }
    let mapped = match id {
        "TT2" => "TIT2",
        "TP1" => "TPE1",
        "TP2" => "TPE2",
        "TAL" => "TALB",
        "TYE" => "TYER",
        "TCO" => "TCON",
        "TRK" => "TRCK",
        "TPA" => "TPOS",
        "TCM" => "TCOM",
        "TBP" => "TBPM",
        "TCR" => "TCOP",
        "TPB" => "TPUB",
        "TEN" => "TENC",
        "COM" => "COMM",
        "ULT" => "USLT",
        "PIC" => "APIC",
        other => other,
    };
    mapped.to_string()
}

fn apply_frame(tag: &mut Id3v2Tag, frame: &Frame) {
    let meta = &mut tag.metadata;
    match frame.id.as_str() {
        "TIT2" => set_once(&mut meta.title, text_frame(&frame.data)),
        "TPE1" => set_once(&mut meta.artist, text_frame(&frame.data)),
        "TALB" => set_once(&mut meta.album, text_frame(&frame.data)),
        "TPE2" => set_once(&mut meta.album_artist, text_frame(&frame.data)),
        "TCOM" => set_once(&mut meta.composer, text_frame(&frame.data)),
        "TCOP" => set_once(&mut meta.copyright, text_frame(&frame.data)),
        "TPUB" => set_once(&mut meta.publisher, text_frame(&frame.data)),
        "TENC" => set_once(&mut meta.encoder, text_frame(&frame.data)),
        "TYER" | "TDRC" => {
            if meta.year.is_none() {
                meta.year = text_frame(&frame.data).and_then(|value| parse_year(&value));
            }
        }
        "TCON" => set_once(
            &mut meta.genre,
            text_frame(&frame.data).and_then(|value| genre::resolve(&value)),
        ),
        "TRCK" => {
            if let Some((number, total)) = text_frame(&frame.data).and_then(|v| parse_position(&v)) {
                meta.track_number = Some(number);
                meta.total_tracks = total;
            }
        }
        "TPOS" => {
            if let Some((number, total)) = text_frame(&frame.data).and_then(|v| parse_position(&v)) {
                meta.disc_number = Some(number);
                meta.total_discs = total;
            }
        }
        "TBPM" => {
            if meta.bpm.is_none() {
                meta.bpm = text_frame(&frame.data).and_then(|value| parse_bpm(&value));
            }
        }
        "COMM" => set_once(&mut meta.comment, described_text(&frame.data)),
        "USLT" => set_once(&mut meta.lyrics, described_text(&frame.data)),
        "APIC" => {
            if let Some(artwork) = picture_frame(&frame.data, frame.legacy_picture) {
                tag.artwork.push(artwork);
            }
        }
        _ => {}
    }
}

fn set_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Encoding byte plus text. v2.4 may hold several NUL-separated values; the
/// first non-empty one is used.
fn text_frame(data: &[u8]) -> Option<String> {
    let (&encoding, text) = data.split_first()?;
    let encoding = TextEncoding::from_byte(encoding);

    let mut rest = text;
    while !rest.is_empty() {
        let (value, remainder) = encoding.split_terminated(rest);
        let value = encoding.decode(value);
        if !value.is_empty() {
            return Some(value);
        }
        rest = remainder;
    }
    None
}

/// COMM / USLT: encoding, 3-byte language, terminated description, text.
fn described_text(data: &[u8]) -> Option<String> {
    let (&encoding, rest) = data.split_first()?;
    let encoding = TextEncoding::from_byte(encoding);
    let body = rest.get(3..)?;
    let (_description, text) = encoding.split_terminated(body);
    let text = encoding.decode(text);
    (!text.is_empty()).then_some(text)
}

fn picture_frame(data: &[u8], legacy: bool) -> Option<AudioArtwork> {
    let (&encoding, rest) = data.split_first()?;
    let encoding = TextEncoding::from_byte(encoding);

    let (mime_type, rest) = if legacy {
        let format = rest.get(..3)?;
        let mime = match format.to_ascii_uppercase().as_slice() {
            b"JPG" => Some("image/jpeg".to_string()),
            b"PNG" => Some("image/png".to_string()),
            _ => None,
        };
        (mime, &rest[3..])
    } else {
        // MIME strings are always Latin-1.
        let (mime, rest) = TextEncoding::Latin1.split_terminated(rest);
        let mime = TextEncoding::Latin1.decode(mime).to_ascii_lowercase();
        let mime = match mime.as_str() {
            "" => None,
            "jpg" | "jpeg" => Some("image/jpeg".to_string()),
            "png" => Some("image/png".to_string()),
            _ => Some(mime),
        };
        (mime, rest)
    };

    let (&picture_type, rest) = rest.split_first()?;
    let (description, image) = encoding.split_terminated(rest);
    if image.is_empty() {
        return None;
    }
    let description = encoding.decode(description);

    Some(AudioArtwork {
        data: Bytes::copy_from_slice(image),
        mime_type,
        picture_type: ArtworkType::from_picture_type(picture_type),
        description: (!description.is_empty()).then_some(description),
    })
}

/// `"N"` or `"N/M"`.
pub fn parse_position(value: &str) -> Option<(u32, Option<u32>)> {
    let mut parts = value.trim().splitn(2, '/');
    let number = parts.next()?.trim().parse().ok()?;
    let total = parts.next().and_then(|total| total.trim().parse().ok());
    Some((number, total))
}

/// First four digits of a timestamp such as `2004-05-01T10:00`.
fn parse_year(value: &str) -> Option<i32> {
    value.trim().get(..4)?.parse().ok()
}

fn parse_bpm(value: &str) -> Option<u32> {
    let value = value.trim();
    let integer = value.split('.').next().unwrap_or(value);
    integer.parse().ok()
}

#[cfg(test)]
pub(crate) mod builder {
    //! Builds ID3v2 tags for tests.

    use super::decode_synchsafe;

    pub fn synchsafe(value: u32) -> [u8; 4] {
        let encoded = [
            ((value >> 21) & 0x7F) as u8,
            ((value >> 14) & 0x7F) as u8,
            ((value >> 7) & 0x7F) as u8,
            (value & 0x7F) as u8,
        ];
        debug_assert_eq!(decode_synchsafe(encoded), value);
        encoded
    }

    pub fn frame(major: u8, id: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = id.as_bytes().to_vec();
        match major {
            2 => out.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]),
            3 => {
                out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                out.extend_from_slice(&[0, 0]);
            }
            _ => {
                out.extend_from_slice(&synchsafe(payload.len() as u32));
                out.extend_from_slice(&[0, 0]);
            }
        }
        out.extend_from_slice(payload);
        out
    }

    pub fn text(major: u8, id: &str, value: &str) -> Vec<u8> {
        let mut payload = vec![3u8];
        payload.extend_from_slice(value.as_bytes());
        frame(major, id, &payload)
    }

    pub fn tag(major: u8, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
        let body: Vec<u8> = frames
            .iter()
            .flatten()
            .copied()
            .chain(std::iter::repeat(0).take(padding))
            .collect();
        let mut out = b"ID3".to_vec();
        out.extend_from_slice(&[major, 0, 0]);
        out.extend_from_slice(&synchsafe(body.len() as u32));
        out.extend_from_slice(&body);
        out
    }
}
