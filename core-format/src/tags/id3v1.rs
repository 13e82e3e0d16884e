//! ID3v1 / ID3v1.1 trailer parsing.
//!
//! ```text
//! offset  len  field
//!   0      3   "TAG"
//!   3     30   title
//!  33     30   artist
//!  63     30   album
//!  93      4   year
//!  97     30   comment (v1.1: 28 bytes, 0, track)
//! 127      1   genre index
//! ```

use super::encoding::decode_latin1;
use super::genre::genre_name;
use super::AudioMetadata;

pub const TAG_LEN: usize = 128;

/// Parses the trailing 128-byte block, if present.
pub fn parse(data: &[u8]) -> Option<AudioMetadata> {
    let start = data.len().checked_sub(TAG_LEN)?;
    let tag = &data[start..];
    if &tag[..3] != b"TAG" {
        return None;
    }

    let comment = &tag[97..127];
    let (comment, track_number) = if comment[28] == 0 && comment[29] != 0 {
        (&comment[..28], Some(u32::from(comment[29])))
    } else {
        (comment, None)
    };

    Some(AudioMetadata {
        title: field(&tag[3..33]),
        artist: field(&tag[33..63]),
        album: field(&tag[63..93]),
        year: field(&tag[93..97]).and_then(|year| year.parse().ok()),
        comment: field(comment),
        track_number,
        genre: genre_name(tag[127]).map(str::to_string),
        ..AudioMetadata::default()
    })
}

fn field(bytes: &[u8]) -> Option<String> {
    // Fields are NUL padded; anything after the first NUL is garbage.
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let text = decode_latin1(&bytes[..end]);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
pub(crate) fn build_tag(title: &str, artist: &str, track: Option<u8>, genre: u8) -> Vec<u8> {
    let mut tag = vec![0u8; TAG_LEN];
    tag[..3].copy_from_slice(b"TAG");
    tag[3..3 + title.len()].copy_from_slice(title.as_bytes());
    tag[33..33 + artist.len()].copy_from_slice(artist.as_bytes());
    tag[93..97].copy_from_slice(b"1999");
    tag[97..104].copy_from_slice(b"comment");
    if let Some(track) = track {
        tag[126] = track;
    }
    tag[127] = genre;
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v11_trailer() {
        let mut data = vec![0xAA; 500];
        data.extend_from_slice(&build_tag("Test", "Someone", Some(7), 17));

        let meta = parse(&data).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Test"));
        assert_eq!(meta.artist.as_deref(), Some("Someone"));
        assert_eq!(meta.album, None);
        assert_eq!(meta.year, Some(1999));
        assert_eq!(meta.comment.as_deref(), Some("comment"));
        assert_eq!(meta.track_number, Some(7));
        assert_eq!(meta.genre.as_deref(), Some("Rock"));
    }

    #[test]
    fn v10_has_no_track() {
        let meta = parse(&build_tag("Song", "", None, 255)).unwrap();
        assert_eq!(meta.track_number, None);
        assert_eq!(meta.artist, None);
        assert_eq!(meta.genre, None);
    }

    #[test]
    fn missing_or_short() {
        assert!(parse(&[0u8; 127]).is_none());
        assert!(parse(&[0u8; 200]).is_none());
    }
}
