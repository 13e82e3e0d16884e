//! # ID3 Tag Extraction
//!
//! Reads ID3v1 and ID3v2 tags into an [`AudioMetadata`] record and collects
//! embedded pictures as [`AudioArtwork`].
//!
//! When both tag versions exist, ID3v2 values win and ID3v1 only fills the
//! fields ID3v2 left empty. A file whose tags yield none of title, artist or
//! album is reported as [`FormatError::NoMetadataFound`]; malformed tag bytes
//! are reported as [`FormatError::CorruptedMetadata`].
//!
//! ## Usage
//!
//! ```ignore
//! let parser = TagParser::new(fs, 1024);
//! let metadata = parser.extract_metadata(Path::new("song.mp3")).await?;
//! let pictures = parser.extract_artwork(Path::new("song.mp3")).await?;
//! ```

pub mod encoding;
pub mod genre;
pub mod id3v1;
pub mod id3v2;

use crate::cache::{FileStamp, ResultCache};
use crate::error::{FormatError, Result};
use crate::mpeg::FrameHeader;
use crate::validator::structure::has_id3v1_trailer;
use crate::window::FileWindow;
use bridge_traits::FileSystemAccess;
use bytes::Bytes;
use core_runtime::logging::strip_path;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// How far past the tag the first MPEG frame is searched for.
const FRAME_SEARCH_LIMIT: usize = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub total_tracks: Option<u32>,
    pub disc_number: Option<u32>,
    pub total_discs: Option<u32>,
    pub comment: Option<String>,
    pub lyrics: Option<String>,
    pub bpm: Option<u32>,
    pub publisher: Option<String>,
    pub copyright: Option<String>,
    pub encoder: Option<String>,

    // Stream properties from the first MPEG frame
    pub duration: Option<Duration>,
    /// Bits per second
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,

    pub has_artwork: bool,
}

impl AudioMetadata {
    /// At least one of title, artist or album is set.
    pub fn has_core_fields(&self) -> bool {
        self.title.is_some() || self.artist.is_some() || self.album.is_some()
    }

    /// Fills fields that are still empty from `fallback`.
    pub fn fill_missing(&mut self, fallback: AudioMetadata) {
        macro_rules! fill {
            ($($field:ident),*) => {
                $( if self.$field.is_none() { self.$field = fallback.$field; } )*
            };
        }
        fill!(
            title, artist, album, album_artist, composer, year, genre, track_number,
            total_tracks, disc_number, total_discs, comment, lyrics, bpm, publisher,
            copyright, encoder, duration, bitrate, sample_rate, channels
        );
        self.has_artwork |= fallback.has_artwork;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtworkType {
    CoverFront,
    CoverBack,
    Artist,
    Other,
}

impl ArtworkType {
    /// Maps the ID3v2 picture type byte.
    pub fn from_picture_type(picture_type: u8) -> Self {
        match picture_type {
            3 => ArtworkType::CoverFront,
            4 => ArtworkType::CoverBack,
            8 => ArtworkType::Artist,
            _ => ArtworkType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtwork {
    pub data: Bytes,
    pub mime_type: Option<String>,
    pub picture_type: ArtworkType,
    pub description: Option<String>,
}

/// Parses tags from a complete file image.
pub fn parse_metadata(data: &[u8]) -> Result<AudioMetadata> {
    let trailer = &data[data.len().saturating_sub(id3v1::TAG_LEN)..];
    parse_sections(data, trailer, audio_end(trailer, data.len() as u64))
}

/// Parses tags from the start of a file and its last `TAG_LEN` bytes.
/// `audio_end` is the file offset where MPEG frames stop.
fn parse_sections(head: &[u8], trailer: &[u8], audio_end: u64) -> Result<AudioMetadata> {
    let v2 = id3v2::parse(head)?;
    let v1 = id3v1::parse(trailer);

    let tag_end = v2
        .as_ref()
        .and_then(|tag| tag.header)
        .map(|header| header.total_len())
        .unwrap_or(0);

    let mut metadata = match v2 {
        Some(tag) => {
            let mut metadata = tag.metadata;
            if let Some(v1) = v1 {
                metadata.fill_missing(v1);
            }
            metadata
        }
        None => v1.unwrap_or_default(),
    };

    if !metadata.has_core_fields() {
        return Err(FormatError::NoMetadataFound);
    }

    fill_stream_properties(&mut metadata, head, tag_end, audio_end);
    Ok(metadata)
}

/// Pictures from the ID3v2 tag; empty when there is no tag.
pub fn parse_artwork(data: &[u8]) -> Result<Vec<AudioArtwork>> {
    Ok(id3v2::parse(data)?.map(|tag| tag.artwork).unwrap_or_default())
}

fn audio_end(trailer: &[u8], size: u64) -> u64 {
    if has_id3v1_trailer(trailer) {
        size - id3v1::TAG_LEN as u64
    } else {
        size
    }
}

fn fill_stream_properties(metadata: &mut AudioMetadata, head: &[u8], tag_end: usize, audio_end: u64) {
    let Some((offset, header)) = first_frame(head, tag_end) else {
        return;
    };

    metadata.sample_rate = Some(header.sample_rate);
    metadata.channels = Some(header.channels);
    if header.bitrate_kbps > 0 {
        metadata.bitrate = Some(header.bitrate_kbps * 1000);
    }
    metadata.duration = header.estimate_duration(audio_end.saturating_sub(offset as u64));
}

/// First frame header that is followed by another header at the computed
/// frame length, which rules out stray sync bytes in the payload.
fn first_frame(data: &[u8], start: usize) -> Option<(usize, FrameHeader)> {
    let end = data.len().min(start.saturating_add(FRAME_SEARCH_LIMIT));
    let mut offset = start;
    while offset + 4 <= end {
        if let Some(header) = FrameHeader::parse(&data[offset..]) {
            let next = header.frame_len().map(|len| offset + len);
            let confirmed = match next {
                Some(next) if next + 4 <= data.len() => FrameHeader::parse(&data[next..]).is_some(),
                // Last frame in the file, or free format.
                _ => true,
            };
            if confirmed {
                return Some((offset, header));
            }
        }
        offset += 1;
    }
    None
}

/// Cached tag extraction over the host file system.
pub struct TagParser {
    fs: Arc<dyn FileSystemAccess>,
    cache: ResultCache<AudioMetadata>,
}

impl TagParser {
    pub fn new(fs: Arc<dyn FileSystemAccess>, cache_capacity: usize) -> Self {
        Self {
            fs,
            cache: ResultCache::new(cache_capacity),
        }
    }

    pub fn cache(&self) -> &ResultCache<AudioMetadata> {
        &self.cache
    }

    #[instrument(skip(self, path), fields(file = %strip_path(path)))]
    pub async fn extract_metadata(&self, path: &Path) -> Result<AudioMetadata> {
        let file_metadata = self
            .fs
            .metadata(path)
            .await
            .map_err(|e| FormatError::from_bridge(path, e))?;
        let stamp = FileStamp::from(&file_metadata);

        if let Some(cached) = self.cache.get(path, &stamp).await {
            debug!("Metadata cache hit");
            return Ok(cached);
        }

        let window =
            FileWindow::read(self.fs.as_ref(), path, file_metadata.size, FRAME_SEARCH_LIMIT).await?;
        let metadata = parse_sections(&window.head, &window.trailer, window.audio_end())?;
        debug!(
            has_title = metadata.title.is_some(),
            has_artwork = metadata.has_artwork,
            "Extracted tags"
        );

        self.cache.insert(path, stamp, metadata.clone()).await;
        Ok(metadata)
    }

    #[instrument(skip(self, path), fields(file = %strip_path(path)))]
    pub async fn extract_artwork(&self, path: &Path) -> Result<Vec<AudioArtwork>> {
        let size = self
            .fs
            .metadata(path)
            .await
            .map_err(|e| FormatError::from_bridge(path, e))?
            .size;
        // Pictures live inside the ID3v2 tag, so nothing past it is needed.
        let window = FileWindow::read(self.fs.as_ref(), path, size, 0).await?;
        let artwork = parse_artwork(&window.head)?;
        debug!(count = artwork.len(), "Extracted artwork");
        Ok(artwork)
    }
}
