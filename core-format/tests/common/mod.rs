//! Shared fixtures for the core-format integration tests.
//!
//! Audio files are synthesized byte by byte; nothing here decodes.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioIntrospector, AudioTrackInfo, IntrospectionReport};
use core_format::InspectionService;
use core_runtime::CoreConfig;
use mockall::mock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

mock! {
    pub Prober {}

    #[async_trait]
    impl AudioIntrospector for Prober {
        async fn introspect(&self, path: &Path) -> BridgeResult<IntrospectionReport>;
    }
}

/// A prober that fails the test if it is ever consulted.
pub fn silent_prober() -> MockProber {
    let mut prober = MockProber::new();
    prober.expect_introspect().times(0);
    prober
}

/// A prober that reports one playable track of `codec`.
pub fn playable_prober(codec: &'static str, calls: usize) -> MockProber {
    let mut prober = MockProber::new();
    prober.expect_introspect().times(calls).returning(move |_| {
        Ok(IntrospectionReport::playable(vec![AudioTrackInfo::new(codec)
            .with_sample_rate(44100)
            .with_channels(2)]))
    });
    prober
}

pub fn unplayable_prober() -> MockProber {
    let mut prober = MockProber::new();
    prober
        .expect_introspect()
        .returning(|_| Ok(IntrospectionReport::unplayable()));
    prober
}

/// Service over a temp directory with its own scratch directory.
pub fn service(dir: &TempDir, prober: MockProber) -> InspectionService {
    let scratch = dir.path().join("scratch");
    std::fs::create_dir_all(&scratch).unwrap();

    let config = CoreConfig::builder()
        .file_system(Arc::new(TokioFileSystem::with_cache_directory(scratch.clone())))
        .introspector(Arc::new(prober))
        .scratch_dir(scratch)
        .build()
        .unwrap();
    InspectionService::new(config).unwrap()
}

pub fn write(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path
}

pub fn pad(mut data: Vec<u8>, len: usize) -> Vec<u8> {
    if data.len() < len {
        data.resize(len, 0);
    }
    data
}

/// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, stereo; 417-byte frames.
pub fn mp3_frames(count: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(count * 417);
    for _ in 0..count {
        let start = data.len();
        data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        data.resize(start + 417, 0);
    }
    data
}

pub fn flac(with_stream_info: bool) -> Vec<u8> {
    let mut data = b"fLaC".to_vec();
    // Last-block flag set; type 0 is STREAMINFO, type 1 is PADDING.
    let block_type = if with_stream_info { 0x80 } else { 0x81 };
    data.extend_from_slice(&[block_type, 0x00, 0x00, 0x22]);
    data.extend_from_slice(&[0u8; 34]);
    pad(data, 8192)
}

pub fn wav() -> Vec<u8> {
    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&8192u32.to_le_bytes());
    data.extend_from_slice(b"WAVEfmt ");
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&[1, 0, 2, 0, 0x44, 0xAC, 0, 0, 0x10, 0xB1, 2, 0, 4, 0, 16, 0]);
    data.extend_from_slice(b"data");
    data.extend_from_slice(&4096u32.to_le_bytes());
    pad(data, 8192)
}

pub fn aiff() -> Vec<u8> {
    let mut data = b"FORM".to_vec();
    data.extend_from_slice(&8184u32.to_be_bytes());
    data.extend_from_slice(b"AIFFCOMM");
    data.extend_from_slice(&18u32.to_be_bytes());
    pad(data, 8192)
}

fn ogg_page(payload: &[u8]) -> Vec<u8> {
    let mut page = b"OggS".to_vec();
    page.extend_from_slice(&[0u8; 22]);
    page.push(1);
    page.push(payload.len() as u8);
    page.extend_from_slice(payload);
    page
}

pub fn ogg_vorbis(pages: usize) -> Vec<u8> {
    let mut data = ogg_page(b"\x01vorbis\x00\x00\x00\x00\x02\x44\xAC\x00\x00");
    for _ in 1..pages {
        data.extend_from_slice(&ogg_page(&[0u8; 200]));
    }
    data
}

pub fn ogg_opus(pages: usize) -> Vec<u8> {
    let mut data = ogg_page(b"OpusHead\x01\x02\x38\x01\x80\xBB\x00\x00");
    for _ in 1..pages {
        data.extend_from_slice(&ogg_page(&[0u8; 200]));
    }
    data
}

fn mp4_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut b = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    b.extend_from_slice(kind);
    b.extend_from_slice(payload);
    b
}

/// `ftyp` followed by a `moov` box naming `codec` early enough to be sniffed.
pub fn m4a(codec: &[u8; 4]) -> Vec<u8> {
    let mut data = mp4_box(b"ftyp", b"M4A \x00\x00\x00\x00");
    let mut stsd = vec![0u8; 8];
    stsd.extend_from_slice(codec);
    data.extend_from_slice(&mp4_box(b"moov", &mp4_box(b"stsd", &stsd)));
    data.extend_from_slice(&mp4_box(b"mdat", &[0u8; 4096]));
    data
}

/// Raw ADTS stream, 400-byte frames.
pub fn adts(frames: usize) -> Vec<u8> {
    let mut data = Vec::new();
    for _ in 0..frames {
        let start = data.len();
        data.extend_from_slice(&[0xFF, 0xF1, 0x50, 0x80, 0x32, 0x1F, 0xFC]);
        data.resize(start + 400, 0);
    }
    data
}

/// 128-byte ID3v1.1 block.
pub fn id3v1(title: &str, artist: &str, track: u8, genre: u8) -> Vec<u8> {
    fn field(value: &str, len: usize) -> Vec<u8> {
        let mut bytes = value.as_bytes().to_vec();
        bytes.resize(len, 0);
        bytes
    }

    let mut tag = b"TAG".to_vec();
    tag.extend_from_slice(&field(title, 30));
    tag.extend_from_slice(&field(artist, 30));
    tag.extend_from_slice(&field("", 30));
    tag.extend_from_slice(b"2001");
    tag.extend_from_slice(&field("", 28));
    tag.push(0);
    tag.push(track);
    tag.push(genre);
    tag
}

fn synchsafe(value: u32) -> [u8; 4] {
    [
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ]
}

/// ID3v2.3 frame with a plain big-endian size.
pub fn v23_frame(id: &str, body: &[u8]) -> Vec<u8> {
    let mut frame = id.as_bytes().to_vec();
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(body);
    frame
}

/// Latin-1 text frame body.
pub fn text(id: &str, value: &str) -> Vec<u8> {
    let mut body = vec![0u8];
    body.extend_from_slice(value.as_bytes());
    v23_frame(id, &body)
}

pub fn apic(mime: &str, picture_type: u8, image: &[u8]) -> Vec<u8> {
    let mut body = vec![0u8];
    body.extend_from_slice(mime.as_bytes());
    body.push(0);
    body.push(picture_type);
    body.push(0);
    body.extend_from_slice(image);
    v23_frame("APIC", &body)
}

pub fn id3v23(frames: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = frames.concat();
    let mut tag = b"ID3\x03\x00\x00".to_vec();
    tag.extend_from_slice(&synchsafe(body.len() as u32));
    tag.extend_from_slice(&body);
    tag
}
