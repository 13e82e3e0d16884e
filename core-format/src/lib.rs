//! # Audio Format Engine
//!
//! Identifies, validates and reads tags from audio files without decoding
//! them.
//!
//! ## Overview
//!
//! - [`registry`] - static descriptors for every supported format
//! - [`sniffer`] - magic-byte signatures over the first bytes of a file
//! - [`detector`] - fuses extension, magic bytes and host deep inspection
//!   into a confidence-scored [`DetectionResult`]
//! - [`validator`] - walks the byte structure of a file for an expected
//!   format and checks its integrity
//! - [`tags`] - ID3v1 and ID3v2 metadata and embedded artwork
//! - [`batch`] - bounded concurrent fan-out over many files
//! - [`service`] - the [`InspectionService`] facade hosts talk to
//!
//! Supported formats: MP3, AAC (ADTS and MP4), M4A, ALAC, FLAC, WAV, AIFF,
//! Ogg Vorbis and Opus.
//!
//! ## Bridges
//!
//! File access and deep inspection go through the `bridge-traits` crate.
//! Desktop hosts get both from `bridge-desktop` by enabling the
//! `desktop-shims` feature; other hosts inject their own through
//! [`CoreConfig`](core_runtime::CoreConfig).

pub mod batch;
pub mod cache;
pub mod config;
pub mod detector;
pub mod error;
pub mod mpeg;
pub mod registry;
pub mod service;
pub mod sniffer;
pub mod tags;
pub mod validator;
mod window;

pub use batch::BatchEntry;
pub use cache::{CacheStats, ResultCache};
pub use config::{DetectionConfig, FrameSkip};
pub use detector::{
    DetectionMethod, DetectionResult, DetectionSource, FormatDetector, TechnicalProperties,
};
pub use error::{FormatError, IntegrityError, Result, StructuralError};
pub use registry::{AudioFormat, FormatDescriptor, FormatRegistry};
pub use service::{InspectionService, ServiceCacheStats};
pub use sniffer::MagicByteSniffer;
pub use tags::{ArtworkType, AudioArtwork, AudioMetadata, TagParser};
pub use validator::{
    IssueKind, Severity, StructuralValidator, ValidationIssue, ValidationResult,
};
