//! Deep Inspection Abstraction
//!
//! A platform media framework (AVFoundation, Media Foundation, GStreamer, a
//! pure-Rust prober...) can open a file and report whether it actually plays.
//! The core treats that capability as a slow, optional collaborator: it is
//! consulted to confirm byte-level heuristics or to fall back when they are
//! inconclusive, never as the only detection path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// One audio track reported by the introspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrackInfo {
    /// Codec identifier as reported by the host (e.g. "mp3", "aac", "alac", "pcm_s16le")
    pub format_id: String,
    /// Sample rate in Hz
    pub sample_rate: Option<u32>,
    /// Number of channels
    pub channels: Option<u16>,
    /// Bits per sample for PCM-like codecs
    pub bit_depth: Option<u16>,
    /// Estimated bitrate in bits per second
    pub estimated_bitrate: Option<u32>,
}

impl AudioTrackInfo {
    pub fn new(format_id: impl Into<String>) -> Self {
        Self {
            format_id: format_id.into(),
            sample_rate: None,
            channels: None,
            bit_depth: None,
            estimated_bitrate: None,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_bit_depth(mut self, bit_depth: u16) -> Self {
        self.bit_depth = Some(bit_depth);
        self
    }

    pub fn with_estimated_bitrate(mut self, bitrate: u32) -> Self {
        self.estimated_bitrate = Some(bitrate);
        self
    }
}

/// Result of a deep inspection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntrospectionReport {
    /// Whether the host framework could open the file for playback
    pub is_playable: bool,
    /// Audio tracks found in the file
    pub audio_tracks: Vec<AudioTrackInfo>,
    /// Total duration, when known
    pub duration: Option<Duration>,
}

impl IntrospectionReport {
    /// A report for a file the host could not play.
    pub fn unplayable() -> Self {
        Self::default()
    }

    /// A playable report with the given tracks.
    pub fn playable(audio_tracks: Vec<AudioTrackInfo>) -> Self {
        Self {
            is_playable: true,
            audio_tracks,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// First track carrying a non-empty format description.
    pub fn primary_track(&self) -> Option<&AudioTrackInfo> {
        self.audio_tracks
            .iter()
            .find(|track| !track.format_id.trim().is_empty())
    }

    /// Playable with at least one described audio track.
    pub fn has_audio(&self) -> bool {
        self.is_playable && self.primary_track().is_some()
    }
}

/// Deep inspection trait
///
/// Implementations may be slow (they typically open a demuxer) and must be
/// safe to call concurrently: the core issues one call per file in batch
/// operations without serializing them. Timeouts are the implementation's
/// responsibility.
///
/// Returning `Ok` with [`IntrospectionReport::unplayable`] is preferred over
/// an error for files the framework simply does not understand; errors are
/// reserved for I/O failures.
#[async_trait]
pub trait AudioIntrospector: Send + Sync {
    /// Inspect the file at `path`.
    async fn introspect(&self, path: &Path) -> Result<IntrospectionReport>;
}
