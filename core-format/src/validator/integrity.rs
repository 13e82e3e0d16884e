//! Format-independent integrity checks.

use crate::error::IntegrityError;
use crate::registry::AudioFormat;
use bridge_traits::IntrospectionReport;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityResult {
    pub is_valid: bool,
    pub confidence: f64,
    pub size: u64,
    pub is_playable: bool,
    #[serde(skip)]
    pub error: Option<IntegrityError>,
}

/// Smallest plausible file for `format`, in bytes.
pub fn minimum_size(format: AudioFormat) -> u64 {
    match format {
        AudioFormat::Mp3 | AudioFormat::Aac | AudioFormat::M4a | AudioFormat::Ogg | AudioFormat::Opus => 1024,
        AudioFormat::Wav | AudioFormat::Aiff | AudioFormat::Flac | AudioFormat::Alac => 4096,
        AudioFormat::Unknown => 512,
    }
}

/// Checks readability, size and playability, reporting the first failure.
pub fn check(format: AudioFormat, size: u64, report: Option<&IntrospectionReport>) -> IntegrityResult {
    let is_playable = report.map(|r| r.is_playable).unwrap_or(false);
    let minimum = minimum_size(format);

    let error = if size == 0 {
        Some(IntegrityError::Unreadable)
    } else if size < minimum {
        Some(IntegrityError::TooSmall { size, minimum })
    } else if !is_playable {
        Some(IntegrityError::NotPlayable)
    } else {
        None
    };

    IntegrityResult {
        is_valid: error.is_none(),
        confidence: if error.is_none() { 1.0 } else { 0.0 },
        size,
        is_playable,
        error,
    }
}
