//! # Structural Validation
//!
//! Confirms that a file really is the format it claims to be:
//!
//! 1. detect the actual format,
//! 2. compare it with the expected format (or its container),
//! 3. walk the byte structure for the expected format,
//! 4. run the integrity check,
//! 5. combine the three confidences.
//!
//! Malformed input never produces an error here; it produces an invalid
//! [`ValidationResult`] with issues attached. Only I/O failures and an
//! `Unknown` expected format are returned as errors.

pub mod integrity;
pub mod structure;

pub use integrity::IntegrityResult;
pub use structure::StructuralResult;

use crate::config::{DetectionConfig, FrameSkip};
use crate::detector::{DetectionResult, DetectionSource, FormatDetector};
use crate::error::{FormatError, IntegrityError, Result, StructuralError};
use crate::registry::AudioFormat;
use crate::window::FileWindow;
use bridge_traits::{AudioIntrospector, FileSystemAccess, IntrospectionReport};
use bytes::Bytes;
use core_runtime::logging::strip_path;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const DETECTION_WEIGHT: f64 = 0.3;
const STRUCTURAL_WEIGHT: f64 = 0.4;
const INTEGRITY_WEIGHT: f64 = 0.3;

/// Bytes after any leading ID3v2 tag handed to the structure walkers. Covers
/// the frame and page caps with room to spare.
pub const STRUCTURE_WINDOW: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    FormatMismatch {
        expected: AudioFormat,
        detected: AudioFormat,
    },
    Structural(StructuralError),
    Integrity(IntegrityError),
    /// A 128-byte ID3v1 block sits at the end of the file.
    Id3v1Trailer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: IssueKind,
}

impl ValidationIssue {
    fn error(kind: IssueKind) -> Self {
        Self {
            severity: Severity::Error,
            kind,
        }
    }

    fn info(kind: IssueKind) -> Self {
        Self {
            severity: Severity::Info,
            kind,
        }
    }

    /// The issue as a [`FormatError`], for issues that are failures.
    pub fn as_error(&self) -> Option<FormatError> {
        if self.severity != Severity::Error {
            return None;
        }
        match &self.kind {
            IssueKind::FormatMismatch { .. } => Some(FormatError::UnsupportedFormat(self.to_string())),
            IssueKind::Structural(err) => Some(FormatError::StructuralMismatch(err.clone())),
            IssueKind::Integrity(err) => Some(FormatError::IntegrityFailure(err.clone())),
            IssueKind::Id3v1Trailer => None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::FormatMismatch { expected, detected } => {
                write!(f, "expected {} but detected {}", expected, detected)
            }
            IssueKind::Structural(err) => write!(f, "{}", err),
            IssueKind::Integrity(err) => write!(f, "{}", err),
            IssueKind::Id3v1Trailer => f.write_str("ID3v1 tag present at end of file"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub confidence: f64,
    pub expected_format: AudioFormat,
    pub detected_format: AudioFormat,
    pub detection: DetectionResult,
    pub structural: StructuralResult,
    pub integrity: IntegrityResult,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn errors(&self) -> Vec<FormatError> {
        self.issues.iter().filter_map(ValidationIssue::as_error).collect()
    }

    pub fn has_issue(&self, predicate: impl Fn(&IssueKind) -> bool) -> bool {
        self.issues.iter().any(|issue| predicate(&issue.kind))
    }
}

pub struct StructuralValidator {
    detector: Arc<FormatDetector>,
    fs: Arc<dyn FileSystemAccess>,
    introspector: Arc<dyn AudioIntrospector>,
    frame_skip: FrameSkip,
}

impl StructuralValidator {
    pub fn new(
        detector: Arc<FormatDetector>,
        fs: Arc<dyn FileSystemAccess>,
        introspector: Arc<dyn AudioIntrospector>,
        config: &DetectionConfig,
    ) -> Self {
        Self {
            detector,
            fs,
            introspector,
            frame_skip: config.frame_skip,
        }
    }

    pub async fn validate_source(
        &self,
        source: &DetectionSource,
        expected: AudioFormat,
    ) -> Result<ValidationResult> {
        match source {
            DetectionSource::File(path) => self.validate(path, expected).await,
            DetectionSource::Memory { data, .. } => self.validate_bytes(data.clone(), expected).await,
        }
    }

    #[instrument(skip(self, path), fields(file = %strip_path(path), expected = %expected))]
    pub async fn validate(&self, path: &Path, expected: AudioFormat) -> Result<ValidationResult> {
        if expected == AudioFormat::Unknown {
            return Err(FormatError::UnsupportedFormat(
                "cannot validate against an unknown format".to_string(),
            ));
        }

        let detection = self.detector.detect_path(path).await?;
        let size = self
            .fs
            .metadata(path)
            .await
            .map_err(|e| FormatError::from_bridge(path, e))?
            .size;
        let window = FileWindow::read(self.fs.as_ref(), path, size, STRUCTURE_WINDOW).await?;
        let report = self.introspect(path).await;

        let structural = self.walk(&window.head, expected, report.as_ref());
        let integrity = integrity::check(expected, window.size, report.as_ref());

        let format_matches = detection.matches(expected);
        let mut issues = Vec::new();
        if !format_matches {
            issues.push(ValidationIssue::error(IssueKind::FormatMismatch {
                expected,
                detected: detection.format,
            }));
        }
        if let Some(err) = &structural.error {
            issues.push(ValidationIssue::error(IssueKind::Structural(err.clone())));
        }
        if let Some(err) = &integrity.error {
            issues.push(ValidationIssue::error(IssueKind::Integrity(err.clone())));
        }
        if expected == AudioFormat::Mp3 && structure::has_id3v1_trailer(&window.trailer) {
            issues.push(ValidationIssue::info(IssueKind::Id3v1Trailer));
        }

        let confidence = if format_matches {
            DETECTION_WEIGHT * detection.confidence
                + STRUCTURAL_WEIGHT * structural.confidence
                + INTEGRITY_WEIGHT * integrity.confidence
        } else {
            0.0
        };
        let is_valid = format_matches && structural.is_valid && integrity.is_valid;

        debug!(is_valid, confidence, issues = issues.len(), "Validation finished");

        Ok(ValidationResult {
            is_valid,
            confidence,
            expected_format: expected,
            detected_format: detection.format,
            detection,
            structural,
            integrity,
            issues,
        })
    }

    /// Validates an in-memory buffer by writing it to a scratch file named
    /// after the expected format. The scratch file is removed afterwards.
    pub async fn validate_bytes(&self, data: Bytes, expected: AudioFormat) -> Result<ValidationResult> {
        let extension = expected.descriptor().primary_extension().unwrap_or("bin");
        let dir = self.detector.scratch_directory().await?;
        let path = dir.join(format!("{}.{}", uuid::Uuid::new_v4(), extension));
        self.fs.write_file(&path, data).await?;

        let result = self.validate(&path, expected).await;
        self.detector.remove_scratch(&path).await;
        result
    }

    fn walk(&self, data: &[u8], expected: AudioFormat, report: Option<&IntrospectionReport>) -> StructuralResult {
        let codec_confirmed = report.map(IntrospectionReport::has_audio).unwrap_or(false);

        match expected {
            AudioFormat::Mp3 => structure::walk_mp3(data, self.frame_skip),
            AudioFormat::Aac if structure::starts_with_adts(data) => {
                structure::walk_adts(data, self.frame_skip)
            }
            AudioFormat::Aac | AudioFormat::M4a | AudioFormat::Alac => {
                structure::require_codec(structure::walk_mp4(data), codec_confirmed)
            }
            AudioFormat::Flac => structure::walk_flac(data),
            AudioFormat::Wav => structure::walk_wav(data),
            AudioFormat::Aiff => structure::walk_aiff(data),
            AudioFormat::Ogg | AudioFormat::Opus => structure::walk_ogg(data),
            AudioFormat::Unknown => StructuralResult {
                is_valid: false,
                confidence: 0.0,
                units: 0,
                error: Some(StructuralError::InvalidSignature("unknown".to_string())),
            },
        }
    }

    async fn introspect(&self, path: &Path) -> Option<IntrospectionReport> {
        match self.introspector.introspect(path).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(file = %strip_path(path), error = %e, "Introspection failed during validation");
                None
            }
        }
    }
}
