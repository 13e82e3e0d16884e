//! # Format Detection
//!
//! Fuses the file extension, magic bytes and the host [`AudioIntrospector`]
//! into a single confidence-scored [`DetectionResult`].
//!
//! ## Decision order (file sources)
//!
//! 1. Extension guess from the registry confidence table.
//! 2. Magic-byte sniff of the first `sniff_len` bytes.
//! 3. If both agree the result is `Combined` and the introspector is skipped.
//!    A confident sniff that disagrees with the extension wins on its own.
//! 4. Otherwise, or when technical properties are requested, the
//!    introspector is consulted. Its answer carries confidence 1.0.
//! 5. When introspection fails the best heuristic answer is returned.
//!
//! Results for files are cached by path, modification time and size.

use crate::cache::{FileStamp, ResultCache};
use crate::config::DetectionConfig;
use crate::error::{FormatError, Result};
use crate::registry::{AudioFormat, FormatRegistry};
use crate::sniffer::MagicByteSniffer;
use bridge_traits::{AudioIntrospector, AudioTrackInfo, FileSystemAccess, IntrospectionReport};
use bytes::Bytes;
use core_runtime::logging::strip_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Confidence attached to a caller-supplied MIME hint.
pub const MIME_CONFIDENCE: f64 = 0.75;
/// Confidence attached to an introspector answer.
pub const DEEP_INSPECTION_CONFIDENCE: f64 = 1.0;

const STRONG_SNIFF: f64 = 0.9;
const STRONG_EXTENSION: f64 = 0.8;
const AGREEMENT_BONUS: f64 = 0.1;
const MIN_RAW_BYTES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Extension,
    MagicBytes,
    MimeType,
    DeepInspection,
    Combined,
}

/// Stream properties reported by deep inspection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TechnicalProperties {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bit_depth: Option<u16>,
    pub bitrate: Option<u32>,
    pub duration: Option<Duration>,
}

impl TechnicalProperties {
    fn from_report(track: &AudioTrackInfo, report: &IntrospectionReport) -> Self {
        Self {
            sample_rate: track.sample_rate,
            channels: track.channels,
            bit_depth: track.bit_depth,
            bitrate: track.estimated_bitrate,
            duration: report.duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub format: AudioFormat,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub container: Option<AudioFormat>,
    pub method: DetectionMethod,
    pub properties: Option<TechnicalProperties>,
}

impl DetectionResult {
    pub fn new(format: AudioFormat, confidence: f64, method: DetectionMethod) -> Self {
        Self {
            format,
            confidence: confidence.clamp(0.0, 1.0),
            container: None,
            method,
            properties: None,
        }
    }

    pub fn unknown(method: DetectionMethod) -> Self {
        Self::new(AudioFormat::Unknown, 0.0, method)
    }

    pub fn with_container(mut self, container: AudioFormat) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_properties(mut self, properties: TechnicalProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn is_known(&self) -> bool {
        self.format != AudioFormat::Unknown
    }

    /// `true` if the detected format is `expected` or sits inside it.
    pub fn matches(&self, expected: AudioFormat) -> bool {
        self.format.matches(expected) || self.container == Some(expected)
    }
}

/// Input to [`FormatDetector::detect`].
#[derive(Debug, Clone)]
pub enum DetectionSource {
    File(PathBuf),
    Memory {
        data: Bytes,
        mime_type: Option<String>,
    },
}

impl DetectionSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        DetectionSource::File(path.into())
    }

    pub fn memory(data: impl Into<Bytes>) -> Self {
        DetectionSource::Memory {
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn memory_with_mime(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        DetectionSource::Memory {
            data: data.into(),
            mime_type: Some(mime_type.into()),
        }
    }
}

pub struct FormatDetector {
    fs: Arc<dyn FileSystemAccess>,
    introspector: Arc<dyn AudioIntrospector>,
    sniffer: MagicByteSniffer,
    cache: Arc<ResultCache<DetectionResult>>,
    sniff_len: usize,
    scratch_dir: Option<PathBuf>,
}

impl FormatDetector {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        introspector: Arc<dyn AudioIntrospector>,
        config: &DetectionConfig,
    ) -> Self {
        Self {
            fs,
            introspector,
            sniffer: MagicByteSniffer::new(config.sniff_len),
            cache: Arc::new(ResultCache::new(config.cache_capacity)),
            sniff_len: config.sniff_len,
            scratch_dir: None,
        }
    }

    /// Directory for scratch files; defaults to the file system's cache directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn cache(&self) -> &ResultCache<DetectionResult> {
        &self.cache
    }

    pub async fn detect(&self, source: &DetectionSource) -> Result<DetectionResult> {
        match source {
            DetectionSource::File(path) => self.detect_file(path, false).await,
            DetectionSource::Memory { data, mime_type } => {
                self.detect_bytes(data.clone(), mime_type.as_deref()).await
            }
        }
    }

    pub async fn detect_path(&self, path: &Path) -> Result<DetectionResult> {
        self.detect_file(path, false).await
    }

    /// Like [`detect_path`](Self::detect_path) but always consults the
    /// introspector so the result carries [`TechnicalProperties`] when the
    /// file is playable.
    pub async fn detect_with_properties(&self, path: &Path) -> Result<DetectionResult> {
        self.detect_file(path, true).await
    }

    #[instrument(skip(self, path), fields(file = %strip_path(path)))]
    async fn detect_file(&self, path: &Path, require_properties: bool) -> Result<DetectionResult> {
        let metadata = self
            .fs
            .metadata(path)
            .await
            .map_err(|e| FormatError::from_bridge(path, e))?;
        if metadata.is_directory {
            return Err(FormatError::NotAccessible(path.to_path_buf()));
        }
        let stamp = FileStamp::from(&metadata);

        if let Some(cached) = self.cache.get(path, &stamp).await {
            if !require_properties || cached.properties.is_some() {
                debug!(format = %cached.format, "Detection cache hit");
                return Ok(cached);
            }
        }

        let extension = FormatRegistry::by_path(path).format;
        let header = self
            .fs
            .read_prefix(path, self.sniff_len)
            .await
            .map_err(|e| FormatError::from_bridge(path, e))?;
        let sniffed = self.sniffer.sniff(&header);

        let heuristic = resolve_heuristics(extension, &sniffed);
        let result = match heuristic {
            Some(result) if !require_properties => result,
            heuristic => match self.introspect(path, extension, &sniffed).await {
                Some(deep) => deep,
                None => heuristic.unwrap_or_else(|| best_effort(extension, &sniffed)),
            },
        };

        debug!(
            format = %result.format,
            confidence = result.confidence,
            method = ?result.method,
            "Detected format"
        );
        self.cache.insert(path, stamp, result.clone()).await;
        Ok(result)
    }

    /// Detects the format of an in-memory buffer.
    ///
    /// A confident sniff is returned directly. Otherwise the buffer is written
    /// to a scratch file for the introspector, then removed.
    pub async fn detect_bytes(&self, data: Bytes, mime_type: Option<&str>) -> Result<DetectionResult> {
        if data.len() < MIN_RAW_BYTES {
            return Err(FormatError::InsufficientData(data.len()));
        }

        let sniffed = self.sniffer.sniff(&data);
        if sniffed.confidence >= STRONG_SNIFF {
            return Ok(sniffed);
        }

        let mime_hint = mime_type
            .map(|mime| FormatRegistry::by_mime(mime).format)
            .filter(|format| *format != AudioFormat::Unknown);

        let deep = match self.write_scratch(data, "bin").await {
            Some(scratch) => {
                let hint = mime_hint.unwrap_or(AudioFormat::Unknown);
                let deep = self.introspect(&scratch, hint, &sniffed).await;
                self.remove_scratch(&scratch).await;
                deep
            }
            None => None,
        };

        Ok(deep.unwrap_or_else(|| match mime_hint {
            Some(format) => DetectionResult::new(format, MIME_CONFIDENCE, DetectionMethod::MimeType),
            None => sniffed,
        }))
    }

    pub(crate) async fn scratch_directory(&self) -> Result<PathBuf> {
        match &self.scratch_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.fs.get_cache_directory().await?),
        }
    }

    /// Writes `data` to a uniquely named scratch file. `None` if the write
    /// failed; callers fall back to heuristics.
    pub(crate) async fn write_scratch(&self, data: Bytes, extension: &str) -> Option<PathBuf> {
        let dir = match self.scratch_directory().await {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "No scratch directory available");
                return None;
            }
        };
        let path = dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        match self.fs.write_file(&path, data).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(error = %e, "Failed to write scratch file");
                None
            }
        }
    }

    pub(crate) async fn remove_scratch(&self, path: &Path) {
        if let Err(e) = self.fs.delete_file(path).await {
            warn!(file = %strip_path(path), error = %e, "Failed to remove scratch file");
        }
        self.cache.invalidate(path).await;
    }

    async fn introspect(
        &self,
        path: &Path,
        extension: AudioFormat,
        sniffed: &DetectionResult,
    ) -> Option<DetectionResult> {
        let report = match self.introspector.introspect(path).await {
            Ok(report) => report,
            Err(e) => {
                warn!(file = %strip_path(path), error = %e, "Introspection failed");
                return None;
            }
        };

        if !report.is_playable {
            debug!(file = %strip_path(path), "Introspector reports file not playable");
            return None;
        }

        let track = report.primary_track()?;
        let hint = if sniffed.is_known() {
            sniffed.format
        } else {
            extension
        };
        let format = format_from_codec_id(&track.format_id, hint);
        if format == AudioFormat::Unknown {
            debug!(codec = %track.format_id, "Unrecognised codec from introspector");
            return None;
        }

        let mut result = DetectionResult::new(
            format,
            DEEP_INSPECTION_CONFIDENCE,
            DetectionMethod::DeepInspection,
        )
        .with_properties(TechnicalProperties::from_report(track, &report));

        let in_mp4 = sniffed.container == Some(AudioFormat::M4a) || extension == AudioFormat::M4a;
        result.container = match format {
            AudioFormat::Aac if in_mp4 => Some(AudioFormat::M4a),
            AudioFormat::Aac => None,
            AudioFormat::Ogg => Some(AudioFormat::Ogg),
            other => other.container(),
        };
        Some(result)
    }
}

/// Extension and magic-byte fusion. `None` means neither signal is strong
/// enough to skip deep inspection.
///
/// Agreeing signals score `min(1, max(ext, sniff) + 0.1)`, so a strong sniff
/// keeps its own confidence as the floor rather than the extension's.
fn resolve_heuristics(extension: AudioFormat, sniffed: &DetectionResult) -> Option<DetectionResult> {
    let ext_confidence = extension.extension_confidence();

    let agrees = sniffed.is_known()
        && (sniffed.format == extension
            || (extension.is_container() && sniffed.container == Some(extension)));
    let strong_sniff = sniffed.confidence >= STRONG_SNIFF;

    if agrees && (ext_confidence >= STRONG_EXTENSION || strong_sniff) {
        let confidence = (ext_confidence.max(sniffed.confidence) + AGREEMENT_BONUS).min(1.0);
        let mut combined = DetectionResult::new(sniffed.format, confidence, DetectionMethod::Combined);
        combined.container = sniffed.container;
        return Some(combined);
    }

    if strong_sniff {
        return Some(sniffed.clone());
    }

    None
}

fn best_effort(extension: AudioFormat, sniffed: &DetectionResult) -> DetectionResult {
    if sniffed.is_known() {
        return sniffed.clone();
    }
    if extension != AudioFormat::Unknown {
        return DetectionResult::new(
            extension,
            extension.extension_confidence(),
            DetectionMethod::Extension,
        );
    }
    DetectionResult::unknown(DetectionMethod::Extension)
}

/// Maps an introspector codec id to a format. PCM is ambiguous between WAV
/// and AIFF, so `hint` decides when it names one of them.
fn format_from_codec_id(codec_id: &str, hint: AudioFormat) -> AudioFormat {
    let id = codec_id.trim().to_ascii_lowercase();
    match id.as_str() {
        "mp3" | "mpeg" | "mp2" | "mp1" => AudioFormat::Mp3,
        "aac" => AudioFormat::Aac,
        "alac" => AudioFormat::Alac,
        "flac" => AudioFormat::Flac,
        "vorbis" => AudioFormat::Ogg,
        "opus" => AudioFormat::Opus,
        pcm if pcm.starts_with("pcm") => match hint {
            AudioFormat::Wav | AudioFormat::Aiff => hint,
            _ if pcm.ends_with("_be") => AudioFormat::Aiff,
            _ => AudioFormat::Wav,
        },
        _ => AudioFormat::Unknown,
    }
}
