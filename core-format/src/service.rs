//! # Inspection Service
//!
//! Host-facing facade. Wires the detector, validator and tag parser over the
//! bridges in a [`CoreConfig`] and adds the batch variants of each operation.
//!
//! The service is cheap to clone; clones share caches and bridges.
//!
//! ```ignore
//! let config = CoreConfig::builder().build()?;
//! let service = InspectionService::new(config)?;
//!
//! let detection = service.detect_path(Path::new("song.flac")).await?;
//! let report = service.validate(Path::new("song.flac"), AudioFormat::Flac).await?;
//! ```

use crate::batch::{run_batch, BatchEntry};
use crate::cache::CacheStats;
use crate::config::DetectionConfig;
use crate::detector::{DetectionResult, DetectionSource, FormatDetector};
use crate::error::Result;
use crate::registry::AudioFormat;
use crate::tags::{AudioArtwork, AudioMetadata, TagParser};
use crate::validator::{StructuralValidator, ValidationResult};
use bytes::Bytes;
use core_runtime::CoreConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Hit and miss counters for both result caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceCacheStats {
    pub detection: CacheStats,
    pub metadata: CacheStats,
}

#[derive(Clone)]
pub struct InspectionService {
    detector: Arc<FormatDetector>,
    validator: Arc<StructuralValidator>,
    tags: Arc<TagParser>,
    max_concurrent_tasks: usize,
}

impl InspectionService {
    pub fn new(config: CoreConfig) -> Result<Self> {
        let detection = DetectionConfig::from(&config);
        Self::with_config(config, detection)
    }

    /// Builds the service with explicit detection tuning. Cache capacity and
    /// concurrency come from `detection`.
    pub fn with_config(config: CoreConfig, detection: DetectionConfig) -> Result<Self> {
        config.validate()?;
        detection.validate()?;

        let mut detector = FormatDetector::new(
            Arc::clone(&config.file_system),
            Arc::clone(&config.introspector),
            &detection,
        );
        if let Some(dir) = &config.scratch_dir {
            detector = detector.with_scratch_dir(dir.clone());
        }
        let detector = Arc::new(detector);

        let validator = Arc::new(StructuralValidator::new(
            Arc::clone(&detector),
            Arc::clone(&config.file_system),
            Arc::clone(&config.introspector),
            &detection,
        ));
        let tags = Arc::new(TagParser::new(
            Arc::clone(&config.file_system),
            detection.cache_capacity,
        ));

        info!(
            cache_capacity = detection.cache_capacity,
            max_concurrent_tasks = detection.max_concurrent_tasks,
            frame_skip = ?detection.frame_skip,
            "Inspection service ready"
        );

        Ok(Self {
            detector,
            validator,
            tags,
            max_concurrent_tasks: detection.max_concurrent_tasks,
        })
    }

    pub async fn detect(&self, source: &DetectionSource) -> Result<DetectionResult> {
        self.detector.detect(source).await
    }

    pub async fn detect_path(&self, path: &Path) -> Result<DetectionResult> {
        self.detector.detect_path(path).await
    }

    pub async fn detect_with_properties(&self, path: &Path) -> Result<DetectionResult> {
        self.detector.detect_with_properties(path).await
    }

    pub async fn detect_bytes(&self, data: impl Into<Bytes>) -> Result<DetectionResult> {
        self.detector.detect_bytes(data.into(), None).await
    }

    /// Raw-byte detection with a caller-supplied MIME hint, used when the
    /// bytes alone are inconclusive.
    pub async fn detect_with_mime(&self, data: impl Into<Bytes>, mime_type: &str) -> Result<DetectionResult> {
        self.detector.detect_bytes(data.into(), Some(mime_type)).await
    }

    pub async fn validate(&self, path: &Path, expected: AudioFormat) -> Result<ValidationResult> {
        self.validator.validate(path, expected).await
    }

    pub async fn validate_bytes(&self, data: impl Into<Bytes>, expected: AudioFormat) -> Result<ValidationResult> {
        self.validator.validate_bytes(data.into(), expected).await
    }

    pub async fn extract_metadata(&self, path: &Path) -> Result<AudioMetadata> {
        self.tags.extract_metadata(path).await
    }

    pub async fn extract_artwork(&self, path: &Path) -> Result<Vec<AudioArtwork>> {
        self.tags.extract_artwork(path).await
    }

    pub async fn detect_batch(&self, paths: Vec<PathBuf>) -> Vec<BatchEntry<DetectionResult>> {
        let detector = Arc::clone(&self.detector);
        run_batch(paths, self.max_concurrent_tasks, move |path| {
            let detector = Arc::clone(&detector);
            async move { detector.detect_path(&path).await }
        })
        .await
    }

    /// Validates every path against the same expected format.
    pub async fn validate_batch(
        &self,
        paths: Vec<PathBuf>,
        expected: AudioFormat,
    ) -> Vec<BatchEntry<ValidationResult>> {
        let validator = Arc::clone(&self.validator);
        run_batch(paths, self.max_concurrent_tasks, move |path| {
            let validator = Arc::clone(&validator);
            async move { validator.validate(&path, expected).await }
        })
        .await
    }

    pub async fn extract_metadata_batch(&self, paths: Vec<PathBuf>) -> Vec<BatchEntry<AudioMetadata>> {
        let tags = Arc::clone(&self.tags);
        run_batch(paths, self.max_concurrent_tasks, move |path| {
            let tags = Arc::clone(&tags);
            async move { tags.extract_metadata(&path).await }
        })
        .await
    }

    pub async fn clear_caches(&self) {
        self.detector.cache().clear().await;
        self.tags.cache().clear().await;
    }

    pub async fn cache_stats(&self) -> ServiceCacheStats {
        ServiceCacheStats {
            detection: self.detector.cache().stats().await,
            metadata: self.tags.cache().stats().await,
        }
    }
}

impl std::fmt::Debug for InspectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectionService")
            .field("max_concurrent_tasks", &self.max_concurrent_tasks)
            .finish_non_exhaustive()
    }
}
