//! # Core Configuration Module
//!
//! Provides configuration management for the format inspection core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and the tuning knobs shared by the
//! detector, the validator and the batch runner. It enforces fail-fast
//! validation so a missing bridge is reported before any file is touched.
//!
//! ## Required Dependencies
//!
//! - `FileSystemAccess` - Metadata lookups, header reads and scratch files
//! - `AudioIntrospector` - Deep container/codec inspection
//!
//! When the `desktop-shims` feature is enabled, `TokioFileSystem` and
//! `SymphoniaIntrospector` are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .cache_capacity(4096)
//!     .max_concurrent_tasks(16)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! Without the `desktop-shims` feature, omitting a bridge yields
//! [`Error::CapabilityMissing`] naming the capability that must be injected.

use crate::error::{Error, Result};
use bridge_traits::{AudioIntrospector, FileSystemAccess};
use std::path::PathBuf;
use std::sync::Arc;

/// Default number of entries kept in each result cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Default upper bound on files inspected at the same time by batch calls.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 8;

const MAX_CACHE_CAPACITY: usize = 1_000_000;
const MAX_CONCURRENT_TASKS: usize = 1024;

/// Core configuration for the format inspection engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// File system access abstraction
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Deep inspection capability used when header sniffing is not conclusive
    pub introspector: Arc<dyn AudioIntrospector>,

    /// Directory for scratch files written during raw-byte inspection.
    /// Falls back to `FileSystemAccess::get_cache_directory` when unset.
    pub scratch_dir: Option<PathBuf>,

    /// Maximum number of entries in each result cache
    pub cache_capacity: usize,

    /// Maximum number of files processed concurrently by batch operations
    pub max_concurrent_tasks: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("introspector", &"AudioIntrospector { ... }")
            .field("scratch_dir", &self.scratch_dir)
            .field("cache_capacity", &self.cache_capacity)
            .field("max_concurrent_tasks", &self.max_concurrent_tasks)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Cache capacity is > 0 and at most 1,000,000 entries
    /// - Concurrency limit is > 0 and at most 1024 tasks
    /// - Scratch directory, when set, is not empty
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::Config(
                "Cache capacity must be greater than 0".to_string(),
            ));
        }

        if self.cache_capacity > MAX_CACHE_CAPACITY {
            return Err(Error::Config(format!(
                "Cache capacity exceeds maximum of {} entries",
                MAX_CACHE_CAPACITY
            )));
        }

        if self.max_concurrent_tasks == 0 {
            return Err(Error::Config(
                "Concurrency limit must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_tasks > MAX_CONCURRENT_TASKS {
            return Err(Error::Config(format!(
                "Concurrency limit exceeds maximum of {} tasks",
                MAX_CONCURRENT_TASKS
            )));
        }

        if let Some(dir) = &self.scratch_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config(
                    "Scratch directory cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn file_system_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for reading audio files. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Other hosts: inject a platform file access bridge."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn introspector_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioIntrospector".to_string(),
        message: "AudioIntrospector implementation is required for deep format inspection. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default SymphoniaIntrospector. \
                 Other hosts: inject the platform media probing API."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(file_system_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_introspector() -> Result<Arc<dyn AudioIntrospector>> {
    use bridge_desktop::SymphoniaIntrospector;

    let introspector: Arc<dyn AudioIntrospector> = Arc::new(SymphoniaIntrospector::new());
    Ok(introspector)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_introspector() -> Result<Arc<dyn AudioIntrospector>> {
    Err(introspector_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and produce the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    file_system: Option<Arc<dyn FileSystemAccess>>,
    introspector: Option<Arc<dyn AudioIntrospector>>,
    scratch_dir: Option<PathBuf>,
    cache_capacity: Option<usize>,
    max_concurrent_tasks: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the file system access implementation.
    ///
    /// If not provided, `TokioFileSystem` is used when the `desktop-shims`
    /// feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the audio introspector implementation.
    ///
    /// If not provided, `SymphoniaIntrospector` is used when the
    /// `desktop-shims` feature is enabled.
    pub fn introspector(mut self, introspector: Arc<dyn AudioIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Sets the directory used for scratch files.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().scratch_dir("/tmp/audiosniff");
    /// ```
    pub fn scratch_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.scratch_dir = Some(path.into());
        self
    }

    /// Sets the result cache capacity in entries.
    ///
    /// Default: 1024
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Sets the batch concurrency limit.
    ///
    /// Default: 8
    pub fn max_concurrent_tasks(mut self, limit: usize) -> Self {
        self.max_concurrent_tasks = Some(limit);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if a bridge is missing and no platform default is
    /// available, or if a tuning value is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let introspector = match self.introspector {
            Some(introspector) => introspector,
            None => provide_default_introspector()?,
        };

        let config = CoreConfig {
            file_system,
            introspector,
            scratch_dir: self.scratch_dir,
            cache_capacity: self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
            max_concurrent_tasks: self
                .max_concurrent_tasks
                .unwrap_or(DEFAULT_MAX_CONCURRENT_TASKS),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, FileMetadata, IntrospectionReport};
    use bytes::Bytes;
    use std::path::Path;

    struct NullFileSystem;

    #[async_trait]
    impl FileSystemAccess for NullFileSystem {
        async fn get_cache_directory(&self) -> BridgeResult<PathBuf> {
            Ok(PathBuf::from("/tmp"))
        }

        async fn read_range(&self, _path: &Path, _offset: u64, _max_len: usize) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }

        async fn metadata(&self, _path: &Path) -> BridgeResult<FileMetadata> {
            Err(BridgeError::OperationFailed("not supported".to_string()))
        }

        async fn read_file(&self, _path: &Path) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }

        async fn read_prefix(&self, _path: &Path, _max_len: usize) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }

        async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }

        async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct NullIntrospector;

    #[async_trait]
    impl AudioIntrospector for NullIntrospector {
        async fn introspect(&self, _path: &Path) -> BridgeResult<IntrospectionReport> {
            Ok(IntrospectionReport::unplayable())
        }
    }

    fn builder_with_bridges() -> CoreConfigBuilder {
        CoreConfig::builder()
            .file_system(Arc::new(NullFileSystem))
            .introspector(Arc::new(NullIntrospector))
    }

    #[test]
    fn test_builder_defaults() {
        let config = builder_with_bridges().build().unwrap();
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.max_concurrent_tasks, DEFAULT_MAX_CONCURRENT_TASKS);
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = builder_with_bridges()
            .cache_capacity(16)
            .max_concurrent_tasks(2)
            .scratch_dir("/var/tmp/scratch")
            .build()
            .unwrap();

        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.max_concurrent_tasks, 2);
        assert_eq!(config.scratch_dir, Some(PathBuf::from("/var/tmp/scratch")));
    }

    #[test]
    fn test_validate_rejects_zero_cache_capacity() {
        let result = builder_with_bridges().cache_capacity(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_excessive_cache_capacity() {
        let result = builder_with_bridges().cache_capacity(2_000_000).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let result = builder_with_bridges().max_concurrent_tasks(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_excessive_concurrency() {
        let result = builder_with_bridges().max_concurrent_tasks(4096).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_scratch_dir() {
        let result = builder_with_bridges().scratch_dir("").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_file_system() {
        let result = CoreConfig::builder()
            .introspector(Arc::new(NullIntrospector))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "FileSystemAccess");
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_introspector() {
        let result = CoreConfig::builder()
            .file_system(Arc::new(NullFileSystem))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "AudioIntrospector");
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder().build().unwrap();
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = builder_with_bridges().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("FileSystemAccess { ... }"));
        assert!(rendered.contains("cache_capacity: 1024"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = builder_with_bridges().build().unwrap();
        let cloned = config.clone();
        assert!(Arc::ptr_eq(&config.file_system, &cloned.file_system));
    }
}
