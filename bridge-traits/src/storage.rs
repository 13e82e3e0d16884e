//! File System Abstractions
//!
//! Provides the platform-agnostic file access the format engine relies on.
//! Reads are deliberately length-capped: sniffing only ever needs a short
//! header, and adversarial input must not force unbounded reads.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Size in bytes
    pub size: u64,
    /// Last modification time as Unix milliseconds, when the host reports one
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app directories
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn header(fs: &dyn FileSystemAccess, path: &Path) -> Result<Bytes> {
///     fs.read_prefix(path, 64).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the directory used for short-lived scratch files
    ///
    /// The directory is created if it doesn't exist yet.
    async fn get_cache_directory(&self) -> Result<PathBuf>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Read at most `max_len` bytes from the start of a file
    ///
    /// Returns fewer bytes when the file is shorter than `max_len`.
    async fn read_prefix(&self, path: &Path, max_len: usize) -> Result<Bytes>;

    /// Read at most `max_len` bytes starting at byte `offset`
    ///
    /// Returns an empty buffer when `offset` is at or past the end of the file.
    async fn read_range(&self, path: &Path, offset: u64, max_len: usize) -> Result<Bytes>;

    /// Write data to a file, creating it if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;
}
