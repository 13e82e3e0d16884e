//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// Tokio-based file system implementation
///
/// Provides async file I/O operations using:
/// - `tokio::fs` for async operations
/// - the platform cache directory for scratch files
pub struct TokioFileSystem {
    cache_dir: PathBuf,
}

impl TokioFileSystem {
    /// Create a new file system accessor using the platform cache directory
    pub fn new() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("audiosniff");

        Self { cache_dir }
    }

    /// Create a new file system accessor with a custom scratch directory
    pub fn with_cache_directory(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_cache_directory(&self) -> Result<PathBuf> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(Self::map_io_error)?;
            debug!(path = ?self.cache_dir, "Created cache directory");
        }
        Ok(self.cache_dir.clone())
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64),
            is_directory: metadata.is_dir(),
        })
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn read_prefix(&self, path: &Path, max_len: usize) -> Result<Bytes> {
        let file = fs::File::open(path).await.map_err(Self::map_io_error)?;
        let mut buffer = Vec::with_capacity(max_len.min(64 * 1024));
        file.take(max_len as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = buffer.len(), "Read file prefix");
        Ok(Bytes::from(buffer))
    }

    async fn read_range(&self, path: &Path, offset: u64, max_len: usize) -> Result<Bytes> {
        let mut file = fs::File::open(path).await.map_err(Self::map_io_error)?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(Self::map_io_error)?;
        let mut buffer = Vec::with_capacity(max_len.min(64 * 1024));
        file.take(max_len as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, offset, size = buffer.len(), "Read file range");
        Ok(Bytes::from(buffer))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(Self::map_io_error)?;
        }
        fs::write(path, &data).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }
}
