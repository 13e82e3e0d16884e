//! Bounded reads over the parts of a file that tag and structure parsing
//! look at: a leading ID3v2 tag plus a fixed budget after it, and the
//! 128-byte ID3v1 slot at the end.
//!
//! Files that fit in the window are read whole in one call.

use crate::error::{FormatError, Result};
use crate::tags::id3v1::TAG_LEN;
use crate::tags::id3v2::{TagHeader, HEADER_LEN};
use bridge_traits::{BridgeError, FileSystemAccess};
use bytes::Bytes;
use std::path::Path;
use tracing::trace;

#[derive(Debug, Clone)]
pub(crate) struct FileWindow {
    /// Leading ID3v2 tag (if any) followed by up to `budget` bytes.
    pub head: Bytes,
    /// Last `TAG_LEN` bytes of the file, or the whole file when shorter.
    pub trailer: Bytes,
    /// Size of the file on disk.
    pub size: u64,
}

impl FileWindow {
    pub async fn read(fs: &dyn FileSystemAccess, path: &Path, size: u64, budget: usize) -> Result<Self> {
        let bridge = |e: BridgeError| FormatError::from_bridge(path, e);

        let header = fs.read_prefix(path, HEADER_LEN).await.map_err(bridge)?;
        let tag_len = TagHeader::parse(&header)
            .ok()
            .flatten()
            .map(|h| h.total_len())
            .unwrap_or(0);
        let head_len = tag_len.saturating_add(budget);

        if size <= head_len as u64 {
            let head = fs.read_file(path).await.map_err(bridge)?;
            let trailer = head.slice(head.len().saturating_sub(TAG_LEN)..);
            trace!(size, "Read whole file");
            return Ok(Self {
                size: head.len() as u64,
                head,
                trailer,
            });
        }

        let head = fs.read_prefix(path, head_len).await.map_err(bridge)?;
        let trailer = fs
            .read_range(path, size.saturating_sub(TAG_LEN as u64), TAG_LEN)
            .await
            .map_err(bridge)?;
        trace!(size, head = head.len(), tag_len, "Read file window");
        Ok(Self {
            head,
            trailer,
            size,
        })
    }

    /// Offset where audio data stops: the start of the ID3v1 block, or EOF.
    pub fn audio_end(&self) -> u64 {
        if crate::validator::structure::has_id3v1_trailer(&self.trailer) {
            self.size.saturating_sub(TAG_LEN as u64)
        } else {
            self.size
        }
    }
}
