//! Tuning knobs for detection, validation and batch runs.

use crate::error::{FormatError, Result};
use core_runtime::CoreConfig;
use serde::{Deserialize, Serialize};

/// How the MP3 frame scan moves past a matched header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSkip {
    /// Advance a fixed 400 bytes per match, independent of bitrate.
    #[default]
    Approximate,
    /// Advance by the frame length computed from the header fields.
    Exact,
}

/// Bytes skipped per match under [`FrameSkip::Approximate`].
pub const APPROXIMATE_FRAME_SKIP: usize = 400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Number of header bytes read for magic-byte sniffing
    #[serde(default = "default_sniff_len")]
    pub sniff_len: usize,

    /// Entries kept per result cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Files inspected concurrently by batch operations
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    #[serde(default)]
    pub frame_skip: FrameSkip,
}

fn default_sniff_len() -> usize {
    64
}

fn default_cache_capacity() -> usize {
    core_runtime::config::DEFAULT_CACHE_CAPACITY
}

fn default_max_concurrent_tasks() -> usize {
    core_runtime::config::DEFAULT_MAX_CONCURRENT_TASKS
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sniff_len: default_sniff_len(),
            cache_capacity: default_cache_capacity(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            frame_skip: FrameSkip::default(),
        }
    }
}

impl DetectionConfig {
    pub fn with_frame_skip(mut self, frame_skip: FrameSkip) -> Self {
        self.frame_skip = frame_skip;
        self
    }

    pub fn with_sniff_len(mut self, sniff_len: usize) -> Self {
        self.sniff_len = sniff_len;
        self
    }

    pub fn validate(&self) -> Result<()> {
        // Shortest signature check needs the AIFF/WAVE form type at bytes 8..12.
        if self.sniff_len < 12 {
            return Err(FormatError::Config(format!(
                "sniff length must be at least 12 bytes, got {}",
                self.sniff_len
            )));
        }
        if self.cache_capacity == 0 {
            return Err(FormatError::Config(
                "cache capacity must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent_tasks == 0 {
            return Err(FormatError::Config(
                "concurrency limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&CoreConfig> for DetectionConfig {
    fn from(core: &CoreConfig) -> Self {
        Self {
            cache_capacity: core.cache_capacity,
            max_concurrent_tasks: core.max_concurrent_tasks,
            ..Self::default()
        }
    }
}
