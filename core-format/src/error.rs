use std::path::PathBuf;
use thiserror::Error;

/// Byte-structure problems found by the per-format walkers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("missing metadata block: {0}")]
    MissingBlock(String),

    #[error("missing chunk: {0}")]
    MissingChunk(String),

    #[error("missing atom: {0}")]
    MissingAtom(String),

    #[error("insufficient frames, found {found}, expected ≥{expected}")]
    InsufficientFrames { found: usize, expected: usize },

    #[error("insufficient pages, found {found}, expected ≥{expected}")]
    InsufficientPages { found: usize, expected: usize },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("codec could not be verified: {0}")]
    CodecUnverified(String),
}

/// Format-independent integrity failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("file too small: {size} bytes, minimum {minimum}")]
    TooSmall { size: u64, minimum: u64 },

    #[error("file is not readable")]
    Unreadable,

    #[error("file is not playable")]
    NotPlayable,
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("File not accessible: {0}")]
    NotAccessible(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Insufficient data: {0} bytes")]
    InsufficientData(usize),

    #[error("Structural mismatch: {0}")]
    StructuralMismatch(StructuralError),

    #[error("Integrity failure: {0}")]
    IntegrityFailure(IntegrityError),

    #[error("Corrupted metadata: {0}")]
    CorruptedMetadata(String),

    #[error("No metadata found")]
    NoMetadataFound,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl FormatError {
    /// Maps a bridge failure for `path` onto the detection taxonomy.
    pub fn from_bridge(path: &std::path::Path, err: bridge_traits::error::BridgeError) -> Self {
        if err.is_not_found() {
            FormatError::NotFound(path.to_path_buf())
        } else if err.is_permission_denied() {
            FormatError::NotAccessible(path.to_path_buf())
        } else {
            FormatError::Bridge(err)
        }
    }

    /// Tag parsing found nothing, as opposed to finding something broken.
    pub fn is_metadata_absent(&self) -> bool {
        matches!(self, FormatError::NoMetadataFound)
    }

    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            FormatError::NotFound(_)
                | FormatError::NotAccessible(_)
                | FormatError::Io(_)
                | FormatError::Bridge(_)
        )
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, FormatError::StructuralMismatch(_))
    }
}

impl From<StructuralError> for FormatError {
    fn from(err: StructuralError) -> Self {
        FormatError::StructuralMismatch(err)
    }
}

impl From<IntegrityError> for FormatError {
    fn from(err: IntegrityError) -> Self {
        FormatError::IntegrityFailure(err)
    }
}

impl From<core_runtime::Error> for FormatError {
    fn from(err: core_runtime::Error) -> Self {
        FormatError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use std::io;
    use std::path::Path;

    #[test]
    fn insufficient_frames_message() {
        let err = FormatError::from(StructuralError::InsufficientFrames {
            found: 0,
            expected: 10,
        });
        assert!(err.is_structural());
        assert!(err
            .to_string()
            .contains("insufficient frames, found 0, expected ≥10"));
    }

    #[test]
    fn bridge_not_found_maps_to_not_found() {
        let bridge = BridgeError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = FormatError::from_bridge(Path::new("/music/a.mp3"), bridge);
        assert!(matches!(err, FormatError::NotFound(ref p) if p == Path::new("/music/a.mp3")));
        assert!(err.is_io_error());
    }

    #[test]
    fn bridge_permission_maps_to_not_accessible() {
        let bridge = BridgeError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        let err = FormatError::from_bridge(Path::new("a.flac"), bridge);
        assert!(matches!(err, FormatError::NotAccessible(_)));
    }

    #[test]
    fn metadata_absence_is_distinct_from_corruption() {
        assert!(FormatError::NoMetadataFound.is_metadata_absent());
        assert!(!FormatError::CorruptedMetadata("bad size".into()).is_metadata_absent());
    }
}
