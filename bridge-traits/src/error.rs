use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// Returns the underlying I/O error kind, if this error came from the filesystem.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            BridgeError::Io(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Returns `true` if the target file or directory does not exist.
    pub fn is_not_found(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::NotFound)
    }

    /// Returns `true` if the host refused access to the target.
    pub fn is_permission_denied(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::PermissionDenied)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
