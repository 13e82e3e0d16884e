use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl Error {
    /// Returns `true` when a required host bridge was not provided.
    pub fn is_capability_missing(&self) -> bool {
        matches!(self, Error::CapabilityMissing { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
