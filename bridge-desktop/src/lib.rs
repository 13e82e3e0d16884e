//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`
//! - `AudioIntrospector` using the Symphonia probe and codec registry
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{SymphoniaIntrospector, TokioFileSystem};
//! use std::sync::Arc;
//!
//! let fs = Arc::new(TokioFileSystem::new());
//! let introspector = Arc::new(SymphoniaIntrospector::new());
//! // Hand both to `CoreConfig::builder()`
//! ```

mod filesystem;
mod introspector;

pub use filesystem::TokioFileSystem;
pub use introspector::SymphoniaIntrospector;
