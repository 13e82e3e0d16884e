//! # Host Bridge Traits
//!
//! Capability traits the format engine needs from its host.
//!
//! ## Overview
//!
//! The detection and validation core never talks to the operating system or
//! to a media framework directly. Everything that differs between hosts is
//! expressed here as a trait and injected at configuration time:
//!
//! - [`FileSystemAccess`](storage::FileSystemAccess) - length-capped reads,
//!   file metadata, scratch files for in-memory sources
//! - [`AudioIntrospector`](introspection::AudioIntrospector) - deep
//!   inspection through a platform media framework, used only to confirm or
//!   fall back on the byte-level heuristics
//! - [`LoggerSink`](logging::LoggerSink) - forwards structured logs to the
//!   host logging pipeline
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Mobile   | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should keep the original `std::io::Error` when the failure comes from the
//! filesystem so callers can tell a missing file from a permission problem.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; the core shares a single adapter
//! across many concurrent tasks.
//!
//! ## Examples
//!
//! ### Implementing AudioIntrospector
//!
//! ```ignore
//! use bridge_traits::introspection::{AudioIntrospector, IntrospectionReport};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//! use std::path::Path;
//!
//! pub struct PlatformProber;
//!
//! #[async_trait]
//! impl AudioIntrospector for PlatformProber {
//!     async fn introspect(&self, path: &Path) -> Result<IntrospectionReport> {
//!         // Ask the platform media framework about `path`
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod introspection;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use introspection::{AudioIntrospector, AudioTrackInfo, IntrospectionReport};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use storage::{FileMetadata, FileSystemAccess};
