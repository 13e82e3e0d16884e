//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the format engine:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast capability checks
//!
//! ## Overview
//!
//! Hosts build a [`CoreConfig`](config::CoreConfig) once, optionally install
//! logging through [`init_logging`](logging::init_logging), and hand the
//! configuration to `core_format::InspectionService`.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
