//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-format`). Host applications can depend on
//! `audiosniff-workspace` and enable the documented features without needing
//! to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_format::InspectionService;
