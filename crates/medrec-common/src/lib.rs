//! medrec Common Library
//!
//! Shared types, utilities, and error handling for the medrec workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all medrec members:
//!
//! - **Error Handling**: Shared error and result types
//! - **Logging**: Tracing subscriber setup with console/file output
//! - **Checksums**: Content digests used for canonical asset keys

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{MedrecError, Result};
