//! Arcade Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Arcade workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`CommonError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by environment variables
//! - **Retry**: bounded exponential-backoff policy used during bootstrap
//! - **Checksums**: streaming SHA-256 digests for uploaded archives
//! - **Types**: build tokens and the catalog record lifecycle
//!
//! # Example
//!
//! ```no_run
//! use arcade_common::checksum::sha256_file;
//! use arcade_common::Result;
//!
//! fn fingerprint(path: &str) -> Result<()> {
//!     let digest = sha256_file(path)?;
//!     tracing::info!(%digest, "Archive fingerprint computed");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod retry;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
