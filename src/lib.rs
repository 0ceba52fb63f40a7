//! # icu-tzdata-patch
//!
//! Patch a compiled ICU locale-data bundle (a `.dat` file, like the one
//! embedded in Node.js) with updated timezone resources published in the
//! unicode-org/icu-data repository.
//!
//! A run downloads the four timezone resource files for a given tzdata
//! version, ICU version, and byte order, and merges each one into the target
//! bundle with ICU's `icupkg` tool. Resources are processed strictly in
//! order; the first failure aborts the run. There is no retry and no rollback
//! of merges already applied.
//!
//! ## Quick Start
//!
//! ```no_run
//! use icu_tzdata_patch::{MergeTool, PatchRequest, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = PatchRequest::new("./icudt61l.dat");
//!     let tool = MergeTool::from_path().expect("icupkg not found in PATH");
//!     Pipeline::new(tool).run(&request).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Request parameters, resource manifest, and URL derivation
pub mod config;
/// Error types
pub mod error;
/// Streaming resource downloads
pub mod fetcher;
/// External merge tool invocation
pub mod patcher;
/// The patch run orchestrator
pub mod pipeline;

// Re-export commonly used types
pub use config::{Endianness, PatchRequest, REQUIRED_RESOURCES};
pub use error::{Error, Result};
pub use patcher::MergeTool;
pub use pipeline::Pipeline;
