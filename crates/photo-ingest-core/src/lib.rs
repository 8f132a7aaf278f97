//! Core functionality for ingesting a directory of photos.
//!
//! This library provides the components of an ingest run:
//! - File discovery and metadata extraction
//! - Flat staging of eligible images
//! - Record storage
//! - Atomic replacement of the source directory

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, Result};
pub use pipeline::IngestPipeline;
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod decision;
pub mod discovery;
pub mod fs_ops;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod staging;
pub mod store;
pub mod swap;
pub mod types;
