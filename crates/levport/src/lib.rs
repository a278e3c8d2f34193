//! levport: translate Lua dungeon-level descriptions into JavaScript modules.
//!
//! # Architecture
//!
//! ```text
//! source ──> levport-syntax ──> Chunk ──> levport-lower ──> IR + SymbolUsage
//!                                                               │
//!            .js module <── levport-codegen <── Module <── resolve_imports
//! ```
//!
//! [`pipeline::translate`] runs one file through every stage and collects
//! its diagnostics; [`batch::run_batch`] does the same for a directory in
//! parallel.

pub mod batch;
pub mod config;
pub mod pipeline;

pub use batch::{BatchError, BatchReport, FileReport, FileStatus, SKIPPED_FILES, run_batch};
pub use config::{ConfigError, LevportConfig, OutputConfig};
pub use pipeline::{Translation, translate};
