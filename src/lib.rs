//! # source-flow
//!
//! Turns a project directory into an ordered, size-bounded prompt for
//! conversational AI assistants.
//!
//! ## Features
//!
//! - Built-in, custom and `.gitignore` ignore patterns
//! - A sorted directory tree followed by every file's contents
//! - Automatic splitting of large projects into numbered parts
//! - Resumable copy sessions and atomic writes with backups
//!
//! ## Quick Start
//!
//! ```no_run
//! use source_flow::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir("./my-app")
//!     .output_dir("./prompts")
//!     .ignore_pattern("*.snap")
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! The engine can also be driven directly with files already in memory:
//!
//! ```
//! use source_flow::{process_project, FileRecord};
//!
//! let files = vec![
//!     FileRecord::new("README.md", "# Demo"),
//!     FileRecord::new("node_modules/x/index.js", "ignored"),
//! ];
//! let output = process_project(files, "demo", Vec::new(), "").unwrap();
//!
//! assert_eq!(output.tree, "demo\n└── README.md");
//! assert!(!output.is_chunked);
//! ```
//!
//! ## Architecture
//!
//! 1. **Scanner**: Reads text files from a directory
//! 2. **Engine**: Filters, builds the tree, assembles parts and splits chunks
//! 3. **Writer**: Renders chunks to files alongside a summary and a session

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod engine;
mod error;
mod pipeline;
mod scanner;
mod writer;

pub mod assembler;
pub mod file;
pub mod patterns;
pub mod render;
pub mod session;
pub mod splitter;
pub mod token;
pub mod tree;
pub mod worker;

pub use assembler::ContentPart;
pub use config::{Config, ConfigBuilder, OUTPUT_EXTENSION};
pub use engine::{process_project, Engine, ProcessedOutput, Progress, ProjectInput};
pub use error::{Error, Result};
pub use file::FileRecord;
pub use patterns::{is_ignored, IgnoreMatcher, DEFAULT_IGNORE_PATTERNS};
pub use pipeline::{Pipeline, PipelineStats};
pub use render::{render_chunk, render_output};
pub use scanner::find_gitignore;
pub use session::Session;
pub use splitter::Chunk;
pub use tree::build_tree;
pub use worker::{JobHandle, Worker, WorkerEvent};

/// Runs the complete pipeline with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - No processable files are found
/// - Output directory cannot be created
/// - File operations fail
///
/// # Examples
///
/// ```no_run
/// use source_flow::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .root_dir(".")
///     .build()?;
///
/// run(config)?.print_summary();
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
