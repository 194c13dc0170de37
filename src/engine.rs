//! The filtering-and-chunking engine.
//!
//! Pure and synchronous: given file records and pattern inputs it produces a
//! [`ProcessedOutput`] or an error, touching no I/O and no shared state. Every
//! run compiles its own pattern set and allocates its own tree and
//! accumulators, so runs may execute in parallel.

use crate::{
    assembler::assemble,
    config::Config,
    error::{Error, Result},
    file::FileRecord,
    patterns::{IgnoreMatcher, DEFAULT_IGNORE_PATTERNS},
    splitter::{Chunk, Splitter},
    token::CHUNK_CHAR_BUDGET,
    tree::DirectoryTree,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Complete result of one processing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedOutput {
    /// Rendered directory tree
    pub tree: String,

    /// One or more chunks in delivery order
    pub chunks: Vec<Chunk>,

    /// True if the output was split into framed chunks
    #[serde(rename = "isChunked")]
    pub is_chunked: bool,

    /// Coarse token estimate for tree plus file contents
    pub token_estimate: usize,
}

impl ProcessedOutput {
    /// Returns the number of chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Iterates over every file path included in the output.
    pub fn included_paths(&self) -> impl Iterator<Item = &str> {
        self.chunks
            .iter()
            .flat_map(Chunk::paths)
            .filter(|p| *p != crate::assembler::PROJECT_STRUCTURE_LABEL)
    }
}

/// Inputs for one processing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInput {
    /// Files in any order
    pub files: Vec<FileRecord>,

    /// Tree root label and name used in generated text
    pub project_name: String,

    /// Trimmed, comment-free patterns supplied by the user
    pub custom_ignore_patterns: Vec<String>,

    /// Raw `.gitignore` text, or empty
    pub gitignore_content: String,
}

impl ProjectInput {
    /// Creates input with no custom patterns and no `.gitignore`.
    #[must_use]
    pub fn new(files: Vec<FileRecord>, project_name: impl Into<String>) -> Self {
        Self {
            files,
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    /// Sets the custom ignore patterns.
    #[must_use]
    pub fn custom_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.custom_ignore_patterns = patterns;
        self
    }

    /// Sets the `.gitignore` content.
    #[must_use]
    pub fn gitignore_content(mut self, content: impl Into<String>) -> Self {
        self.gitignore_content = content.into();
        self
    }
}

/// Advisory progress checkpoints reported during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Pattern matching is about to start
    Filtering,
    /// Tree construction is about to start
    BuildingTree,
    /// Assembly is about to start
    Formatting,
    /// Content exceeded the budget and is being split
    Chunking,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Filtering => "Filtering project files...",
            Self::BuildingTree => "Building project tree...",
            Self::Formatting => "Formatting final output...",
            Self::Chunking => "Project is large, splitting into chunks...",
        };
        f.write_str(message)
    }
}

/// Filtering-and-chunking engine.
#[derive(Debug, Clone)]
pub struct Engine {
    default_patterns: Vec<String>,
    chunk_char_budget: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            default_patterns: DEFAULT_IGNORE_PATTERNS.iter().map(|p| (*p).to_string()).collect(),
            chunk_char_budget: CHUNK_CHAR_BUDGET,
        }
    }
}

impl Engine {
    /// Creates an engine from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let default_patterns = if config.use_default_ignores {
            DEFAULT_IGNORE_PATTERNS.iter().map(|p| (*p).to_string()).collect()
        } else {
            Vec::new()
        };

        Self {
            default_patterns,
            chunk_char_budget: config.chunk_char_budget,
        }
    }

    /// Returns the per-chunk character budget.
    #[must_use]
    pub const fn chunk_char_budget(&self) -> usize {
        self.chunk_char_budget
    }

    /// Compiles the merged pattern set for one run.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern fails to compile.
    pub fn matcher(&self, input: &ProjectInput) -> Result<IgnoreMatcher> {
        IgnoreMatcher::from_sources(
            &self.default_patterns,
            &input.custom_ignore_patterns,
            &input.gitignore_content,
        )
    }

    /// Keeps the files no pattern excludes, sorted by path.
    ///
    /// Ordering is byte-wise rather than locale-aware, so `README.md` sorts
    /// before `package.json`.
    #[must_use]
    pub fn filter(&self, files: &[FileRecord], matcher: &IgnoreMatcher) -> Vec<FileRecord> {
        let mut kept: Vec<FileRecord> = files
            .iter()
            .filter(|f| !matcher.is_ignored(&f.path))
            .cloned()
            .collect();
        kept.sort_by(|a, b| a.path.cmp(&b.path));
        kept
    }

    /// Runs the engine without progress reporting.
    ///
    /// # Errors
    ///
    /// See [`Engine::process_with_progress`].
    pub fn process(&self, input: &ProjectInput) -> Result<ProcessedOutput> {
        self.process_with_progress(input, &mut |_| {})
    }

    /// Runs the engine, reporting checkpoints to `on_progress`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A pattern cannot be compiled
    /// - No file survives filtering
    pub fn process_with_progress(
        &self,
        input: &ProjectInput,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<ProcessedOutput> {
        on_progress(Progress::Filtering);
        info!("Processing project '{}'", input.project_name);

        let matcher = self.matcher(input)?;
        let files = self.filter(&input.files, &matcher);
        debug!(
            "Found {} total files, {} after filtering ({} patterns)",
            input.files.len(),
            files.len(),
            matcher.len()
        );

        if files.is_empty() {
            return Err(Error::no_files(&input.project_name));
        }

        on_progress(Progress::BuildingTree);
        let tree = DirectoryTree::from_paths(files.iter().map(|f| f.path.as_str()))
            .render(&input.project_name);

        on_progress(Progress::Formatting);
        let assembly = assemble(&files, &input.project_name, &tree);

        let splitter = Splitter::new(input.project_name.as_str(), self.chunk_char_budget);
        if splitter.needs_chunking(assembly.token_estimate) {
            on_progress(Progress::Chunking);
        }
        let split = splitter.split(assembly.parts, assembly.token_estimate);

        info!(
            "Processing complete: {} chunk(s), ~{} tokens",
            split.chunks.len(),
            assembly.token_estimate
        );

        Ok(ProcessedOutput {
            tree,
            chunks: split.chunks,
            is_chunked: split.is_chunked,
            token_estimate: assembly.token_estimate,
        })
    }
}

/// Processes a project with the default engine.
///
/// # Errors
///
/// See [`Engine::process_with_progress`].
pub fn process_project(
    files: Vec<FileRecord>,
    project_name: &str,
    custom_ignore_patterns: Vec<String>,
    gitignore_content: &str,
) -> Result<ProcessedOutput> {
    let input = ProjectInput::new(files, project_name)
        .custom_ignore_patterns(custom_ignore_patterns)
        .gitignore_content(gitignore_content);

    Engine::default().process(&input)
}
