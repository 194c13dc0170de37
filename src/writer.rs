use crate::{
    config::{Config, OUTPUT_EXTENSION},
    engine::ProcessedOutput,
    error::{Error, Result},
    render::render_chunk,
    session::{Session, SESSION_FILE_NAME},
    splitter::Chunk,
};
use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info};

const SUMMARY_FILE_NAME: &str = "summary.json";

/// Summary of a written output.
#[derive(Debug, Serialize)]
pub(crate) struct WriteSummary {
    /// Total number of chunks written
    pub total_chunks: usize,

    /// True if the output was framed for multi-part delivery
    pub is_chunked: bool,

    /// Token estimate for tree plus file contents
    pub token_estimate: usize,

    /// Output directory path
    pub output_directory: String,

    /// Individual chunk summaries
    pub chunks: Vec<ChunkSummary>,

    /// Rendered directory tree
    pub tree: String,

    /// Generation timestamp
    pub generated_at: String,
}

/// Summary of a single chunk.
#[derive(Debug, Serialize)]
pub(crate) struct ChunkSummary {
    /// Chunk index (1-based for user display)
    pub index: usize,

    /// Number of parts in chunk
    pub parts: usize,

    /// Number of file bodies in chunk
    pub files: usize,

    /// Estimated tokens in chunk
    pub estimated_tokens: usize,

    /// Output filename
    pub filename: String,
}

/// Writes rendered chunks to output files with atomic operations.
pub(crate) struct Writer {
    output_dir: PathBuf,
    output_pattern: String,
    backup_existing: bool,
}

impl Writer {
    /// Creates a new writer from configuration.
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            output_pattern: config.output_pattern.clone(),
            backup_existing: config.backup_existing,
        }
    }

    /// Writes chunk files, `summary.json` and a fresh `session.json`.
    ///
    /// Returns the paths of the chunk files in order.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Output directory cannot be created
    /// - File write operations fail
    pub(crate) fn write(&self, output: &ProcessedOutput) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;

        info!(
            "Writing {} chunks to {}",
            output.chunk_count(),
            self.output_dir.display()
        );

        let mut written = Vec::with_capacity(output.chunk_count());
        for (index, chunk) in output.chunks.iter().enumerate() {
            written.push(self.write_chunk(chunk, index, output.chunk_count())?);
        }

        self.write_summary(output)?;
        Session::new(output.clone()).save(&self.session_path())?;

        info!("Successfully wrote {} chunk files", written.len());
        Ok(written)
    }

    /// Path of the session file in the output directory.
    pub(crate) fn session_path(&self) -> PathBuf {
        self.output_dir.join(SESSION_FILE_NAME)
    }

    fn write_chunk(&self, chunk: &Chunk, index: usize, total_chunks: usize) -> Result<PathBuf> {
        let content = render_chunk(chunk);
        let path = self.get_output_path(index);

        self.write_file_atomic(&path, &content)?;

        debug!(
            "Wrote chunk {}/{} ({} parts, ~{} tokens) to {}",
            index + 1,
            total_chunks,
            chunk.part_count(),
            chunk.estimated_tokens(),
            path.display()
        );

        Ok(path)
    }

    /// Generates the output file path for a zero-based chunk index.
    fn get_output_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(self.output_file_name(index))
    }

    fn output_file_name(&self, index: usize) -> String {
        let number = index + 1;
        self.output_pattern
            .replace("{index:03}", &format!("{number:03}"))
            .replace("{index:02}", &format!("{number:02}"))
            .replace("{index}", &number.to_string())
            .replace("{ext}", OUTPUT_EXTENSION)
    }

    /// Writes a file atomically with optional backup.
    ///
    /// # Process
    ///
    /// 1. Creates backup if file exists and backup is enabled
    /// 2. Writes content to temporary file
    /// 3. Syncs temporary file to disk
    /// 4. Renames temporary file to target path
    fn write_file_atomic(&self, path: &Path, content: &str) -> Result<()> {
        if path.exists() && self.backup_existing {
            Self::backup_file(path)?;
        }

        let temp_path = path.with_extension("tmp");
        let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| Error::io(&temp_path, e))?;
        temp_file
            .sync_all()
            .map_err(|e| Error::io(&temp_path, e))?;
        drop(temp_file);

        fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))
    }

    /// Creates a timestamped backup of an existing file.
    fn backup_file(path: &Path) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_nanos();

        let filename = path
            .file_name()
            .ok_or_else(|| Error::config("Invalid file path"))?
            .to_string_lossy();

        let backup_path = path
            .parent()
            .ok_or_else(|| Error::config("Invalid file path"))?
            .join(format!("{filename}.backup.{timestamp}"));

        fs::copy(path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;

        debug!("Created backup: {}", backup_path.display());
        Ok(())
    }

    fn write_summary(&self, output: &ProcessedOutput) -> Result<()> {
        let summary = WriteSummary {
            total_chunks: output.chunk_count(),
            is_chunked: output.is_chunked,
            token_estimate: output.token_estimate,
            output_directory: self.output_dir.display().to_string(),
            chunks: output
                .chunks
                .iter()
                .enumerate()
                .map(|(index, chunk)| ChunkSummary {
                    index: index + 1,
                    parts: chunk.part_count(),
                    files: chunk.paths().count(),
                    estimated_tokens: chunk.estimated_tokens(),
                    filename: self.output_file_name(index),
                })
                .collect(),
            tree: output.tree.clone(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let summary_path = self.output_dir.join(SUMMARY_FILE_NAME);
        let file = fs::File::create(&summary_path).map_err(|e| Error::io(&summary_path, e))?;
        serde_json::to_writer_pretty(file, &summary)?;

        info!("Wrote summary to {}", summary_path.display());
        Ok(())
    }
}
