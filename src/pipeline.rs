use crate::{
    config::Config,
    engine::{Engine, ProcessedOutput, ProjectInput},
    error::Result,
    scanner::{find_gitignore, Scanner},
    writer::Writer,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Text files read from the project directory
    pub scanned_files: usize,

    /// Files present in the output
    pub included_files: usize,

    /// Files removed by ignore patterns
    pub excluded_files: usize,

    /// Total number of chunks created
    pub total_chunks: usize,

    /// Token estimate for tree plus file contents
    pub token_estimate: usize,

    /// True if the output was framed for multi-part delivery
    pub is_chunked: bool,

    /// Total execution time
    pub duration: Duration,

    /// Time spent scanning
    pub scan_duration: Duration,

    /// Time spent filtering, assembling and splitting
    pub process_duration: Duration,

    /// Time spent writing
    pub write_duration: Duration,

    /// Output directory path
    pub output_directory: String,

    /// Number of files written
    pub files_written: usize,
}

impl PipelineStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            Source Flow Summary                        ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Files Scanned:        {:>8}                        ║",
            self.scanned_files
        );
        println!(
            "║   - Included:         {:>8}                        ║",
            self.included_files
        );
        println!(
            "║   - Excluded:         {:>8}                        ║",
            self.excluded_files
        );
        println!("║                                                       ║");
        println!(
            "║ Chunks Created:       {:>8}                        ║",
            self.total_chunks
        );
        println!(
            "║ Estimated Tokens:     {:>8}                        ║",
            self.token_estimate
        );
        println!(
            "║ Multi-part:           {:>8}                        ║",
            if self.is_chunked { "yes" } else { "no" }
        );
        println!("║                                                       ║");
        println!(
            "║ Files Written:        {:>8}                        ║",
            self.files_written
        );
        println!("║ Output Directory:                                     ║");
        println!("║   {}", self.output_directory);
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!(
            "║   - Scanning:         {:>8.2}s                     ║",
            self.scan_duration.as_secs_f64()
        );
        println!(
            "║   - Processing:       {:>8.2}s                     ║",
            self.process_duration.as_secs_f64()
        );
        println!(
            "║   - Writing:          {:>8.2}s                     ║",
            self.write_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Output of the scan and process stages.
struct Processed {
    output: ProcessedOutput,
    scanned_files: usize,
    scan_duration: Duration,
    process_duration: Duration,
}

/// Orchestrates scanning a directory, processing it and writing the chunks.
pub struct Pipeline {
    config: Config,
    scanner: Scanner,
    engine: Engine,
    writer: Writer,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - A custom ignore pattern cannot be compiled
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config)?;
        let engine = Engine::new(&config);
        let writer = Writer::new(&config);

        Ok(Self {
            config,
            scanner,
            engine,
            writer,
        })
    }

    /// Scans and processes the project without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if no files are found or processing fails.
    pub fn build_output(&self) -> Result<ProcessedOutput> {
        self.process().map(|processed| processed.output)
    }

    /// Executes the complete pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Scan**: Reads text files from the root directory
    /// 2. **Process**: Filters, builds the tree and splits into chunks
    /// 3. **Write**: Renders and persists chunks to output files
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails critically.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use source_flow::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .root_dir("./my-app")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(root_dir = %self.config.root_dir.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        info!("Starting pipeline execution");

        let processed = self.process()?;
        let output = &processed.output;

        let write_start = Instant::now();
        let files_written = if self.config.dry_run {
            warn!("Dry run mode enabled - skipping file writes");
            self.print_dry_run_summary(output);
            0
        } else {
            info!("Stage 3/3: Writing output files...");
            // chunk files plus summary.json and session.json
            self.writer.write(output)?.len() + 2
        };
        let write_duration = write_start.elapsed();

        if !self.config.dry_run {
            info!(
                "✓ Wrote {} files in {:.2}s",
                files_written,
                write_duration.as_secs_f64()
            );
        }

        let included_files = output.included_paths().count();
        let total_duration = start_time.elapsed();

        let stats = PipelineStats {
            scanned_files: processed.scanned_files,
            included_files,
            excluded_files: processed.scanned_files.saturating_sub(included_files),
            total_chunks: output.chunk_count(),
            token_estimate: output.token_estimate,
            is_chunked: output.is_chunked,
            duration: total_duration,
            scan_duration: processed.scan_duration,
            process_duration: processed.process_duration,
            write_duration,
            output_directory: self.config.output_dir.display().to_string(),
            files_written,
        };

        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            total_duration.as_secs_f64()
        );

        Ok(stats)
    }

    fn process(&self) -> Result<Processed> {
        info!("Stage 1/3: Scanning project...");
        let scan_start = Instant::now();
        let files = self.scanner.scan()?;
        let scan_duration = scan_start.elapsed();
        let scanned_files = files.len();

        info!(
            "✓ Scanned {} files in {:.2}s",
            scanned_files,
            scan_duration.as_secs_f64()
        );

        let gitignore = if self.config.use_gitignore {
            find_gitignore(&files).map(|f| f.content.clone())
        } else {
            None
        };
        if gitignore.is_some() {
            debug!("Applying .gitignore rules");
        }

        let input = ProjectInput::new(files, self.config.resolved_project_name())
            .custom_ignore_patterns(self.config.custom_ignore_patterns.clone())
            .gitignore_content(gitignore.unwrap_or_default());

        info!("Stage 2/3: Processing files...");
        let process_start = Instant::now();
        let output = self
            .engine
            .process_with_progress(&input, &mut |progress| debug!("{}", progress))?;
        let process_duration = process_start.elapsed();

        info!(
            "✓ Created {} chunk(s) in {:.2}s",
            output.chunk_count(),
            process_duration.as_secs_f64()
        );

        Ok(Processed {
            output,
            scanned_files,
            scan_duration,
            process_duration,
        })
    }

    /// Prints a summary for dry run mode.
    fn print_dry_run_summary(&self, output: &ProcessedOutput) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║                 Dry Run Summary                       ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Total chunks:         {:>8}                        ║",
            output.chunk_count()
        );
        println!(
            "║ Total files:          {:>8}                        ║",
            output.included_paths().count()
        );
        println!(
            "║ Estimated tokens:     {:>8}                        ║",
            output.token_estimate
        );
        println!("║ Output directory:                                     ║");
        println!("║   {}", self.config.output_dir.display());
        println!("║                                                       ║");
        println!("║ ⚠ No files were written (dry run mode)               ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn create_test_config(root: &std::path::Path) -> Config {
        Config::builder()
            .root_dir(root)
            .output_dir(root.join("out"))
            .project_name("demo")
            .build()
            .unwrap()
    }

    #[test]
    fn test_pipeline_basic_execution() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("file1.rs").write_str("fn main() {}").unwrap();
        temp.child("file2.rs").write_str("pub fn test() {}").unwrap();

        let pipeline = Pipeline::new(create_test_config(temp.path())).unwrap();
        let stats = pipeline.run().unwrap();

        assert_eq!(stats.scanned_files, 2);
        assert_eq!(stats.included_files, 2);
        assert_eq!(stats.total_chunks, 1);
        assert!(!stats.is_chunked);
        assert_eq!(stats.files_written, 3);
        assert!(temp.child("out/part_001.md").exists());
        assert!(temp.child("out/session.json").exists());
    }

    #[test]
    fn test_pipeline_dry_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("file.rs").write_str("fn main() {}").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .output_dir(temp.path().join("out"))
            .dry_run(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.files_written, 0);
        assert!(!temp.child("out").exists());
    }

    #[test]
    fn test_pipeline_applies_gitignore() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("secrets.txt\n*.log\n").unwrap();
        temp.child("app.py").write_str("print('hi')").unwrap();
        temp.child("secrets.txt").write_str("hunter2").unwrap();
        temp.child("debug.log").write_str("trace").unwrap();

        let pipeline = Pipeline::new(create_test_config(temp.path())).unwrap();
        let output = pipeline.build_output().unwrap();

        let paths: Vec<&str> = output.included_paths().collect();
        assert_eq!(paths, vec![".gitignore", "app.py"]);
    }

    #[test]
    fn test_pipeline_gitignore_disabled() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("secrets.txt\n").unwrap();
        temp.child("secrets.txt").write_str("hunter2").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .use_gitignore(false)
            .build()
            .unwrap();
        let output = Pipeline::new(config).unwrap().build_output().unwrap();

        assert!(output.included_paths().any(|p| p == "secrets.txt"));
    }

    #[test]
    fn test_pipeline_custom_patterns() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/lib.rs").write_str("pub fn a() {}").unwrap();
        temp.child("src/lib.test.rs").write_str("#[test] fn t() {}").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .ignore_pattern("*.test.rs")
            .build()
            .unwrap();
        let output = Pipeline::new(config).unwrap().build_output().unwrap();

        assert_eq!(output.included_paths().collect::<Vec<_>>(), vec!["src/lib.rs"]);
        assert!(output.tree.starts_with(&format!(
            "{}\n",
            temp.path().canonicalize().unwrap().file_name().unwrap().to_string_lossy()
        )));
    }

    #[test]
    fn test_pipeline_everything_excluded() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("only.log").write_str("x").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .ignore_pattern("*.log")
            .build()
            .unwrap();
        let result = Pipeline::new(config).unwrap().build_output();

        assert!(result.unwrap_err().is_no_files());
    }
}
