use crate::{
    config::Config,
    error::{Error, Result},
    file::{is_likely_binary, FileRecord},
    patterns::{IgnoreMatcher, DEFAULT_IGNORE_PATTERNS},
};
use ignore::{DirEntry, WalkBuilder, WalkState};
use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{debug, trace, warn};

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone)]
pub(crate) struct ScanStats {
    /// Files seen by the walker
    pub total_files: usize,

    /// Files returned with content
    pub text_files: usize,

    /// Files dropped as binary, undecodable, empty or too large
    pub skipped_files: usize,

    /// Read errors encountered
    pub errors: usize,
}

/// Outcome of reading one file.
enum ReadOutcome {
    Text(FileRecord),
    Skipped,
}

/// Collects project files into memory as decoded text.
///
/// Applies no ignore rules of its own apart from pruning directories the
/// configured patterns would exclude wholesale; exclusion decisions belong
/// to the engine.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    max_file_bytes: u64,
    prune: Arc<IgnoreMatcher>,
    output_dir: Option<PathBuf>,
}

impl Scanner {
    /// Creates a new scanner from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a custom pattern cannot be compiled.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let defaults: &[&str] = if config.use_default_ignores {
            DEFAULT_IGNORE_PATTERNS
        } else {
            &[]
        };
        let prune = IgnoreMatcher::new(
            defaults
                .iter()
                .copied()
                .chain(config.custom_ignore_patterns.iter().map(String::as_str)),
        )?;

        Ok(Self {
            root_dir: config.root_dir.clone(),
            max_file_bytes: config.max_file_bytes,
            prune: Arc::new(prune),
            // only resolvable once it exists; a missing dir holds nothing to skip
            output_dir: config.output_dir.canonicalize().ok(),
        })
    }

    /// Reads every text file under the root directory, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFiles`] if no file with text content is found.
    pub(crate) fn scan(&self) -> Result<Vec<FileRecord>> {
        let (files, stats) = self.collect();

        debug!(
            "Scan complete: {} total, {} text, {} skipped, {} errors",
            stats.total_files, stats.text_files, stats.skipped_files, stats.errors
        );

        if stats.errors > 0 {
            warn!(
                "Encountered {} errors during scanning (non-fatal)",
                stats.errors
            );
        }

        if files.is_empty() {
            return Err(Error::no_files(&self.root_dir));
        }

        Ok(files)
    }

    fn collect(&self) -> (Vec<FileRecord>, ScanStats) {
        let files = Arc::new(Mutex::new(Vec::new()));
        let stats = Arc::new(Mutex::new(ScanStats::default()));

        debug!("Starting parallel scan of {}", self.root_dir.display());

        let prune = Arc::clone(&self.prune);
        let output_dir = self.output_dir.clone();
        let walker = WalkBuilder::new(&self.root_dir)
            .standard_filters(false)
            .follow_links(false)
            .skip_stdout(true)
            .threads(num_cpus::get())
            .filter_entry(move |entry| !is_pruned(entry, &prune, output_dir.as_deref()))
            .build_parallel();

        walker.run(|| {
            let files = Arc::clone(&files);
            let stats = Arc::clone(&stats);
            let root = self.root_dir.clone();
            let max_file_bytes = self.max_file_bytes;

            Box::new(move |result| {
                match result {
                    Ok(entry) if entry.file_type().is_some_and(|ft| ft.is_file()) => {
                        let outcome = Self::process_entry(&entry, &root, max_file_bytes);
                        let mut stats = stats.lock().unwrap_or_else(PoisonError::into_inner);
                        stats.total_files += 1;

                        match outcome {
                            Ok(ReadOutcome::Text(record)) => {
                                stats.text_files += 1;
                                files
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .push(record);
                            }
                            Ok(ReadOutcome::Skipped) => stats.skipped_files += 1,
                            Err(e) => {
                                warn!("Failed to read {}: {}", entry.path().display(), e);
                                stats.errors += 1;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Walk error: {}", e);
                        stats.lock().unwrap_or_else(PoisonError::into_inner).errors += 1;
                    }
                    _ => {}
                }
                WalkState::Continue
            })
        });

        let mut files = take(files);
        let stats = take(stats);

        files.sort_by(|a, b| a.path.cmp(&b.path));
        (files, stats)
    }

    /// Reads a single file; binary, undecodable, oversized and empty files are skipped.
    fn process_entry(entry: &DirEntry, root: &Path, max_file_bytes: u64) -> Result<ReadOutcome> {
        let path = entry.path();
        let relative_path = relative_posix_path(path, root);

        trace!("Processing file: {}", relative_path);

        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        if metadata.len() > max_file_bytes {
            warn!(
                "Skipping large file (>{} bytes): {}",
                metadata.len(),
                relative_path
            );
            return Ok(ReadOutcome::Skipped);
        }

        if is_likely_binary(path)? {
            trace!("Skipping binary file: {}", relative_path);
            return Ok(ReadOutcome::Skipped);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                debug!("{}", Error::invalid_utf8(path));
                return Ok(ReadOutcome::Skipped);
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        if content.is_empty() {
            return Ok(ReadOutcome::Skipped);
        }

        Ok(ReadOutcome::Text(FileRecord::new(relative_path, content)))
    }
}

fn is_pruned(entry: &DirEntry, prune: &IgnoreMatcher, output_dir: Option<&Path>) -> bool {
    // never prune the root itself
    if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    let pruned = prune.prunes_directory(&name) || is_output_dir(entry, output_dir);
    if pruned {
        trace!("Pruning directory: {}", entry.path().display());
    }
    pruned
}

fn is_output_dir(entry: &DirEntry, output_dir: Option<&Path>) -> bool {
    let Some(output_dir) = output_dir else {
        return false;
    };

    output_dir.file_name() == Some(entry.file_name())
        && entry
            .path()
            .canonicalize()
            .is_ok_and(|path| path == output_dir)
}

fn take<T: Default>(shared: Arc<Mutex<T>>) -> T {
    match Arc::try_unwrap(shared) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
        Err(arc) => std::mem::take(&mut *arc.lock().unwrap_or_else(PoisonError::into_inner)),
    }
}

/// Converts a path under `root` into a `/`-separated relative path.
pub(crate) fn relative_posix_path(path: &Path, root: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Finds the `.gitignore` to apply: the shallowest file whose path ends in
/// `.gitignore`, ties broken by path order.
#[must_use]
pub fn find_gitignore(files: &[FileRecord]) -> Option<&FileRecord> {
    files
        .iter()
        .filter(|f| f.path.ends_with(".gitignore"))
        .min_by(|a, b| {
            let depth = |f: &FileRecord| f.path.matches('/').count();
            depth(a).cmp(&depth(b)).then_with(|| a.path.cmp(&b.path))
        })
}
