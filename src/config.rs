use crate::error::{Error, Result};
use crate::token::CHUNK_CHAR_BUDGET;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_PATTERN: &str = "part_{index:03}.{ext}";
const DEFAULT_MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;
const FALLBACK_PROJECT_NAME: &str = "project";

/// Extension of rendered chunk files.
pub const OUTPUT_EXTENSION: &str = "md";

/// Configuration for the source-flow pipeline.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Project directory to collect files from
    pub root_dir: PathBuf,

    /// Output directory for rendered chunks
    pub output_dir: PathBuf,

    /// Output filename pattern (supports {index}, {index:02}, {index:03}, {ext})
    pub output_pattern: String,

    /// Display name; defaults to the root directory's name
    pub project_name: Option<String>,

    /// User-supplied ignore patterns, already trimmed and comment-free
    pub custom_ignore_patterns: Vec<String>,

    /// Apply the built-in ignore patterns
    pub use_default_ignores: bool,

    /// Apply the project's `.gitignore`, if one is found
    pub use_gitignore: bool,

    /// Character budget per chunk
    pub chunk_char_budget: usize,

    /// Files above this size are not read
    pub max_file_bytes: u64,

    /// Dry run mode (no file writes)
    pub dry_run: bool,

    /// Create backups of existing files
    pub backup_existing: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use source_flow::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir(".")
    ///     .ignore_pattern("*.snap")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Root directory doesn't exist or is not a directory
    /// - Chunk budget is zero
    /// - Output pattern is missing a placeholder
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.exists() {
            return Err(Error::config(format!(
                "Root directory does not exist: {}",
                self.root_dir.display()
            )));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::config(format!(
                "Root path is not a directory: {}",
                self.root_dir.display()
            )));
        }

        if self.chunk_char_budget == 0 {
            return Err(Error::config("chunk_char_budget must be greater than 0"));
        }

        if !self.output_pattern.contains("{index") {
            return Err(Error::invalid_pattern(
                &self.output_pattern,
                "Pattern must contain {index} or {index:03} placeholder",
            ));
        }

        if !self.output_pattern.contains("{ext}") {
            return Err(Error::invalid_pattern(
                &self.output_pattern,
                "Pattern must contain {ext} placeholder",
            ));
        }

        Ok(())
    }

    /// Returns the project name: the configured one, else the root
    /// directory's own name.
    #[must_use]
    pub fn resolved_project_name(&self) -> String {
        if let Some(name) = &self.project_name {
            return name.clone();
        }

        directory_name(&self.root_dir)
            .unwrap_or_else(|| FALLBACK_PROJECT_NAME.to_string())
    }
}

fn directory_name(path: &Path) -> Option<String> {
    let canonical = path.canonicalize().ok()?;
    canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            output_dir: PathBuf::from("out"),
            output_pattern: DEFAULT_OUTPUT_PATTERN.to_string(),
            project_name: None,
            custom_ignore_patterns: Vec::new(),
            use_default_ignores: true,
            use_gitignore: true,
            chunk_char_budget: CHUNK_CHAR_BUDGET,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            dry_run: false,
            backup_existing: true,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    output_pattern: Option<String>,
    project_name: Option<String>,
    custom_ignore_patterns: Vec<String>,
    use_default_ignores: Option<bool>,
    use_gitignore: Option<bool>,
    chunk_char_budget: Option<usize>,
    max_file_bytes: Option<u64>,
    dry_run: bool,
    backup_existing: Option<bool>,
}

impl ConfigBuilder {
    /// Sets the project directory.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the output directory for generated files.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the output filename pattern.
    ///
    /// Pattern must contain `{index}` and `{ext}` placeholders.
    #[must_use]
    pub fn output_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.output_pattern = Some(pattern.into());
        self
    }

    /// Sets the project display name.
    #[must_use]
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Adds one custom ignore pattern.
    #[must_use]
    pub fn ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.custom_ignore_patterns.push(pattern.into());
        self
    }

    /// Adds several custom ignore patterns.
    #[must_use]
    pub fn ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_ignore_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Enables or disables the built-in ignore patterns.
    #[must_use]
    pub fn use_default_ignores(mut self, enabled: bool) -> Self {
        self.use_default_ignores = Some(enabled);
        self
    }

    /// Enables or disables `.gitignore` discovery.
    #[must_use]
    pub fn use_gitignore(mut self, enabled: bool) -> Self {
        self.use_gitignore = Some(enabled);
        self
    }

    /// Sets the per-chunk character budget.
    #[must_use]
    pub fn chunk_char_budget(mut self, chars: usize) -> Self {
        self.chunk_char_budget = Some(chars);
        self
    }

    /// Sets the largest file size that will be read.
    #[must_use]
    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = Some(bytes);
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables or disables backup creation.
    #[must_use]
    pub fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = Some(enabled);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("out")),
            output_pattern: self
                .output_pattern
                .unwrap_or_else(|| DEFAULT_OUTPUT_PATTERN.to_string()),
            project_name: self.project_name,
            custom_ignore_patterns: self.custom_ignore_patterns,
            use_default_ignores: self.use_default_ignores.unwrap_or(true),
            use_gitignore: self.use_gitignore.unwrap_or(true),
            chunk_char_budget: self.chunk_char_budget.unwrap_or(CHUNK_CHAR_BUDGET),
            max_file_bytes: self.max_file_bytes.unwrap_or(DEFAULT_MAX_FILE_BYTES),
            dry_run: self.dry_run,
            backup_existing: self.backup_existing.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder().root_dir(temp.path()).build().unwrap();

        assert_eq!(config.chunk_char_budget, 60_000);
        assert!(config.use_default_ignores);
        assert!(config.use_gitignore);
        assert!(config.custom_ignore_patterns.is_empty());
    }

    #[test]
    fn test_invalid_root_dir() {
        let result = Config::builder()
            .root_dir("/nonexistent/path/that/should/not/exist")
            .build();

        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("file.txt");
        file.write_str("x").unwrap();

        assert!(Config::builder().root_dir(file.path()).build().is_err());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();

        let result = Config::builder()
            .root_dir(temp.path())
            .chunk_char_budget(0)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_pattern() {
        let temp = assert_fs::TempDir::new().unwrap();

        let result = Config::builder()
            .root_dir(temp.path())
            .output_pattern("invalid_pattern")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_ignore_patterns_accumulate() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .root_dir(temp.path())
            .ignore_pattern("*.snap")
            .ignore_patterns(["coverage/", "fixtures"])
            .build()
            .unwrap();

        assert_eq!(
            config.custom_ignore_patterns,
            vec!["*.snap", "coverage/", "fixtures"]
        );
    }

    #[test]
    fn test_project_name_defaults_to_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let project = temp.child("my-app");
        project.create_dir_all().unwrap();

        let config = Config::builder().root_dir(project.path()).build().unwrap();
        assert_eq!(config.resolved_project_name(), "my-app");

        let named = Config::builder()
            .root_dir(project.path())
            .project_name("Renamed")
            .build()
            .unwrap();
        assert_eq!(named.resolved_project_name(), "Renamed");
    }
}
