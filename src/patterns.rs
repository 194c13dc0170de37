//! Ignore-pattern matching.
//!
//! Implements a deliberately small subset of `.gitignore` syntax. A pattern is
//! one of three kinds:
//!
//! - `name/` matches when any path segment equals `name`
//! - a pattern containing `*` matches the file name or the whole path, with
//!   `*` standing for any run of characters (including `/`)
//! - anything else matches the file name or any path segment exactly
//!
//! Negation, anchoring and `**` are not supported. Paths whose extension is
//! on the binary deny-list are always ignored.

use crate::error::{Error, Result};
use crate::file::has_binary_extension;
use regex::Regex;

/// Patterns applied before any user or `.gitignore` pattern.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Version control & environment
    ".git/",
    ".svn/",
    ".hg/",
    ".env",
    // IDE & editor config
    ".vscode/",
    ".idea/",
    // Dependencies & package managers
    "node_modules/",
    "vendor/",
    "Pods/",
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    // Python
    "venv/",
    ".venv/",
    "__pycache__/",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    // Build output
    "build/",
    "dist/",
    "target/",
    "out/",
    // OS cruft
    ".DS_Store",
    "Thumbs.db",
    // Logs
    "*.log",
    // Boilerplate configs
    "tsconfig.json",
    "tsconfig.app.json",
    "tsconfig.node.json",
    "vite-env.d.ts",
    "eslint.config.js",
    "postcss.config.js",
];

/// A single compiled ignore pattern.
#[derive(Debug, Clone)]
pub enum IgnorePattern {
    /// `name/`: matches any path segment equal to `name`.
    Directory(String),

    /// Pattern containing `*`, anchored at both ends.
    Wildcard {
        /// Pattern as written
        source: String,
        /// Compiled form
        regex: Regex,
    },

    /// Exact file or directory name.
    Literal(String),
}

impl IgnorePattern {
    /// Classifies and compiles a raw pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a wildcard pattern cannot be compiled.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(name) = raw.strip_suffix('/') {
            return Ok(Self::Directory(name.to_string()));
        }

        if raw.contains('*') {
            let escaped: Vec<String> = raw.split('*').map(regex::escape).collect();
            let expression = format!("^{}$", escaped.join(".*"));
            let regex = Regex::new(&expression)
                .map_err(|e| Error::invalid_pattern(raw, e.to_string()))?;

            return Ok(Self::Wildcard {
                source: raw.to_string(),
                regex,
            });
        }

        Ok(Self::Literal(raw.to_string()))
    }

    /// Returns the pattern as it was written.
    #[must_use]
    pub fn as_str(&self) -> String {
        match self {
            Self::Directory(name) => format!("{name}/"),
            Self::Wildcard { source, .. } => source.clone(),
            Self::Literal(name) => name.clone(),
        }
    }

    /// Tests the pattern against a pre-split path.
    fn matches(&self, path: &str, segments: &[&str]) -> bool {
        let filename = segments.last().copied().unwrap_or(path);

        match self {
            Self::Directory(name) => segments.iter().any(|segment| *segment == name.as_str()),
            Self::Wildcard { regex, .. } => regex.is_match(filename) || regex.is_match(path),
            Self::Literal(name) => {
                filename == name.as_str() || segments.iter().any(|segment| *segment == name.as_str())
            }
        }
    }

    /// Returns true if a directory with this name is always excluded, along
    /// with everything beneath it.
    fn excludes_directory_name(&self, name: &str) -> bool {
        match self {
            Self::Directory(pattern) | Self::Literal(pattern) => pattern == name,
            Self::Wildcard { .. } => false,
        }
    }
}

/// An ordered, merged set of ignore patterns.
///
/// Built fresh for every processing run; holds no shared state.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreMatcher {
    /// Compiles patterns in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern fails to compile.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| IgnorePattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Merges the three pattern sources: built-in defaults, caller-supplied
    /// patterns, then the usable lines of a `.gitignore` file.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern fails to compile.
    pub fn from_sources<S: AsRef<str>>(
        defaults: &[S],
        custom: &[S],
        gitignore_content: &str,
    ) -> Result<Self> {
        let gitignore = parse_pattern_lines(gitignore_content);

        let mut merged: Vec<&str> = Vec::with_capacity(defaults.len() + custom.len() + gitignore.len());
        merged.extend(defaults.iter().map(|p| p.as_ref()));
        merged.extend(custom.iter().map(|p| p.as_ref()));
        merged.extend(gitignore.iter().map(String::as_str));

        Self::new(merged)
    }

    /// Returns true if the path is excluded by any pattern or by the binary
    /// extension deny-list.
    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').collect();

        self.patterns.iter().any(|p| p.matches(path, &segments)) || has_binary_extension(path)
    }

    /// Returns true if every file under a directory with this name would be
    /// ignored, which lets a directory walker skip it outright.
    #[must_use]
    pub fn prunes_directory(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.excludes_directory_name(name))
    }

    /// Returns the number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if there are no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterates over the compiled patterns in order.
    pub fn iter(&self) -> impl Iterator<Item = &IgnorePattern> {
        self.patterns.iter()
    }
}

/// Decides whether `path` is excluded by `patterns`.
///
/// One-shot form of [`IgnoreMatcher::is_ignored`]; compiles the patterns on
/// every call.
///
/// # Errors
///
/// Returns an error if any pattern fails to compile.
pub fn is_ignored<S: AsRef<str>>(path: &str, patterns: &[S]) -> Result<bool> {
    Ok(IgnoreMatcher::new(patterns)?.is_ignored(path))
}

/// Splits pattern text into usable lines: trimmed, without blanks or `#` comments.
#[must_use]
pub fn parse_pattern_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> IgnoreMatcher {
        IgnoreMatcher::new(DEFAULT_IGNORE_PATTERNS).unwrap()
    }

    #[test]
    fn test_directory_pattern_matches_any_segment() {
        let matcher = IgnoreMatcher::new(["node_modules/"]).unwrap();

        assert!(matcher.is_ignored("node_modules/react/index.js"));
        assert!(matcher.is_ignored("packages/web/node_modules/lodash/lodash.js"));
        assert!(!matcher.is_ignored("src/node_modules.js"));
    }

    #[test]
    fn test_directory_pattern_matches_file_with_same_name() {
        // segment comparison includes the last one
        let matcher = IgnoreMatcher::new(["build/"]).unwrap();
        assert!(matcher.is_ignored("scripts/build"));
    }

    #[test]
    fn test_wildcard_matches_filename() {
        let matcher = IgnoreMatcher::new(["*.log"]).unwrap();

        assert!(matcher.is_ignored("data.log"));
        assert!(matcher.is_ignored("logs/2024/app.log"));
        assert!(!matcher.is_ignored("src/logger.js"));
        assert!(!matcher.is_ignored("app.log.js"));
    }

    #[test]
    fn test_wildcard_matches_full_path() {
        let matcher = IgnoreMatcher::new(["docs/*"]).unwrap();

        assert!(matcher.is_ignored("docs/guide/intro.md"));
        assert!(!matcher.is_ignored("src/docs.md"));
    }

    #[test]
    fn test_wildcard_escapes_metacharacters() {
        let matcher = IgnoreMatcher::new(["file(1)+?.[tmp]*"]).unwrap();

        assert!(matcher.is_ignored("file(1)+?.[tmp].bak"));
        assert!(!matcher.is_ignored("file1.tmp"));
    }

    #[test]
    fn test_literal_matches_filename_or_segment() {
        let matcher = IgnoreMatcher::new([".DS_Store", "fixtures"]).unwrap();

        assert!(matcher.is_ignored(".DS_Store"));
        assert!(matcher.is_ignored("assets/.DS_Store"));
        assert!(matcher.is_ignored("tests/fixtures/sample.json"));
        assert!(!matcher.is_ignored("tests/fixtures.rs"));
    }

    #[test]
    fn test_binary_extensions_always_ignored() {
        let matcher = IgnoreMatcher::default();

        assert!(matcher.is_empty());
        assert!(matcher.is_ignored("public/logo.png"));
        assert!(matcher.is_ignored("bin/tool.exe"));
        assert!(!matcher.is_ignored("src/main.rs"));
    }

    #[test]
    fn test_default_patterns() {
        let matcher = defaults();

        assert!(matcher.is_ignored(".env"));
        assert!(matcher.is_ignored(".git/HEAD"));
        assert!(matcher.is_ignored("node_modules/react/index.js"));
        assert!(matcher.is_ignored("pkg/__pycache__/mod.cpython-311.pyc"));
        assert!(matcher.is_ignored("yarn.lock"));
        assert!(matcher.is_ignored("web/tsconfig.json"));
        assert!(matcher.is_ignored("target/debug/app"));
        assert!(!matcher.is_ignored("package.json"));
        assert!(!matcher.is_ignored("src/app.js"));
        assert!(!matcher.is_ignored(".gitignore"));
        assert!(!matcher.is_ignored(".env.example"));
    }

    #[test]
    fn test_from_sources_merges_gitignore() {
        let matcher = IgnoreMatcher::from_sources(
            DEFAULT_IGNORE_PATTERNS,
            &["*.snap"],
            "# build output\ncoverage/\n\n  secrets.txt  \n",
        )
        .unwrap();

        assert_eq!(matcher.len(), DEFAULT_IGNORE_PATTERNS.len() + 3);
        assert!(matcher.is_ignored("tests/__snapshots__/ui.snap"));
        assert!(matcher.is_ignored("coverage/lcov.info"));
        assert!(matcher.is_ignored("config/secrets.txt"));
        assert!(!matcher.is_ignored("src/index.ts"));
    }

    #[test]
    fn test_is_ignored_is_pure() {
        let patterns = ["*.log", "dist/"];

        let first = is_ignored("dist/bundle.js", &patterns).unwrap();
        let second = is_ignored("dist/bundle.js", &patterns).unwrap();

        assert!(first);
        assert_eq!(first, second);
        assert!(!is_ignored("index.js", &patterns).unwrap());
    }

    #[test]
    fn test_prunes_directory() {
        let matcher = IgnoreMatcher::new(["node_modules/", "fixtures", "*.log"]).unwrap();

        assert!(matcher.prunes_directory("node_modules"));
        assert!(matcher.prunes_directory("fixtures"));
        assert!(!matcher.prunes_directory("logs.log"));
        assert!(!matcher.prunes_directory("src"));
    }

    #[test]
    fn test_pattern_round_trips_source_text() {
        for raw in ["dist/", "*.log", ".env"] {
            assert_eq!(IgnorePattern::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_parse_pattern_lines() {
        let lines = parse_pattern_lines("# comment\n\n*.log\r\n  dist/  \n#another\ncoverage");
        assert_eq!(lines, vec!["*.log", "dist/", "coverage"]);
    }
}
