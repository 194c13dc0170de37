//! File records, binary detection and language tags.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Extensions (with the leading dot) that are never treated as text.
static BINARY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        ".png", ".jpg", ".jpeg", ".gif", ".ico", ".svg", ".webp", ".pdf", ".zip", ".tar.gz",
        ".rar", ".7z", ".mp3", ".mp4", ".mov", ".avi", ".woff", ".woff2", ".eot", ".ttf", ".otf",
        ".exe", ".dll", ".so", ".a", ".lib", ".dmg", ".app",
    ]
    .into_iter()
    .collect()
});

static LANGUAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("js", "javascript"),
        ("ts", "typescript"),
        ("jsx", "jsx"),
        ("tsx", "tsx"),
        ("py", "python"),
        ("html", "html"),
        ("css", "css"),
        ("json", "json"),
        ("md", "markdown"),
        ("sh", "bash"),
        ("yml", "yaml"),
    ]
    .into_iter()
    .collect()
});

/// Language tag used for anything the lookup table does not know.
pub const PLAINTEXT: &str = "plaintext";

/// One project file: a `/`-separated relative path and its decoded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Relative path without a leading slash
    pub path: String,

    /// Decoded text content
    pub content: String,
}

impl FileRecord {
    /// Creates a new file record.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Returns the display language for this file.
    #[must_use]
    pub fn language(&self) -> &'static str {
        language_for(&self.path)
    }

    /// Returns the number of characters in the content.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Maps a path to a display language through its extension.
///
/// The extension is whatever follows the last `.` of the whole path,
/// lowercased. Unknown extensions map to [`PLAINTEXT`].
#[must_use]
pub fn language_for(path: &str) -> &'static str {
    let extension = path.rsplit('.').next().unwrap_or_default().to_lowercase();
    LANGUAGES.get(extension.as_str()).copied().unwrap_or(PLAINTEXT)
}

/// Returns the extension of a path including the dot, or `""` without one.
///
/// Takes everything after the last `.` in the full path, so `a.b/c` yields `.b/c`.
#[must_use]
pub fn path_extension(path: &str) -> &str {
    path.rfind('.').map_or("", |idx| &path[idx..])
}

/// Checks the path's extension against the binary deny-list.
#[must_use]
pub fn has_binary_extension(path: &str) -> bool {
    BINARY_EXTENSIONS.contains(path_extension(path))
}

/// Determines if a file is likely binary by looking for NUL bytes in its head.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub(crate) fn is_likely_binary(path: &Path) -> Result<bool> {
    const BUFFER_SIZE: usize = 8192;

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buffer = [0u8; BUFFER_SIZE];

    let bytes_read = reader.read(&mut buffer).map_err(|e| Error::io(path, e))?;

    Ok(memchr::memchr(0, &buffer[..bytes_read]).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_language_table() {
        assert_eq!(language_for("src/index.js"), "javascript");
        assert_eq!(language_for("src/App.tsx"), "tsx");
        assert_eq!(language_for("main.py"), "python");
        assert_eq!(language_for("README.md"), "markdown");
        assert_eq!(language_for("scripts/run.sh"), "bash");
        assert_eq!(language_for(".github/ci.yml"), "yaml");
        assert_eq!(language_for("docs/NOTES.MD"), "markdown");
    }

    #[test]
    fn test_language_unknown_is_plaintext() {
        assert_eq!(language_for("src/main.rs"), PLAINTEXT);
        assert_eq!(language_for("Makefile"), PLAINTEXT);
        assert_eq!(language_for("config.yaml"), PLAINTEXT);
    }

    #[test]
    fn test_path_extension() {
        assert_eq!(path_extension("logo.png"), ".png");
        assert_eq!(path_extension("assets/img/logo.PNG"), ".PNG");
        assert_eq!(path_extension("LICENSE"), "");
        assert_eq!(path_extension("v1.2/LICENSE"), ".2/LICENSE");
    }

    #[test]
    fn test_has_binary_extension() {
        assert!(has_binary_extension("app.exe"));
        assert!(has_binary_extension("public/favicon.ico"));
        assert!(has_binary_extension("fonts/inter.woff2"));
        assert!(!has_binary_extension("src/code.rs"));
        assert!(!has_binary_extension("LICENSE"));
        // only the last extension is compared
        assert!(!has_binary_extension("release.tar.gz"));
    }

    #[test]
    fn test_file_record_accessors() {
        let record = FileRecord::new("src/index.js", "héllo");
        assert_eq!(record.language(), "javascript");
        assert_eq!(record.char_len(), 5);
    }

    #[test]
    fn test_is_likely_binary_text_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("test.txt");
        file.write_str("Hello, world!").unwrap();

        assert!(!is_likely_binary(file.path()).unwrap());
    }

    #[test]
    fn test_is_likely_binary_binary_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("test.bin");
        file.write_binary(&[0u8; 100]).unwrap();

        assert!(is_likely_binary(file.path()).unwrap());
    }

    #[test]
    fn test_is_likely_binary_empty_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("empty.txt");
        file.touch().unwrap();

        assert!(!is_likely_binary(file.path()).unwrap());
    }
}
