//! Ordered content parts built from filtered files.

use crate::file::{FileRecord, PLAINTEXT};
use crate::token::{char_len, estimate_tokens};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Path label carried by the tree part.
pub const PROJECT_STRUCTURE_LABEL: &str = "Project Structure";

/// One unit of output: narrative text or one file's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Narrative or framing text
    Markdown {
        /// Text as written
        content: String,
    },

    /// Body of one file, or the rendered tree
    Code {
        /// Raw text
        content: String,
        /// Display language tag
        language: String,
        /// Path label shown above the body
        path: String,
    },
}

impl ContentPart {
    /// Creates a markdown part.
    #[must_use]
    pub fn markdown(content: impl Into<String>) -> Self {
        Self::Markdown {
            content: content.into(),
        }
    }

    /// Creates a code part.
    #[must_use]
    pub fn code(
        content: impl Into<String>,
        language: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::Code {
            content: content.into(),
            language: language.into(),
            path: path.into(),
        }
    }

    /// Returns the text content.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Markdown { content } | Self::Code { content, .. } => content,
        }
    }

    /// Returns the path label, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Markdown { .. } => None,
            Self::Code { path, .. } => Some(path.as_str()),
        }
    }

    /// Returns the language tag, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Markdown { .. } => None,
            Self::Code { language, .. } => Some(language.as_str()),
        }
    }

    /// Returns true for markdown parts.
    #[must_use]
    pub const fn is_markdown(&self) -> bool {
        matches!(self, Self::Markdown { .. })
    }
}

/// Assembled content ready for chunking.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Header, tree and one part per file, in order
    pub parts: Vec<ContentPart>,

    /// `ceil((tree chars + file chars) / 4)`
    pub token_estimate: usize,

    /// Tree chars plus file chars
    pub total_chars: usize,
}

/// Introductory text opening the assembled content.
#[must_use]
pub fn header_text(project_name: &str) -> String {
    format!(
        "# Project Context: {project_name}\n\nThis context was generated by Source Flow. \
         Below is the project structure followed by the contents of each file."
    )
}

/// Turns filtered files into ordered content parts and estimates their size.
///
/// `files` must already be sorted by path. Content is never truncated or
/// re-encoded.
#[must_use]
pub fn assemble(files: &[FileRecord], project_name: &str, tree: &str) -> Assembly {
    let mut parts = Vec::with_capacity(files.len() + 2);
    parts.push(ContentPart::markdown(header_text(project_name)));
    parts.push(ContentPart::code(tree, PLAINTEXT, PROJECT_STRUCTURE_LABEL));

    let mut total_chars = char_len(tree);
    for file in files {
        total_chars += file.char_len();
        parts.push(ContentPart::code(
            file.content.as_str(),
            file.language(),
            file.path.as_str(),
        ));
    }

    let token_estimate = estimate_tokens(total_chars);
    debug!(
        "Assembled {} parts, {} chars (~{} tokens)",
        parts.len(),
        total_chars,
        token_estimate
    );

    Assembly {
        parts,
        token_estimate,
        total_chars,
    }
}
