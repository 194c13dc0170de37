//! Budget-driven splitting of content parts into framed chunks.

use crate::assembler::ContentPart;
use crate::token::{char_len, estimate_text, exceeds_budget};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Size allowance added to every content part for its rendered framing.
pub const PART_OVERHEAD_CHARS: usize = 50;

const UNKNOWN_TOTAL: &str = "multiple";

/// One ordered slice of the output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chunk {
    /// Parts in output order
    pub parts: Vec<ContentPart>,
}

impl Chunk {
    /// Creates a chunk from parts.
    #[must_use]
    pub fn new(parts: Vec<ContentPart>) -> Self {
        Self { parts }
    }

    /// Returns the number of parts in this chunk.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if this chunk holds no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Iterates over the file paths carried by code parts.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(ContentPart::path)
    }

    /// Estimates tokens for all part contents in this chunk.
    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        self.parts.iter().map(|p| estimate_text(p.content())).sum()
    }
}

/// Result of splitting assembled content.
#[derive(Debug, Clone)]
pub struct Split {
    /// One or more chunks
    pub chunks: Vec<Chunk>,

    /// True if the content exceeded the budget and was framed for multi-part delivery
    pub is_chunked: bool,
}

/// Opening text for a chunk; `total` is unknown until all chunks exist.
#[must_use]
pub fn intro_text(project_name: &str, part: usize, total: Option<usize>) -> String {
    let total = total.map_or_else(|| UNKNOWN_TOTAL.to_string(), |t| t.to_string());
    format!(
        "I am providing the context for a project named '{project_name}'. \
         I will send it in {total} parts. \
         Acknowledge each part by saying 'RECEIVED PART {part} of {total}' \
         and wait for the final part before summarizing.\n\nHere is Part {part}:\n\n"
    )
}

/// Closing text appended to the last chunk.
#[must_use]
pub fn completion_text(total: usize) -> String {
    format!(
        "\n\nALL CONTEXT PROVIDED. Please confirm you have received all {total} parts \
         and are ready for my questions."
    )
}

/// Partitions assembled content into chunks under a character budget.
#[derive(Debug, Clone)]
pub struct Splitter {
    project_name: String,
    char_budget: usize,
}

impl Splitter {
    /// Creates a splitter for one project.
    #[must_use]
    pub fn new(project_name: impl Into<String>, char_budget: usize) -> Self {
        Self {
            project_name: project_name.into(),
            char_budget,
        }
    }

    /// Returns true if content with this estimate must be chunked.
    #[must_use]
    pub const fn needs_chunking(&self, token_estimate: usize) -> bool {
        exceeds_budget(token_estimate, self.char_budget)
    }

    /// Splits parts into chunks.
    ///
    /// Small content comes back as a single unframed chunk. Otherwise every
    /// chunk opens with a numbered intro, parts keep their order, and the
    /// last chunk ends with a completion marker. A part larger than the
    /// budget still gets a chunk of its own.
    #[must_use]
    pub fn split(&self, parts: Vec<ContentPart>, token_estimate: usize) -> Split {
        if !self.needs_chunking(token_estimate) {
            debug!("Content fits in one chunk (~{} tokens)", token_estimate);
            return Split {
                chunks: vec![Chunk::new(parts)],
                is_chunked: false,
            };
        }

        debug!(
            "Content is large (~{} tokens), splitting into chunks",
            token_estimate
        );

        let mut chunks = Vec::new();
        let mut builder = ChunkBuilder::new(self.char_budget);
        builder.push_intro(intro_text(&self.project_name, 1, None));

        for part in parts {
            let size = part_size(&part);

            if !builder.can_fit(size) && builder.has_content() {
                let full = std::mem::replace(&mut builder, ChunkBuilder::new(self.char_budget));
                chunks.push(full.build());
                builder.push_intro(intro_text(&self.project_name, chunks.len() + 1, None));
            }

            builder.push(part, size);
        }
        chunks.push(builder.build());

        self.finalize(&mut chunks);
        debug!("Created {} chunks", chunks.len());

        Split {
            chunks,
            is_chunked: true,
        }
    }

    /// Fills the real total into every intro and appends the completion marker.
    fn finalize(&self, chunks: &mut [Chunk]) {
        let total = chunks.len();

        for (idx, chunk) in chunks.iter_mut().enumerate() {
            if let Some(first) = chunk.parts.first_mut() {
                if first.is_markdown() {
                    *first = ContentPart::markdown(intro_text(
                        &self.project_name,
                        idx + 1,
                        Some(total),
                    ));
                }
            }
            trace!("Chunk {}/{} holds {} parts", idx + 1, total, chunk.part_count());
        }

        if let Some(last) = chunks.last_mut() {
            last.parts.push(ContentPart::markdown(completion_text(total)));
        }
    }
}

/// Budget contribution of a part: content, path label and fixed overhead.
fn part_size(part: &ContentPart) -> usize {
    char_len(part.content()) + part.path().map_or(0, char_len) + PART_OVERHEAD_CHARS
}

/// Builder for constructing chunks incrementally.
struct ChunkBuilder {
    parts: Vec<ContentPart>,
    current_size: usize,
    budget: usize,
}

impl ChunkBuilder {
    fn new(budget: usize) -> Self {
        Self {
            parts: Vec::new(),
            current_size: 0,
            budget,
        }
    }

    /// Adds the intro; it counts by its text length alone.
    fn push_intro(&mut self, text: String) {
        self.current_size += char_len(&text);
        self.parts.push(ContentPart::markdown(text));
    }

    fn push(&mut self, part: ContentPart, size: usize) {
        self.current_size += size;
        self.parts.push(part);
    }

    fn can_fit(&self, size: usize) -> bool {
        self.current_size + size <= self.budget
    }

    /// True once the chunk holds anything beyond its intro.
    fn has_content(&self) -> bool {
        self.parts.len() > 1
    }

    fn build(self) -> Chunk {
        Chunk::new(self.parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::CHUNK_CHAR_BUDGET;

    fn code(path: &str, len: usize) -> ContentPart {
        ContentPart::code("x".repeat(len), "plaintext", path)
    }

    #[test]
    fn test_small_content_single_unframed_chunk() {
        let splitter = Splitter::new("demo", CHUNK_CHAR_BUDGET);
        let parts = vec![ContentPart::markdown("header"), code("a.txt", 10)];

        let split = splitter.split(parts.clone(), 3);

        assert!(!split.is_chunked);
        assert_eq!(split.chunks.len(), 1);
        assert_eq!(split.chunks[0].parts, parts);
    }

    #[test]
    fn test_large_content_is_framed() {
        let splitter = Splitter::new("demo", 1_000);
        let parts = vec![
            ContentPart::markdown("header"),
            code("a.txt", 400),
            code("b.txt", 400),
            code("c.txt", 400),
        ];

        let split = splitter.split(parts, 400);

        assert!(split.is_chunked);
        assert_eq!(split.chunks.len(), 3);

        for (idx, chunk) in split.chunks.iter().enumerate() {
            let intro = chunk.parts[0].content();
            assert!(intro.contains(&format!("RECEIVED PART {} of 3", idx + 1)));
            assert!(intro.contains("I will send it in 3 parts."));
            assert!(!intro.contains("multiple"));
        }

        let last = split.chunks.last().unwrap().parts.last().unwrap();
        assert!(last.content().contains("ALL CONTEXT PROVIDED"));
        assert!(last.content().contains("all 3 parts"));
    }

    #[test]
    fn test_only_last_chunk_has_completion_marker() {
        let splitter = Splitter::new("demo", 1_000);
        let parts = vec![code("a.txt", 600), code("b.txt", 600)];

        let split = splitter.split(parts, 300);

        assert_eq!(split.chunks.len(), 2);
        let marker = |c: &Chunk| c.parts.iter().any(|p| p.content().contains("ALL CONTEXT PROVIDED"));
        assert!(!marker(&split.chunks[0]));
        assert!(marker(&split.chunks[1]));
    }

    #[test]
    fn test_exact_fit_stays_in_chunk() {
        let budget = 1_000;
        let splitter = Splitter::new("demo", budget);
        let intro = char_len(&intro_text("demo", 1, None));
        // each part costs content + path (5) + overhead
        let first = 100;
        let remaining = budget - intro - (first + 5 + PART_OVERHEAD_CHARS);
        let exact = remaining - 5 - PART_OVERHEAD_CHARS;

        let fits = splitter.split(vec![code("a.txt", first), code("b.txt", exact)], 1_000);
        assert_eq!(fits.chunks.len(), 1);
        assert_eq!(fits.chunks[0].paths().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);

        let spills = splitter.split(vec![code("a.txt", first), code("b.txt", exact + 1)], 1_000);
        assert_eq!(spills.chunks.len(), 2);
        assert_eq!(spills.chunks[1].paths().collect::<Vec<_>>(), vec!["b.txt"]);
    }

    #[test]
    fn test_oversized_part_gets_own_chunk() {
        let splitter = Splitter::new("demo", 1_000);
        let parts = vec![code("huge.txt", 5_000), code("small.txt", 10)];

        let split = splitter.split(parts, 1_300);

        // the huge part follows the first intro; small.txt starts chunk 2
        assert_eq!(split.chunks.len(), 2);
        assert_eq!(split.chunks[0].paths().collect::<Vec<_>>(), vec!["huge.txt"]);
        assert_eq!(split.chunks[1].paths().collect::<Vec<_>>(), vec!["small.txt"]);
    }

    #[test]
    fn test_order_and_completeness() {
        let splitter = Splitter::new("demo", 2_000);
        let names: Vec<String> = (0..10).map(|i| format!("f{i}.txt")).collect();
        let parts: Vec<ContentPart> = names.iter().map(|n| code(n, 500)).collect();

        let split = splitter.split(parts, 1_250);

        let seen: Vec<&str> = split.chunks.iter().flat_map(Chunk::paths).collect();
        let expected: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_intro_placeholder_text() {
        let intro = intro_text("demo", 1, None);
        assert!(intro.contains("I will send it in multiple parts."));
        assert!(intro.contains("'RECEIVED PART 1 of multiple'"));
        assert!(intro.ends_with("Here is Part 1:\n\n"));
    }

    #[test]
    fn test_chunk_estimated_tokens() {
        let chunk = Chunk::new(vec![code("a", 8), ContentPart::markdown("abcde")]);
        assert_eq!(chunk.estimated_tokens(), 4);
    }
}
