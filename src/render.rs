//! Plain-text rendering of chunks, as pasted into a conversation.

use crate::{assembler::ContentPart, engine::ProcessedOutput, splitter::Chunk};

const PART_SEPARATOR: &str = "\n";
const CHUNK_SEPARATOR: &str = "\n\n";

/// Renders one part.
#[must_use]
pub fn render_part(part: &ContentPart) -> String {
    match part {
        ContentPart::Markdown { content } => content.clone(),
        ContentPart::Code {
            content,
            language,
            path,
        } => format!("---\n### `{path}`\n\n```{language}\n{content}\n```"),
    }
}

/// Renders a chunk's parts in order.
#[must_use]
pub fn render_chunk(chunk: &Chunk) -> String {
    chunk
        .parts
        .iter()
        .map(render_part)
        .collect::<Vec<_>>()
        .join(PART_SEPARATOR)
}

/// Renders every chunk, separated by a blank line.
#[must_use]
pub fn render_output(output: &ProcessedOutput) -> String {
    output
        .chunks
        .iter()
        .map(render_chunk)
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}
