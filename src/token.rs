//! Token estimation.
//!
//! Only a coarse, deterministic estimate is needed: characters divided by
//! four, rounded up, in integer arithmetic.

/// Characters assumed per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Nominal token limit for one chunk.
pub const TOKEN_LIMIT_PER_CHUNK: usize = 15_000;

/// Character budget for one chunk, derived from the token limit.
pub const CHUNK_CHAR_BUDGET: usize = TOKEN_LIMIT_PER_CHUNK * CHARS_PER_TOKEN;

/// Counts characters the way every size computation in this crate does.
///
/// Counts Unicode scalar values, not UTF-16 code units, so a character
/// outside the Basic Multilingual Plane (most emoji) counts once instead of
/// twice.
#[inline]
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Estimates tokens for a character count: `ceil(chars / 4)`.
#[inline]
#[must_use]
pub const fn estimate_tokens(char_count: usize) -> usize {
    char_count.div_ceil(CHARS_PER_TOKEN)
}

/// Estimates tokens for a piece of text.
#[inline]
#[must_use]
pub fn estimate_text(text: &str) -> usize {
    estimate_tokens(char_len(text))
}

/// Decides whether output needs chunking.
///
/// The token estimate is converted back to characters before comparing with
/// the character budget. With the default budget this is equivalent to
/// "more than 60000 characters in total", not "more than 15000 tokens".
#[inline]
#[must_use]
pub const fn exceeds_budget(token_estimate: usize, char_budget: usize) -> bool {
    token_estimate.saturating_mul(CHARS_PER_TOKEN) > char_budget
}
