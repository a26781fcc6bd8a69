//! Prompt assembly for answer generation.

use crate::retriever::RankedChunk;

pub const INSUFFICIENT_CONTEXT_ANSWER: &str = "I don't have enough information.";

/// Joins ranked chunk texts with a blank line, best match first.
pub fn build_context(ranked: &[RankedChunk<'_>]) -> String {
    ranked
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question based on the context below. If you cannot answer based on the context, say \"{INSUFFICIENT_CONTEXT_ANSWER}\"\n\
         \n\
         Context: {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}

/// First `max_chars` chars of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
