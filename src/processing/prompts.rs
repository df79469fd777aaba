//! Fixed prompt templates for summaries and answers.

use super::types::DocumentChunk;

/// Leading chunks fed to the summary prompt.
pub(crate) const SUMMARY_CONTEXT_CHUNKS: usize = 3;
/// Low randomness: summaries should be stable across uploads of the same file.
pub(crate) const SUMMARY_TEMPERATURE: f32 = 0.2;
pub(crate) const ANSWER_TEMPERATURE: f32 = 0.5;

pub(crate) fn summary_prompt(chunks: &[DocumentChunk]) -> String {
    let context = chunks
        .iter()
        .take(SUMMARY_CONTEXT_CHUNKS)
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on the following initial text from a document, please provide a concise, \
         one-paragraph summary of what this document is likely about.\n\n\
         Initial Text:\n{context}"
    )
}

pub(crate) fn answer_prompt<'a>(
    context: impl IntoIterator<Item = &'a DocumentChunk>,
    question: &str,
) -> String {
    let context = context
        .into_iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Answer the user's question based only on the provided context.\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}"
    )
}
