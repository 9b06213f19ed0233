//! Prompt construction for analysis steps

use crate::cache::canonical_json;
use crate::core::AnalysisKind;
use serde_json::Value;

/// Build the prompt for an analysis kind over the given input
///
/// Deterministic: the same kind, input and language always yield the same text.
pub fn build_prompt(kind: AnalysisKind, input: &Value, language: &str) -> String {
    format!(
        "{}\n\nContent: {}\n\nProvide detailed analysis in {}.",
        kind.base_prompt(),
        canonical_json(input),
        language
    )
}
