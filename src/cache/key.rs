//! Deterministic cache key derivation

use crate::core::AnalysisKind;
use crate::model::GenerationConfig;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Prefix shared by every analysis key, usable as an invalidation pattern
pub const ANALYSIS_KEY_PREFIX: &str = "gemini:analysis:";

/// Serialize JSON with object keys sorted, so equal values render equally
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(_) => value.to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let items: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

/// Hex-encoded SHA-256 of a string
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the cache key for one analysis step
///
/// Every component that influences the model output takes part in the hash:
/// the step id, the analysis kind, the model, the full generation config and
/// the rendered prompt (which carries the input and the response language).
pub fn analysis_cache_key(
    step_id: &str,
    kind: AnalysisKind,
    model: &str,
    config: &GenerationConfig,
    prompt: &str,
) -> String {
    let material = json!({
        "stepId": step_id,
        "analysisType": kind,
        "model": model,
        "config": config,
        "prompt": prompt,
    });
    format!("{}{}", ANALYSIS_KEY_PREFIX, sha256_hex(&canonical_json(&material)))
}
