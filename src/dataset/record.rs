//! Input record types for the generate-and-score cycle.
//!
//! A training batch is an ordered sequence of [`PromptRecord`]s. Each record
//! carries the prompt text plus an open-ended set of extra fields (reference
//! answers, difficulty labels, source tags, ...) that ride along as sample
//! metadata. The trainer never interprets those fields itself; they are
//! handed to the dynamic prompt hook and the reward pipeline as-is.

use serde::{Deserialize, Serialize};

/// Per-sample metadata: every field of the input record except the prompt.
///
/// Values cover the JSON sum type (string, number, boolean, null, array,
/// nested mapping); keys pass through unvalidated.
pub type MetaMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Prompt record
// ---------------------------------------------------------------------------

/// One input record: a prompt plus arbitrary extra fields.
///
/// Deserializes from JSON objects of the shape
/// `{"prompt": "...", <anything else>}` -- the non-prompt keys land in
/// `extra` via serde flatten and round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    /// The prompt text for this sample.
    pub prompt: String,
    /// All remaining fields of the record, key order preserved.
    #[serde(flatten)]
    pub extra: MetaMap,
}

impl PromptRecord {
    /// Create a record with no extra fields.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            extra: MetaMap::new(),
        }
    }

    /// Attach an extra field (builder-style).
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The record's sample metadata: every field except the prompt.
    ///
    /// A record built by hand may carry a `prompt` key inside `extra`; the
    /// returned map never does.
    pub fn meta(&self) -> MetaMap {
        let mut meta = self.extra.clone();
        meta.remove("prompt");
        meta
    }
}

// ---------------------------------------------------------------------------
// Metadata derivation
// ---------------------------------------------------------------------------

/// Derive the ordered metadata sequence for a batch.
///
/// `metas[i]` corresponds to `records[i]`: same order, same length, with the
/// `prompt` key removed and every other key unchanged.
pub fn derive_metas(records: &[PromptRecord]) -> Vec<MetaMap> {
    records.iter().map(|r| r.meta()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_json_splits_prompt_and_extras() {
        let record: PromptRecord =
            serde_json::from_value(json!({"prompt": "initial_prompt", "meta": 123})).unwrap();
        assert_eq!(record.prompt, "initial_prompt");
        assert_eq!(record.extra.len(), 1);
        assert_eq!(record.extra["meta"], json!(123));
    }

    #[test]
    fn test_record_roundtrip_keeps_extra_fields() {
        let record = PromptRecord::new("solve x")
            .with_field("answer", "42")
            .with_field("difficulty", 3)
            .with_field("tags", json!(["math", "easy"]));

        let text = serde_json::to_string(&record).unwrap();
        let parsed: PromptRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.extra["answer"], json!("42"));
        assert_eq!(parsed.extra["tags"], json!(["math", "easy"]));
    }

    #[test]
    fn test_meta_excludes_prompt_key() {
        let record = PromptRecord::new("p").with_field("meta", 123);
        let meta = record.meta();
        assert!(!meta.contains_key("prompt"));
        assert_eq!(meta["meta"], json!(123));
    }

    #[test]
    fn test_meta_strips_smuggled_prompt_key() {
        let mut record = PromptRecord::new("real prompt");
        record.extra.insert("prompt".into(), json!("impostor"));
        record.extra.insert("kept".into(), json!(true));

        let meta = record.meta();
        assert!(!meta.contains_key("prompt"));
        assert_eq!(meta["kept"], json!(true));
    }

    #[test]
    fn test_derive_metas_preserves_order_and_length() {
        let records: Vec<PromptRecord> = (0..4)
            .map(|i| PromptRecord::new(format!("prompt {i}")).with_field("index", i))
            .collect();

        let metas = derive_metas(&records);
        assert_eq!(metas.len(), 4);
        for (i, meta) in metas.iter().enumerate() {
            assert_eq!(meta["index"], json!(i));
            assert!(!meta.contains_key("prompt"));
        }
    }

    #[test]
    fn test_derive_metas_passes_nested_values_through() {
        let record = PromptRecord::new("p")
            .with_field("nested", json!({"a": 1, "b": [true, null]}))
            .with_field("label", "hard");

        let metas = derive_metas(std::slice::from_ref(&record));
        assert_eq!(metas[0]["nested"], json!({"a": 1, "b": [true, null]}));
        assert_eq!(metas[0]["label"], json!("hard"));
    }

    #[test]
    fn test_derive_metas_empty_batch() {
        assert!(derive_metas(&[]).is_empty());
    }
}
