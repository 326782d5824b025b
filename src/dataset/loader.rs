//! JSONL dataset intake.
//!
//! Training data arrives as JSON Lines: one record object per line, each
//! with a `prompt` field plus arbitrary extras. Blank lines are skipped so
//! hand-edited files with trailing newlines load cleanly.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::record::PromptRecord;

/// Load a batch of records from a JSONL file.
///
/// # Errors
///
/// Fails if the file cannot be read or any non-blank line is not a valid
/// record object; the error names the path and 1-based line number.
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<PromptRecord>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset from {}", path.display()))?;

    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: PromptRecord = serde_json::from_str(line).with_context(|| {
            format!("Failed to parse record at {}:{}", path.display(), idx + 1)
        })?;
        records.push(record);
    }

    info!(
        path = %path.display(),
        records = records.len(),
        "Loaded dataset"
    );

    Ok(records)
}

/// A small built-in question-answering batch for mock runs.
///
/// Each record carries a `question` field (the base text the built-in
/// dynamic-prompt strategy rebuilds from) and an `answer` field (the
/// reference the exact-match reward grades against).
pub fn sample_records() -> Vec<PromptRecord> {
    vec![
        PromptRecord::new("Answer concisely: What is the capital of France?")
            .with_field("question", "What is the capital of France?")
            .with_field("answer", "Paris")
            .with_field("category", "geography"),
        PromptRecord::new("Answer concisely: What is 7 * 8?")
            .with_field("question", "What is 7 * 8?")
            .with_field("answer", "56")
            .with_field("category", "arithmetic"),
        PromptRecord::new("Answer concisely: Which planet is known as the Red Planet?")
            .with_field("question", "Which planet is known as the Red Planet?")
            .with_field("answer", "Mars")
            .with_field("category", "astronomy"),
        PromptRecord::new("Answer concisely: What gas do plants absorb from the air?")
            .with_field("question", "What gas do plants absorb from the air?")
            .with_field("answer", "Carbon dioxide")
            .with_field("category", "biology"),
        PromptRecord::new("Answer concisely: Who wrote 'Pride and Prejudice'?")
            .with_field("question", "Who wrote 'Pride and Prejudice'?")
            .with_field("answer", "Jane Austen")
            .with_field("category", "literature"),
        PromptRecord::new("Answer concisely: What is the chemical symbol for gold?")
            .with_field("question", "What is the chemical symbol for gold?")
            .with_field("answer", "Au")
            .with_field("category", "chemistry"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_jsonl_parses_records_in_order() {
        let tmp = std::env::temp_dir().join("molt_test_load.jsonl");
        std::fs::write(
            &tmp,
            "{\"prompt\": \"first\", \"idx\": 0}\n\n{\"prompt\": \"second\", \"idx\": 1}\n",
        )
        .unwrap();

        let records = load_jsonl(&tmp).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].prompt, "first");
        assert_eq!(records[1].prompt, "second");
        assert_eq!(records[1].extra["idx"], serde_json::json!(1));

        std::fs::remove_file(tmp).ok();
    }

    #[test]
    fn test_load_jsonl_reports_line_number_on_bad_record() {
        let tmp = std::env::temp_dir().join("molt_test_load_bad.jsonl");
        std::fs::write(&tmp, "{\"prompt\": \"ok\"}\nnot json\n").unwrap();

        let err = load_jsonl(&tmp).unwrap_err();
        assert!(format!("{err}").contains(":2"));

        std::fs::remove_file(tmp).ok();
    }

    #[test]
    fn test_load_jsonl_missing_file() {
        let result = load_jsonl("/nonexistent/molt.jsonl");
        assert!(result.is_err());
    }

    #[test]
    fn test_sample_records_carry_question_and_answer() {
        let records = sample_records();
        assert!(!records.is_empty());
        for record in &records {
            assert!(!record.prompt.is_empty());
            assert!(record.extra.contains_key("question"));
            assert!(record.extra.contains_key("answer"));
        }
    }
}
