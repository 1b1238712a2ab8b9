//! Exam document and answer sheet loading.
//!
//! Exam documents are JSON (the content backend's format) or TOML, picked by
//! file extension. Loaded documents can be validated for authoring mistakes
//! that would silently make questions unscorable.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{AnswerClass, ExamDocument, QuestionKind};
use crate::slots::{answer_key, build_slots, build_steps, step_for_slot};

/// Answers prepared outside a live session, e.g. for `examkit score`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSheet {
    /// Slot answers by index. Shorter sheets leave the remaining slots blank.
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub writing: Vec<String>,
    /// Elapsed time to report; the session clock is used when absent.
    #[serde(default)]
    pub time_taken_secs: Option<u64>,
}

/// Document formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> Option<Format> {
    match path.extension()?.to_str()? {
        "json" => Some(Format::Json),
        "toml" => Some(Format::Toml),
        _ => None,
    }
}

/// Parse a single exam document file.
pub fn parse_exam_document(path: &Path) -> Result<ExamDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse exam document content; `source_path` picks the format and labels errors.
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamDocument> {
    match format_of(source_path) {
        Some(Format::Toml) => toml::from_str(content)
            .with_context(|| format!("failed to parse TOML: {}", source_path.display())),
        // JSON is the content backend's native format and the fallback.
        Some(Format::Json) | None => serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source_path.display())),
    }
}

/// Recursively load every `.json` and `.toml` exam under `dir`.
///
/// Each document is keyed by its file stem, which serves as the test id.
/// Files that fail to parse are skipped with a warning.
pub fn load_exam_directory(dir: &Path) -> Result<Vec<(String, ExamDocument)>> {
    let mut exams = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            exams.extend(load_exam_directory(&path)?);
        } else if format_of(&path).is_some() {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match parse_exam_document(&path) {
                Ok(doc) => exams.push((stem.to_string(), doc)),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(exams)
}

/// Find the exam with `test_id` (file stem) directly inside `dir`.
pub fn find_exam(dir: &Path, test_id: &str) -> Result<Option<ExamDocument>> {
    for ext in ["json", "toml"] {
        let path = dir.join(format!("{test_id}.{ext}"));
        if path.is_file() {
            return parse_exam_document(&path).map(Some);
        }
    }
    Ok(None)
}

/// Parse an answer sheet JSON file.
pub fn parse_answer_sheet(path: &Path) -> Result<AnswerSheet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer sheet: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answer sheet: {}", path.display()))
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Where the problem is, e.g. "Passage 2, Q14".
    pub location: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    fn exam(message: impl Into<String>) -> Self {
        Self {
            location: None,
            message: message.into(),
        }
    }
}

/// Check a document for problems that make questions unanswerable or unscorable.
pub fn validate_exam(doc: &ExamDocument) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if doc.duration_minutes == 0 {
        warnings.push(ValidationWarning::exam(
            "duration is zero; the session expires on its first tick",
        ));
    }
    if doc.reading.is_empty() && doc.listening.is_empty() && doc.writing.is_empty() {
        warnings.push(ValidationWarning::exam("exam has no passages, sections, or writing tasks"));
    }

    let slots = build_slots(doc);
    let steps = build_steps(doc);
    let key = answer_key(doc);
    let mut seen: HashMap<u32, usize> = HashMap::new();

    for (slot, correct) in slots.iter().zip(&key) {
        let location = match step_for_slot(&steps, slot.index) {
            Some(step) => format!("{}, Q{}", steps[step].label, slot.q_number),
            None => format!("Q{}", slot.q_number),
        };
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                location: Some(location.clone()),
                message,
            })
        };

        if let Some(first) = seen.insert(slot.q_number, slot.index) {
            warn(format!(
                "question number {} is also used by slot {first}",
                slot.q_number
            ));
        }
        if correct.iter().all(|a| a.trim().is_empty()) {
            warn("no correct answers; this question can never be scored correct".into());
        }
        if slot.kind == QuestionKind::Other {
            warn("unknown question type; answers are compared as free text".into());
        }
        match slot.kind.answer_class() {
            AnswerClass::Candidate if slot.options.is_empty() && slot.headings.is_empty() => {
                warn(format!("{} group has no candidate pool", slot.kind));
            }
            AnswerClass::Choice
                if slot.kind == QuestionKind::MultipleChoice && slot.options.is_empty() =>
            {
                warn("multiple-choice question has no options".into());
            }
            _ => {}
        }
    }

    for (i, task) in doc.writing.iter().enumerate() {
        if task.prompt.trim().is_empty() {
            warnings.push(ValidationWarning {
                location: Some(format!("Task {}", i + 1)),
                message: "writing task prompt is empty".into(),
            });
        }
    }

    warnings
}
