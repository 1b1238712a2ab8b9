//! The `examkit validate` command.

use std::path::PathBuf;

use anyhow::Result;

use examkit_core::parser::{load_exam_directory, parse_exam_document, validate_exam};

pub fn execute(exam_path: PathBuf) -> Result<()> {
    let exams = if exam_path.is_dir() {
        load_exam_directory(&exam_path)?
    } else {
        let id = exam_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        vec![(id, parse_exam_document(&exam_path)?)]
    };

    if exams.is_empty() {
        anyhow::bail!("no exam documents found in {}", exam_path.display());
    }

    let mut total_warnings = 0;

    for (id, doc) in &exams {
        println!(
            "Exam: {} [{id}] ({}, {} questions, {} writing tasks, {} min)",
            if doc.title.is_empty() { id.as_str() } else { doc.title.as_str() },
            doc.kind,
            doc.question_count(),
            doc.writing.len(),
            doc.duration_minutes,
        );

        let warnings = validate_exam(doc);
        for w in &warnings {
            let prefix = w
                .location
                .as_ref()
                .map(|loc| format!("  [{loc}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All exams valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
