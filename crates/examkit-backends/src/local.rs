//! Offline backend: exam documents from disk, graded in-process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use examkit_core::model::ExamDocument;
use examkit_core::parser::find_exam;
use examkit_core::report::SubmissionResult;
use examkit_core::scoring::grade_submission;
use examkit_core::traits::{ContentBackend, GradingBackend, SubmitRequest};

use crate::error::BackendError;

/// Serves exams from a directory (file stem = test id) and grades them with
/// the local comparator and band table.
///
/// Documents registered with [`LocalBackend::with_document`] take precedence
/// over the directory. Automated writing scoring is not available offline.
pub struct LocalBackend {
    exam_dir: Option<PathBuf>,
    documents: Mutex<HashMap<String, ExamDocument>>,
}

impl LocalBackend {
    pub fn new(exam_dir: impl Into<PathBuf>) -> Self {
        Self {
            exam_dir: Some(exam_dir.into()),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// A backend with no directory, serving only registered documents.
    pub fn in_memory() -> Self {
        Self {
            exam_dir: None,
            documents: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_document(self, test_id: &str, document: ExamDocument) -> Self {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(test_id.to_string(), document);
        self
    }

    pub fn exam_dir(&self) -> Option<&Path> {
        self.exam_dir.as_deref()
    }

    fn document(&self, test_id: &str) -> anyhow::Result<ExamDocument> {
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(doc) = documents.get(test_id) {
            return Ok(doc.clone());
        }

        let found = match &self.exam_dir {
            Some(dir) => find_exam(dir, test_id)?,
            None => None,
        };
        let doc = found.ok_or_else(|| BackendError::ExamNotFound(test_id.to_string()))?;
        debug!(test_id, "cached exam from disk");
        documents.insert(test_id.to_string(), doc.clone());
        Ok(doc)
    }
}

#[async_trait]
impl ContentBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn get_exam(&self, test_id: &str) -> anyhow::Result<ExamDocument> {
        self.document(test_id)
    }
}

#[async_trait]
impl GradingBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn submit(
        &self,
        test_id: &str,
        request: &SubmitRequest,
    ) -> anyhow::Result<SubmissionResult> {
        let doc = self.document(test_id)?;
        let result = grade_submission(&doc, request);
        info!(
            test_id,
            submission_id = %result.submission_id,
            score = result.score,
            total = result.total,
            "graded locally"
        );
        Ok(result)
    }

    async fn score_writing_with_ai(&self, _submission_id: &str) -> anyhow::Result<SubmissionResult> {
        Err(BackendError::Unsupported {
            backend: "local",
            operation: "AI writing scoring",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAM: &str = r#"{
        "title": "Listening 2",
        "type": "listening",
        "listening": [{
            "id": "s1",
            "questionGroups": [{
                "type": "multiple-choice",
                "questions": [{
                    "qNumber": 1,
                    "options": [{"id": "A", "text": "By bus"}, {"id": "B", "text": "By train"}],
                    "correctAnswers": ["By train"]
                }, {
                    "qNumber": 2,
                    "options": [{"id": "A", "text": "Monday"}, {"id": "B", "text": "Friday"}],
                    "correctAnswers": ["Monday"]
                }]
            }]
        }]
    }"#;

    fn request(answers: &[&str]) -> SubmitRequest {
        SubmitRequest {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            writing: vec![],
            time_taken_secs: 42,
            is_practice: false,
        }
    }

    #[tokio::test]
    async fn grades_exam_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("l2.json"), EXAM).unwrap();
        let backend = LocalBackend::new(dir.path());

        let doc = backend.get_exam("l2").await.unwrap();
        assert_eq!(doc.question_count(), 2);

        let result = backend.submit("l2", &request(&["B", "B"])).await.unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.wrong, 1);
        assert_eq!(result.band, Some(0.0));
        assert_eq!(result.question_review[0].your_answer, "By train");
        assert_eq!(result.time_taken_secs, 42);
    }

    #[tokio::test]
    async fn registered_documents_need_no_directory() {
        let doc: ExamDocument = serde_json::from_str(EXAM).unwrap();
        let backend = LocalBackend::in_memory().with_document("mem", doc);

        assert!(backend.get_exam("mem").await.is_ok());
        let err = backend.get_exam("other").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackendError>(),
            Some(BackendError::ExamNotFound(id)) if id == "other"
        ));
    }

    #[tokio::test]
    async fn ai_scoring_is_unsupported() {
        let backend = LocalBackend::in_memory();
        let err = backend.score_writing_with_ai("sub-1").await.unwrap_err();
        let err = err.downcast::<BackendError>().unwrap();
        assert!(err.is_permanent());
        assert!(err.to_string().contains("AI writing scoring"));
    }
}
