//! Mock backend for testing sessions without a real service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use examkit_core::model::ExamDocument;
use examkit_core::report::SubmissionResult;
use examkit_core::scoring::grade_submission;
use examkit_core::traits::{ContentBackend, GradingBackend, SubmitRequest};

use crate::error::BackendError;

/// Scripted outcome for the next `submit` call.
#[derive(Debug, Clone)]
pub enum Scripted {
    Result(SubmissionResult),
    /// Fail with a network error carrying this message.
    Failure(String),
}

/// A mock backend serving one exam.
///
/// `submit` pops scripted outcomes in order; once they run out it grades the
/// request against the exam locally.
pub struct MockBackend {
    exam: ExamDocument,
    script: Mutex<VecDeque<Scripted>>,
    ai_band: Option<f32>,
    exam_calls: AtomicU32,
    submit_calls: AtomicU32,
    ai_calls: AtomicU32,
    requests: Mutex<Vec<SubmitRequest>>,
    last_result: Mutex<Option<SubmissionResult>>,
}

impl MockBackend {
    pub fn new(exam: ExamDocument) -> Self {
        Self {
            exam,
            script: Mutex::new(VecDeque::new()),
            ai_band: None,
            exam_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            ai_calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            last_result: Mutex::new(None),
        }
    }

    /// Queue an outcome for a future `submit` call.
    pub fn then(self, outcome: Scripted) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    /// Fail the next `times` submissions.
    pub fn failing(self, times: usize, message: &str) -> Self {
        (0..times).fold(self, |mock, _| mock.then(Scripted::Failure(message.to_string())))
    }

    /// Answer AI scoring requests with this band instead of failing.
    pub fn with_ai_band(mut self, band: f32) -> Self {
        self.ai_band = Some(band);
        self
    }

    pub fn exam_calls(&self) -> u32 {
        self.exam_calls.load(Ordering::Relaxed)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::Relaxed)
    }

    pub fn ai_calls(&self) -> u32 {
        self.ai_calls.load(Ordering::Relaxed)
    }

    /// Every request received by `submit`, in order.
    pub fn requests(&self) -> Vec<SubmitRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_exam(&self, _test_id: &str) -> anyhow::Result<ExamDocument> {
        self.exam_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.exam.clone())
    }
}

#[async_trait]
impl GradingBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(
        &self,
        _test_id: &str,
        request: &SubmitRequest,
    ) -> anyhow::Result<SubmissionResult> {
        self.submit_calls.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(Scripted::Failure(message)) => {
                return Err(BackendError::NetworkError(message).into())
            }
            Some(Scripted::Result(result)) => result,
            None => grade_submission(&self.exam, request),
        };
        *self.last_result.lock().unwrap() = Some(result.clone());
        Ok(result)
    }

    async fn score_writing_with_ai(&self, submission_id: &str) -> anyhow::Result<SubmissionResult> {
        self.ai_calls.fetch_add(1, Ordering::Relaxed);
        let Some(band) = self.ai_band else {
            return Err(BackendError::Unsupported {
                backend: "mock",
                operation: "AI writing scoring",
            }
            .into());
        };
        let last = self.last_result.lock().unwrap().clone();
        match last {
            Some(result) if result.submission_id == submission_id => Ok(SubmissionResult {
                band: Some(band),
                submitted_at: Utc::now(),
                ..result
            }),
            _ => Err(BackendError::SubmissionNotFound(submission_id.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam() -> ExamDocument {
        serde_json::from_str(
            r#"{"type": "reading", "reading": [{"questionGroups": [{"type": "short-answer",
                "questions": [{"qNumber": 1, "correctAnswers": ["salt"]}]}]}],
                "writing": [{"id": "w1", "prompt": "Describe the process."}]}"#,
        )
        .unwrap()
    }

    fn request(answer: &str) -> SubmitRequest {
        SubmitRequest {
            answers: vec![answer.into()],
            writing: vec!["The process begins...".into()],
            time_taken_secs: 5,
            is_practice: false,
        }
    }

    #[tokio::test]
    async fn scripted_failures_then_local_grading() {
        let mock = MockBackend::new(exam()).failing(2, "connection reset");

        for _ in 0..2 {
            let err = mock.submit("t", &request("salt")).await.unwrap_err();
            assert!(err.to_string().contains("connection reset"));
        }
        let result = mock.submit("t", &request("Salt")).await.unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(mock.submit_calls(), 3);
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn ai_scoring_uses_last_submission() {
        let mock = MockBackend::new(exam()).with_ai_band(6.5);
        let submitted = mock.submit("t", &request("pepper")).await.unwrap();

        let scored = mock
            .score_writing_with_ai(&submitted.submission_id)
            .await
            .unwrap();
        assert_eq!(scored.band, Some(6.5));
        assert_eq!(scored.score, 0);
        assert!(mock.score_writing_with_ai("unknown").await.is_err());
        assert_eq!(mock.ai_calls(), 2);
    }

    #[tokio::test]
    async fn ai_scoring_unsupported_by_default() {
        let mock = MockBackend::new(exam());
        assert!(mock.score_writing_with_ai("x").await.is_err());
        assert_eq!(mock.exam_calls(), 0);
        mock.get_exam("t").await.unwrap();
        assert_eq!(mock.exam_calls(), 1);
    }
}
