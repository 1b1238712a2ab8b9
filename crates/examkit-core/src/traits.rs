//! Core trait definitions for the content and grading backends.
//!
//! These async traits are implemented by the `examkit-backends` crate. The
//! session engine only ever talks to them through `Arc<dyn ...>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::ExamDocument;
use crate::report::SubmissionResult;

// ---------------------------------------------------------------------------
// Content backend
// ---------------------------------------------------------------------------

/// Read-only source of exam documents.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Fetch the exam document for a test.
    async fn get_exam(&self, test_id: &str) -> anyhow::Result<ExamDocument>;
}

// ---------------------------------------------------------------------------
// Grading backend
// ---------------------------------------------------------------------------

/// Authoritative grader for submitted sessions.
#[async_trait]
pub trait GradingBackend: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Grade a submission.
    async fn submit(&self, test_id: &str, request: &SubmitRequest)
        -> anyhow::Result<SubmissionResult>;

    /// Request automated scoring of a submission's writing answers.
    async fn score_writing_with_ai(&self, submission_id: &str) -> anyhow::Result<SubmissionResult>;
}

/// The answers packaged for grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Slot answers, index-aligned with the slot list.
    pub answers: Vec<String>,
    /// Writing answers, index-aligned with the writing tasks.
    #[serde(default)]
    pub writing: Vec<String>,
    #[serde(rename = "timeTaken")]
    pub time_taken_secs: u64,
    #[serde(default)]
    pub is_practice: bool,
}
