//! Submission results with JSON persistence and markdown rendering.

use std::fmt;
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::QuestionKind;

/// How a writing submission is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingRoute {
    /// Deferred human grading; no score is shown.
    Standard,
    /// Immediate automated scoring.
    Ai,
}

impl fmt::Display for WritingRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WritingRoute::Standard => write!(f, "standard"),
            WritingRoute::Ai => write!(f, "ai"),
        }
    }
}

/// Per-question outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    /// Absolute slot index.
    #[serde(default)]
    pub index: usize,
    pub q_number: u32,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub your_answer: String,
    #[serde(default)]
    pub correct_answer: String,
    pub is_correct: bool,
}

impl QuestionReview {
    pub fn is_answered(&self) -> bool {
        !self.your_answer.trim().is_empty()
    }
}

/// Score counts. `score + wrong + skipped == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub score: u32,
    pub total: u32,
    pub wrong: u32,
    pub skipped: u32,
}

impl Tally {
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a QuestionReview>) -> Self {
        let mut tally = Tally::default();
        for review in reviews {
            tally.total += 1;
            if review.is_correct {
                tally.score += 1;
            } else if review.is_answered() {
                tally.wrong += 1;
            } else {
                tally.skipped += 1;
            }
        }
        tally
    }
}

/// The graded outcome of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    /// Backend identifier, used to request AI writing scoring.
    pub submission_id: String,
    pub score: u32,
    pub total: u32,
    pub wrong: u32,
    #[serde(default)]
    pub skipped: u32,
    /// Band score, when the exam maps to a single band table.
    #[serde(default)]
    pub band: Option<f32>,
    #[serde(default)]
    pub question_review: Vec<QuestionReview>,
    #[serde(default)]
    pub writing_answers: Option<Vec<String>>,
    /// Writing grading route, when one was chosen.
    #[serde(default)]
    pub route: Option<WritingRoute>,
    #[serde(rename = "timeTaken", default)]
    pub time_taken_secs: u64,
    #[serde(default)]
    pub is_practice: bool,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionResult {
    pub fn tally(&self) -> Tally {
        Tally {
            score: self.score,
            total: self.total,
            wrong: self.wrong,
            skipped: self.skipped,
        }
    }

    /// Recompute `skipped` from the other counts when a backend omits or misreports it.
    pub fn reconcile(&mut self) {
        if !self.question_review.is_empty() {
            let tally = Tally::from_reviews(&self.question_review);
            self.score = tally.score;
            self.total = tally.total;
            self.wrong = tally.wrong;
            self.skipped = tally.skipped;
        } else {
            self.wrong = self.wrong.min(self.total.saturating_sub(self.score));
            self.skipped = self.total.saturating_sub(self.score + self.wrong);
        }
    }

    /// Restrict the result to the reviews at positions in `range`.
    ///
    /// Counts are recomputed from the kept reviews; the band is dropped since
    /// a partial count does not map onto a band table.
    pub fn scoped_to(&self, range: Range<usize>) -> SubmissionResult {
        let question_review: Vec<QuestionReview> = self
            .question_review
            .iter()
            .enumerate()
            .filter(|(i, _)| range.contains(i))
            .map(|(_, review)| review.clone())
            .collect();
        let tally = Tally::from_reviews(&question_review);
        SubmissionResult {
            score: tally.score,
            total: tally.total,
            wrong: tally.wrong,
            skipped: tally.skipped,
            band: None,
            question_review,
            is_practice: true,
            ..self.clone()
        }
    }

    /// Whether a score should be shown. Standard-route writing waits for a human grader.
    pub fn score_visible(&self) -> bool {
        self.route != Some(WritingRoute::Standard)
    }

    /// Save the result as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a result from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        let result: SubmissionResult =
            serde_json::from_str(&content).context("failed to parse result JSON")?;
        Ok(result)
    }

    /// Format the result as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        if self.score_visible() {
            md.push_str(&format!(
                "**Score:** {}/{} ({} wrong, {} skipped)",
                self.score, self.total, self.wrong, self.skipped
            ));
            if let Some(band) = self.band {
                md.push_str(&format!(" | **Band:** {band:.1}"));
            }
            md.push_str("\n\n");
        } else {
            md.push_str("**Submitted for grading.** Scores will be available once reviewed.\n\n");
        }
        md.push_str(&format!(
            "Time taken: {}m {:02}s\n\n",
            self.time_taken_secs / 60,
            self.time_taken_secs % 60
        ));

        if self.score_visible() && !self.question_review.is_empty() {
            md.push_str("| Q | Type | Your answer | Correct answer | Result |\n");
            md.push_str("|---|------|-------------|----------------|--------|\n");
            for r in &self.question_review {
                let mark = if r.is_correct {
                    "correct"
                } else if r.is_answered() {
                    "wrong"
                } else {
                    "skipped"
                };
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    r.q_number, r.kind, r.your_answer, r.correct_answer, mark
                ));
            }
        }

        md
    }
}
