//! Type-aware answer comparison and local grading.
//!
//! Every slot is compared according to its [`AnswerClass`]: free text against
//! a synonym list, choices by option text, and pool candidates by id with a
//! text fallback. Normalization is case-insensitive and collapses whitespace.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use uuid::Uuid;

use crate::band::{band_for, Skill};
use crate::model::{AnswerClass, ExamDocument, ExamKind};
use crate::report::{QuestionReview, SubmissionResult, Tally};
use crate::slots::{answer_key, build_slots, Slot};
use crate::traits::SubmitRequest;

/// Outcome of comparing one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
    /// Submitted answer as shown to the test-taker (option text when resolvable).
    pub your_answer: String,
    /// Accepted answers as shown to the test-taker.
    pub correct_answer: String,
}

/// Lowercase, trim, and collapse internal whitespace.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn free_text_key(s: &str) -> String {
    let normalized = normalize(s);
    for article in ["the ", "an ", "a "] {
        if let Some(rest) = normalized.strip_prefix(article) {
            return rest.to_string();
        }
    }
    normalized
}

fn choice_key(s: &str) -> String {
    let normalized = normalize(s);
    match normalized.as_str() {
        "not" | "ng" => "not given".to_string(),
        _ => normalized,
    }
}

fn ordinal_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*[(\[]?(?:\d{1,2}|x{1,3}(?:ix|iv|v?i{0,3})|ix|iv|v?i{1,3}|v|[a-z])\s*[.):\]](?:\s+|$)",
        )
        .expect("ordinal prefix pattern is valid")
    })
}

/// Remove a leading label such as `iv.`, `B)`, `(c)` or `3:` from candidate text.
pub fn strip_ordinal(s: &str) -> &str {
    match ordinal_prefix().find(s) {
        Some(m) => &s[m.end()..],
        None => s,
    }
}

/// Text of the candidate `value` names on this slot, or `value` itself.
fn display_text<'a>(slot: &'a Slot, value: &'a str) -> &'a str {
    match slot.resolve(value) {
        Some(candidate) if !candidate.text.trim().is_empty() => candidate.text.trim(),
        _ => value.trim(),
    }
}

/// Compare one submitted answer against its accepted answers.
pub fn compare(slot: &Slot, submitted: &str, correct: &[String]) -> Verdict {
    let class = slot.kind.answer_class();
    let correct_answer = match class {
        AnswerClass::FreeText => correct
            .iter()
            .map(|c| c.trim())
            .collect::<Vec<_>>()
            .join(" / "),
        AnswerClass::Choice | AnswerClass::Candidate => correct
            .iter()
            .map(|c| display_text(slot, c))
            .collect::<Vec<_>>()
            .join(" / "),
    };

    if submitted.trim().is_empty() {
        return Verdict {
            is_correct: false,
            your_answer: String::new(),
            correct_answer,
        };
    }

    let (is_correct, your_answer) = match class {
        AnswerClass::FreeText => {
            let key = free_text_key(submitted);
            let hit = correct.iter().any(|c| free_text_key(c) == key);
            (hit, submitted.trim().to_string())
        }
        AnswerClass::Choice => {
            let text = display_text(slot, submitted);
            let key = choice_key(text);
            let hit = correct
                .iter()
                .any(|c| choice_key(display_text(slot, c)) == key);
            (hit, text.to_string())
        }
        AnswerClass::Candidate => {
            let id = normalize(submitted);
            let by_id = correct.iter().any(|c| normalize(c) == id);
            // Authored pools drift: an id and its label can disagree, so the
            // label text is compared even when the ids are well formed.
            let text = display_text(slot, submitted);
            let key = normalize(strip_ordinal(text));
            let by_text = !key.is_empty()
                && correct
                    .iter()
                    .any(|c| normalize(strip_ordinal(display_text(slot, c))) == key);
            (by_id || by_text, text.to_string())
        }
    };

    Verdict {
        is_correct,
        your_answer,
        correct_answer,
    }
}

/// Skill whose band table applies to an exam, if any.
pub fn skill_for(kind: ExamKind) -> Option<Skill> {
    match kind {
        ExamKind::Reading => Some(Skill::Reading),
        ExamKind::Listening => Some(Skill::Listening),
        ExamKind::Writing | ExamKind::Full => None,
    }
}

/// Review every slot of `doc` against the submitted answers.
pub fn review_answers(doc: &ExamDocument, answers: &[String]) -> Vec<QuestionReview> {
    build_slots(doc)
        .iter()
        .zip(answer_key(doc))
        .map(|(slot, correct)| {
            let submitted = answers.get(slot.index).map_or("", String::as_str);
            let verdict = compare(slot, submitted, &correct);
            QuestionReview {
                index: slot.index,
                q_number: slot.q_number,
                kind: slot.kind,
                your_answer: verdict.your_answer,
                correct_answer: verdict.correct_answer,
                is_correct: verdict.is_correct,
            }
        })
        .collect()
}

/// Grade a submission locally, the way the grading backend would.
pub fn grade_submission(doc: &ExamDocument, request: &SubmitRequest) -> SubmissionResult {
    let question_review = review_answers(doc, &request.answers);
    let tally = Tally::from_reviews(&question_review);
    let band = skill_for(doc.kind).map(|skill| band_for(tally.score, skill));

    SubmissionResult {
        submission_id: Uuid::new_v4().to_string(),
        score: tally.score,
        total: tally.total,
        wrong: tally.wrong,
        skipped: tally.skipped,
        band,
        question_review,
        writing_answers: (!doc.writing.is_empty()).then(|| request.writing.clone()),
        route: None,
        time_taken_secs: request.time_taken_secs,
        is_practice: request.is_practice,
        submitted_at: Utc::now(),
    }
}
