//! Core data model types for examkit.
//!
//! These types mirror the exam document supplied by the content backend.
//! The document is immutable once loaded; every array tolerates being
//! missing, `null` or of the wrong shape, and degrades to empty content.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A complete exam as supplied by the content backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDocument {
    /// Human-readable exam title.
    #[serde(default)]
    pub title: String,
    /// Session length in minutes.
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    /// Which skills this exam covers.
    #[serde(rename = "type", default)]
    pub kind: ExamKind,
    /// Real tests skip the writing scoring-route prompt.
    #[serde(default)]
    pub real_test: bool,
    /// Reading passages, in order.
    #[serde(default, deserialize_with = "nullable")]
    pub reading: Vec<Passage>,
    /// Listening sections, in order.
    #[serde(default, deserialize_with = "nullable")]
    pub listening: Vec<Section>,
    /// Writing tasks. These never produce answer slots.
    #[serde(default, deserialize_with = "nullable")]
    pub writing: Vec<WritingTask>,
}

fn default_duration() -> u32 {
    60
}

impl ExamDocument {
    /// Number of questions across all passages and sections.
    pub fn question_count(&self) -> usize {
        self.reading
            .iter()
            .chain(&self.listening)
            .flat_map(|part| &part.question_groups)
            .map(|group| group.questions.len())
            .sum()
    }

    /// True when the exam has writing tasks and nothing else.
    pub fn is_writing_only(&self) -> bool {
        !self.writing.is_empty() && self.reading.is_empty() && self.listening.is_empty()
    }
}

/// Skill coverage of an exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamKind {
    Reading,
    Listening,
    Writing,
    /// Multi-skill mock test. Unknown kinds land here too.
    #[default]
    #[serde(other)]
    Full,
}

impl fmt::Display for ExamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamKind::Reading => write!(f, "reading"),
            ExamKind::Listening => write!(f, "listening"),
            ExamKind::Writing => write!(f, "writing"),
            ExamKind::Full => write!(f, "full"),
        }
    }
}

/// A reading passage or listening section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub question_groups: Vec<QuestionGroup>,
}

/// A reading passage.
pub type Passage = Part;

/// A listening section.
pub type Section = Part;

/// A block of questions sharing one interaction kind and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGroup {
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Templated body with embedded slot markers (fill-in and summary kinds).
    #[serde(default)]
    pub text: Option<String>,
    /// Shared heading pool for matching-headings groups.
    #[serde(default, deserialize_with = "nullable")]
    pub headings: Vec<Candidate>,
    /// Shared candidate pool for other pool-based kinds.
    #[serde(default, deserialize_with = "nullable")]
    pub options: Vec<Candidate>,
    #[serde(default, deserialize_with = "nullable")]
    pub questions: Vec<Question>,
}

/// One labeled choice or pool entry, e.g. `{ id: "iv", text: "Economic impact" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
}

impl Candidate {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A single scored question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub q_number: u32,
    #[serde(default)]
    pub text: Option<String>,
    /// Labeled choices specific to this question.
    #[serde(default, alias = "option", deserialize_with = "nullable")]
    pub options: Vec<Candidate>,
    /// Accepted answers. Several entries are synonyms, not multiple picks.
    #[serde(default, deserialize_with = "nullable")]
    pub correct_answers: Vec<String>,
}

/// An essay task. Writing uses its own address space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingTask {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub min_words: Option<u32>,
}

/// Interaction kinds a question group can take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalseNotGiven,
    YesNoNotGiven,
    MatchingHeadings,
    MatchingFeatures,
    MatchingInformation,
    MatchingSentenceEndings,
    SummaryCompletion,
    #[serde(rename = "summary-completion-options")]
    SummaryCompletionPool,
    SentenceCompletion,
    NoteCompletion,
    TableCompletion,
    FlowChartCompletion,
    FormCompletion,
    DiagramLabelling,
    MapLabelling,
    ShortAnswer,
    /// Anything unrecognized is scored as free text.
    #[default]
    #[serde(other)]
    Other,
}

/// How a slot's answer is compared against the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerClass {
    /// Typed text matched against a synonym list.
    FreeText,
    /// A pick among labeled options, compared by option text.
    Choice,
    /// A pick from a shared candidate pool, compared by id then by text.
    Candidate,
}

impl QuestionKind {
    pub fn answer_class(self) -> AnswerClass {
        match self {
            QuestionKind::MultipleChoice
            | QuestionKind::TrueFalseNotGiven
            | QuestionKind::YesNoNotGiven => AnswerClass::Choice,
            QuestionKind::MatchingHeadings
            | QuestionKind::MatchingFeatures
            | QuestionKind::MatchingInformation
            | QuestionKind::MatchingSentenceEndings
            | QuestionKind::SummaryCompletionPool
            | QuestionKind::MapLabelling => AnswerClass::Candidate,
            QuestionKind::SummaryCompletion
            | QuestionKind::SentenceCompletion
            | QuestionKind::NoteCompletion
            | QuestionKind::TableCompletion
            | QuestionKind::FlowChartCompletion
            | QuestionKind::FormCompletion
            | QuestionKind::DiagramLabelling
            | QuestionKind::ShortAnswer
            | QuestionKind::Other => AnswerClass::FreeText,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::TrueFalseNotGiven => "true-false-not-given",
            QuestionKind::YesNoNotGiven => "yes-no-not-given",
            QuestionKind::MatchingHeadings => "matching-headings",
            QuestionKind::MatchingFeatures => "matching-features",
            QuestionKind::MatchingInformation => "matching-information",
            QuestionKind::MatchingSentenceEndings => "matching-sentence-endings",
            QuestionKind::SummaryCompletion => "summary-completion",
            QuestionKind::SummaryCompletionPool => "summary-completion-options",
            QuestionKind::SentenceCompletion => "sentence-completion",
            QuestionKind::NoteCompletion => "note-completion",
            QuestionKind::TableCompletion => "table-completion",
            QuestionKind::FlowChartCompletion => "flow-chart-completion",
            QuestionKind::FormCompletion => "form-completion",
            QuestionKind::DiagramLabelling => "diagram-labelling",
            QuestionKind::MapLabelling => "map-labelling",
            QuestionKind::ShortAnswer => "short-answer",
            QuestionKind::Other => "other",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Treat `null` or a value of the wrong shape the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(T::deserialize(value).unwrap_or_else(|e| {
        tracing::warn!("ignoring malformed field: {e}");
        T::default()
    }))
}
