//! Slot and step derivation.
//!
//! A slot is one scored answer position; its index is the only key used to
//! address answers downstream. Steps are navigable ranges over the same slot
//! space, one per passage, section, or writing task.
//!
//! Both builders walk passages, then sections, then groups and questions in
//! array order. They count independently, so the step ranges must always
//! equal the concatenation of slots each part contributed.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::model::{Candidate, ExamDocument, Part, QuestionKind};

/// One addressable answer position with its group context merged in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    /// Absolute position in the answer vector.
    pub index: usize,
    pub kind: QuestionKind,
    pub instructions: Option<String>,
    /// Group-level heading pool.
    pub headings: Vec<Candidate>,
    pub q_number: u32,
    pub text: Option<String>,
    /// The question's own choices, or the group pool when it has none.
    pub options: Vec<Candidate>,
}

impl Slot {
    /// Look up a candidate by id among the options, then the headings.
    pub fn resolve(&self, id: &str) -> Option<&Candidate> {
        let id = id.trim();
        self.options
            .iter()
            .chain(&self.headings)
            .find(|c| c.id.trim().eq_ignore_ascii_case(id))
    }
}

/// The part of the exam a step navigates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Reading,
    Listening,
    Writing,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Reading => write!(f, "reading"),
            StepKind::Listening => write!(f, "listening"),
            StepKind::Writing => write!(f, "writing"),
        }
    }
}

/// A navigable partition of the slot space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    /// Display label, e.g. "Passage 2".
    pub label: String,
    /// Index of the passage, section, or writing task within its list.
    pub item: usize,
    /// Half-open slot range. Writing steps address tasks, not slots, and carry `None`.
    pub slots: Option<Range<usize>>,
}

impl Step {
    pub fn is_writing(&self) -> bool {
        self.kind == StepKind::Writing
    }

    pub fn slot_count(&self) -> usize {
        self.slots.as_ref().map_or(0, |r| r.len())
    }

    pub fn contains(&self, index: usize) -> bool {
        self.slots.as_ref().is_some_and(|r| r.contains(&index))
    }
}

fn parts(doc: &ExamDocument) -> impl Iterator<Item = (StepKind, usize, &Part)> {
    let reading = doc
        .reading
        .iter()
        .enumerate()
        .map(|(i, p)| (StepKind::Reading, i, p));
    let listening = doc
        .listening
        .iter()
        .enumerate()
        .map(|(i, p)| (StepKind::Listening, i, p));
    reading.chain(listening)
}

/// Flatten the document into its ordered list of answer slots.
pub fn build_slots(doc: &ExamDocument) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(doc.question_count());
    for (_, _, part) in parts(doc) {
        for group in &part.question_groups {
            for question in &group.questions {
                let options = if question.options.is_empty() {
                    group.options.clone()
                } else {
                    question.options.clone()
                };
                slots.push(Slot {
                    index: slots.len(),
                    kind: group.kind,
                    instructions: group.instructions.clone(),
                    headings: group.headings.clone(),
                    q_number: question.q_number,
                    text: question.text.clone(),
                    options,
                });
            }
        }
    }
    slots
}

/// Derive one step per passage and section, followed by one per writing task.
pub fn build_steps(doc: &ExamDocument) -> Vec<Step> {
    let mut steps = Vec::with_capacity(doc.reading.len() + doc.listening.len() + doc.writing.len());
    let mut cursor = 0usize;
    for (kind, item, part) in parts(doc) {
        let len: usize = part.question_groups.iter().map(|g| g.questions.len()).sum();
        let label = match kind {
            StepKind::Reading => format!("Passage {}", item + 1),
            _ => format!("Section {}", item + 1),
        };
        steps.push(Step {
            kind,
            label,
            item,
            slots: Some(cursor..cursor + len),
        });
        cursor += len;
    }
    for (item, _) in doc.writing.iter().enumerate() {
        steps.push(Step {
            kind: StepKind::Writing,
            label: format!("Task {}", item + 1),
            item,
            slots: None,
        });
    }
    steps
}

/// Authoritative answers, index-aligned with [`build_slots`].
pub fn answer_key(doc: &ExamDocument) -> Vec<Vec<String>> {
    parts(doc)
        .flat_map(|(_, _, part)| &part.question_groups)
        .flat_map(|group| &group.questions)
        .map(|question| question.correct_answers.clone())
        .collect()
}

/// Index of the step whose range holds `slot`.
pub fn step_for_slot(steps: &[Step], slot: usize) -> Option<usize> {
    steps.iter().position(|s| s.contains(slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{document, part, text_group};
    use crate::model::QuestionKind;

    fn expected_len(doc: &ExamDocument) -> usize {
        doc.reading
            .iter()
            .chain(&doc.listening)
            .flat_map(|p| &p.question_groups)
            .map(|g| g.questions.len())
            .sum()
    }

    #[test]
    fn slot_count_matches_question_count() {
        for (reading, listening, writing) in [
            (vec![13, 13, 14], vec![10, 10, 10, 10], 2),
            (vec![], vec![10, 10], 0),
            (vec![5], vec![], 1),
            (vec![], vec![], 2),
            (vec![0, 3, 0], vec![0], 0),
        ] {
            let doc = document(&reading, &listening, writing);
            let slots = build_slots(&doc);
            assert_eq!(slots.len(), expected_len(&doc));
            assert!(slots.iter().enumerate().all(|(i, s)| s.index == i));
        }
    }

    #[test]
    fn slots_follow_document_order() {
        let doc = document(&[2, 1], &[2], 1);
        let numbers: Vec<u32> = build_slots(&doc).iter().map(|s| s.q_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn steps_partition_slot_space() {
        let doc = document(&[13, 0, 14], &[10, 10], 2);
        let slots = build_slots(&doc);
        let steps = build_steps(&doc);

        let ranged: Vec<&Range<usize>> = steps.iter().filter_map(|s| s.slots.as_ref()).collect();
        assert_eq!(ranged.first().map(|r| r.start), Some(0));
        assert_eq!(ranged.last().map(|r| r.end), Some(slots.len()));
        for pair in ranged.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn step_ranges_cover_exactly_their_parts_slots() {
        let mut doc = document(&[3, 4], &[2], 0);
        doc.reading[1].question_groups.push(text_group(100, 2));
        doc.reading[1].question_groups.push(text_group(200, 0));
        let slots = build_slots(&doc);
        let steps = build_steps(&doc);

        let parts: Vec<&Part> = doc.reading.iter().chain(&doc.listening).collect();
        for (step, part) in steps.iter().zip(parts) {
            let expected: Vec<u32> = part
                .question_groups
                .iter()
                .flat_map(|g| &g.questions)
                .map(|q| q.q_number)
                .collect();
            let range = step.slots.clone().unwrap();
            let actual: Vec<u32> = slots[range].iter().map(|s| s.q_number).collect();
            assert_eq!(actual, expected, "step {}", step.label);
        }
    }

    #[test]
    fn writing_steps_are_appended_without_ranges() {
        let doc = document(&[2], &[3], 2);
        let steps = build_steps(&doc);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].label, "Passage 1");
        assert_eq!(steps[1].label, "Section 1");
        assert!(steps[2].is_writing() && steps[3].is_writing());
        assert_eq!(steps[3].label, "Task 2");
        assert_eq!(steps[3].item, 1);
        assert!(steps[2..].iter().all(|s| s.slots.is_none() && s.slot_count() == 0));
    }

    #[test]
    fn empty_document_yields_nothing() {
        let doc = document(&[], &[], 0);
        assert!(build_slots(&doc).is_empty());
        assert!(build_steps(&doc).is_empty());
        assert!(answer_key(&doc).is_empty());
    }

    #[test]
    fn group_context_is_merged_into_slots() {
        let mut group = text_group(1, 2);
        group.kind = QuestionKind::MatchingHeadings;
        group.headings = crate::fixtures::candidates(&[("i", "Origins"), ("ii", "Decline")]);
        group.options = crate::fixtures::candidates(&[("A", "pool")]);
        group.questions[1].options = crate::fixtures::candidates(&[("B", "own")]);
        let mut doc = document(&[], &[], 0);
        doc.reading.push(part("p1", vec![group]));

        let slots = build_slots(&doc);
        assert_eq!(slots[0].kind, QuestionKind::MatchingHeadings);
        assert_eq!(slots[0].headings.len(), 2);
        assert_eq!(slots[0].options[0].id, "A");
        assert_eq!(slots[1].options[0].id, "B");
        assert_eq!(slots[0].resolve(" II ").map(|c| c.text.as_str()), Some("Decline"));
        assert!(slots[0].resolve("x").is_none());
    }

    #[test]
    fn answer_key_is_index_aligned() {
        let doc = document(&[2], &[1], 1);
        let slots = build_slots(&doc);
        let key = answer_key(&doc);
        assert_eq!(key.len(), slots.len());
        for (slot, answers) in slots.iter().zip(&key) {
            assert_eq!(answers, &vec![format!("answer{}", slot.q_number)]);
        }
    }

    #[test]
    fn locates_step_for_slot() {
        let steps = build_steps(&document(&[10, 15], &[15], 1));
        assert_eq!(step_for_slot(&steps, 0), Some(0));
        assert_eq!(step_for_slot(&steps, 10), Some(1));
        assert_eq!(step_for_slot(&steps, 39), Some(2));
        assert_eq!(step_for_slot(&steps, 40), None);
    }
}
