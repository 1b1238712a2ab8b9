//! In-progress answers, index-aligned with the slot list.

use std::collections::BTreeSet;

use crate::error::SessionError;
use crate::session::SessionPhase;

/// Answer vectors for one session.
///
/// The slot vector and the writing vector are sized once and never resized.
/// Once frozen, every write is rejected.
#[derive(Debug, Clone)]
pub struct AnswerStore {
    answers: Vec<String>,
    writing: Vec<String>,
    /// Multiple-choice scratch marks, per slot. Not part of the submission.
    eliminated: Vec<BTreeSet<String>>,
    frozen: Option<SessionPhase>,
}

impl AnswerStore {
    pub fn new(slot_count: usize, writing_count: usize) -> Self {
        Self {
            answers: vec![String::new(); slot_count],
            writing: vec![String::new(); writing_count],
            eliminated: vec![BTreeSet::new(); slot_count],
            frozen: None,
        }
    }

    /// Replace the answer at `index`.
    pub fn set_answer(&mut self, index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let len = self.answers.len();
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(SessionError::AnswerIndexOutOfRange { index, len })?;
        *slot = value.into();
        Ok(())
    }

    /// Replace the essay for writing task `task`.
    pub fn set_writing_answer(
        &mut self,
        task: usize,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let len = self.writing.len();
        let essay = self
            .writing
            .get_mut(task)
            .ok_or(SessionError::WritingIndexOutOfRange { index: task, len })?;
        *essay = value.into();
        Ok(())
    }

    /// Flip the eliminated mark for `option` on slot `index`; returns the new state.
    pub fn toggle_eliminated(&mut self, index: usize, option: &str) -> Result<bool, SessionError> {
        self.ensure_writable()?;
        let len = self.eliminated.len();
        let marks = self
            .eliminated
            .get_mut(index)
            .ok_or(SessionError::AnswerIndexOutOfRange { index, len })?;
        if marks.remove(option) {
            Ok(false)
        } else {
            marks.insert(option.to_string());
            Ok(true)
        }
    }

    pub fn is_eliminated(&self, index: usize, option: &str) -> bool {
        self.eliminated
            .get(index)
            .is_some_and(|marks| marks.contains(option))
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn writing(&self) -> &[String] {
        &self.writing
    }

    /// Number of slots with a non-blank answer.
    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| !a.trim().is_empty()).count()
    }

    /// Stop accepting writes and drop the scratch marks.
    pub fn freeze(&mut self, phase: SessionPhase) {
        self.frozen = Some(phase);
        self.eliminated.iter_mut().for_each(BTreeSet::clear);
    }

    pub fn thaw(&mut self) {
        self.frozen = None;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    fn ensure_writable(&self) -> Result<(), SessionError> {
        match self.frozen {
            Some(phase) => Err(SessionError::AnswersFrozen(phase)),
            None => Ok(()),
        }
    }
}
