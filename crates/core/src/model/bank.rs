use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{QuestionRecord, Subject};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank cannot be empty")]
    Empty,

    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),

    #[error("question index {index} is out of range (bank has {len} questions)")]
    IndexOutOfRange { index: usize, len: usize },
}

//
// ─── QUESTION BANK ─────────────────────────────────────────────────────────────
//

/// Ordered, fixed-size, read-only collection of questions.
///
/// Constructed once at startup from static configuration and handed to the
/// session engine as an immutable input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<QuestionRecord>,
}

impl QuestionBank {
    /// Builds a bank from an ordered list of questions.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Empty` for an empty list and
    /// `BankError::DuplicateId` when two records share an identifier.
    pub fn new(questions: Vec<QuestionRecord>) -> Result<Self, BankError> {
        if questions.is_empty() {
            return Err(BankError::Empty);
        }
        let mut seen = BTreeSet::new();
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(BankError::DuplicateId(question.id()));
            }
        }
        Ok(Self { questions })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Fetch a question by its position in the paper.
    ///
    /// # Errors
    ///
    /// Returns `BankError::IndexOutOfRange` for an invalid index; with
    /// UI-level clamping in place this should never fire.
    pub fn get(&self, index: usize) -> Result<&QuestionRecord, BankError> {
        self.questions.get(index).ok_or(BankError::IndexOutOfRange {
            index,
            len: self.questions.len(),
        })
    }

    #[must_use]
    pub fn by_id(&self, id: QuestionId) -> Option<&QuestionRecord> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.by_id(id).is_some()
    }

    /// Position of the given question in the paper order.
    #[must_use]
    pub fn position_of(&self, id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id() == id)
    }

    /// First position whose question belongs to `subject`.
    #[must_use]
    pub fn find_first_by_subject(&self, subject: Subject) -> Option<usize> {
        self.questions.iter().position(|q| q.subject() == subject)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.questions.iter()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
