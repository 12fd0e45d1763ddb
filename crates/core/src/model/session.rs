use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::bank::QuestionBank;
use crate::model::ids::QuestionId;
use crate::model::question::OptionIndex;
use crate::model::roll::RollNumber;
use crate::time::remaining_seconds;

/// Fixed length of one sitting.
pub const EXAM_DURATION_SECS: i64 = 3 * 60 * 60;

#[must_use]
pub fn exam_duration() -> Duration {
    Duration::seconds(EXAM_DURATION_SECS)
}

//
// ─── QUESTION STATUS ───────────────────────────────────────────────────────────
//

/// Palette status of a single question. A question may be answered and
/// marked for review at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Unanswered,
    Answered,
    Marked,
    AnsweredAndMarked,
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// The sole mutable entity of a sitting: chosen answers, review flags, the
/// question on display, and the fixed deadline.
///
/// `deadline` is set once at session start and reloaded verbatim on restore;
/// remaining time is always derived from it against the wall clock, never
/// stored as an independent counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    roll: RollNumber,
    answers: BTreeMap<QuestionId, OptionIndex>,
    marked: BTreeSet<QuestionId>,
    current_index: usize,
    deadline: DateTime<Utc>,
}

impl SessionState {
    /// Fresh state for a first visit; the deadline is fixed here and never
    /// pushed forward afterwards.
    #[must_use]
    pub fn begin(roll: RollNumber, deadline: DateTime<Utc>) -> Self {
        Self {
            roll,
            answers: BTreeMap::new(),
            marked: BTreeSet::new(),
            current_index: 0,
            deadline,
        }
    }

    /// Rehydrates persisted state, repairing invariants against the bank:
    /// answers and marks referencing unknown question ids are pruned, and
    /// `current_index` is clamped into range. The persisted deadline is kept
    /// as-is.
    #[must_use]
    pub fn restore(
        roll: RollNumber,
        answers: BTreeMap<QuestionId, OptionIndex>,
        marked: BTreeSet<QuestionId>,
        current_index: usize,
        deadline: DateTime<Utc>,
        bank: &QuestionBank,
    ) -> Self {
        let answers = answers
            .into_iter()
            .filter(|(id, _)| bank.contains(*id))
            .collect();
        let marked = marked.into_iter().filter(|id| bank.contains(*id)).collect();
        let current_index = current_index.min(bank.len().saturating_sub(1));

        Self {
            roll,
            answers,
            marked,
            current_index,
            deadline,
        }
    }

    // Accessors
    #[must_use]
    pub fn roll(&self) -> &RollNumber {
        &self.roll
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, OptionIndex> {
        &self.answers
    }

    #[must_use]
    pub fn marked(&self) -> &BTreeSet<QuestionId> {
        &self.marked
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    #[must_use]
    pub fn answer(&self, id: QuestionId) -> Option<OptionIndex> {
        self.answers.get(&id).copied()
    }

    #[must_use]
    pub fn is_marked(&self, id: QuestionId) -> bool {
        self.marked.contains(&id)
    }

    #[must_use]
    pub fn status(&self, id: QuestionId) -> QuestionStatus {
        match (self.answers.contains_key(&id), self.marked.contains(&id)) {
            (true, true) => QuestionStatus::AnsweredAndMarked,
            (true, false) => QuestionStatus::Answered,
            (false, true) => QuestionStatus::Marked,
            (false, false) => QuestionStatus::Unanswered,
        }
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Derived countdown: `floor((deadline - now) / 1s)`, clamped at zero.
    #[must_use]
    pub fn time_left_seconds(&self, now: DateTime<Utc>) -> i64 {
        remaining_seconds(self.deadline, now)
    }

    // Mutators. Policy checks (expiry, placeholder rejection) live in the
    // session engine; callers must have validated the question id.
    pub fn set_answer(&mut self, id: QuestionId, option: OptionIndex) {
        self.answers.insert(id, option);
    }

    /// Flips the review flag; returns the new membership.
    pub fn toggle_mark(&mut self, id: QuestionId) -> bool {
        if self.marked.remove(&id) {
            false
        } else {
            self.marked.insert(id);
            true
        }
    }

    pub fn set_current_index(&mut self, index: usize) {
        self.current_index = index;
    }
}

//
// ─── SUBMISSION SUMMARY ────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionSummaryError {
    #[error("answered ({answered}) + unanswered ({unanswered}) does not match bank size ({total})")]
    CountMismatch {
        answered: u32,
        unanswered: u32,
        total: u32,
    },

    #[error("too many questions for a single paper: {len}")]
    TooManyQuestions { len: usize },
}

/// Auditable result of an explicit submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSummary {
    roll: RollNumber,
    answered: u32,
    marked: u32,
    unanswered: u32,
    submitted_at: DateTime<Utc>,
}

impl SubmissionSummary {
    /// Assemble a summary from raw counts.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionSummaryError::CountMismatch` if the answered and
    /// unanswered counts do not add up to the bank size.
    pub fn from_parts(
        roll: RollNumber,
        answered: u32,
        marked: u32,
        unanswered: u32,
        total: u32,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, SubmissionSummaryError> {
        if answered + unanswered != total {
            return Err(SubmissionSummaryError::CountMismatch {
                answered,
                unanswered,
                total,
            });
        }

        Ok(Self {
            roll,
            answered,
            marked,
            unanswered,
            submitted_at,
        })
    }

    /// Build the summary for a session over the given bank.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionSummaryError::TooManyQuestions` if the bank size
    /// cannot fit in `u32`.
    pub fn from_state(
        state: &SessionState,
        bank: &QuestionBank,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, SubmissionSummaryError> {
        let total = u32::try_from(bank.len())
            .map_err(|_| SubmissionSummaryError::TooManyQuestions { len: bank.len() })?;
        let answered = u32::try_from(state.answered_count())
            .map_err(|_| SubmissionSummaryError::TooManyQuestions { len: bank.len() })?;
        let marked = u32::try_from(state.marked_count())
            .map_err(|_| SubmissionSummaryError::TooManyQuestions { len: bank.len() })?;

        Self::from_parts(
            state.roll().clone(),
            answered,
            marked,
            total - answered,
            total,
            submitted_at,
        )
    }

    #[must_use]
    pub fn roll(&self) -> &RollNumber {
        &self.roll
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn marked(&self) -> u32 {
        self.marked
    }

    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.unanswered
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.answered + self.unanswered
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
