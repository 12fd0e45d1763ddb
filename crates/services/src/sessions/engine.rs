use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use exam_core::model::{
    OptionIndex, QuestionBank, QuestionId, QuestionRecord, QuestionStatus, RollNumber,
    SessionState, SubmissionSummary, exam_duration,
};

use crate::error::SessionError;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle phase of a sitting. Login is the only way to obtain an
/// `ExamSession`, so the logged-out state needs no representation here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamPhase {
    InProgress,
    TimeExpired,
    Submitted,
}

/// Outcome of a select-option request. Rejections are ordinary outcomes,
/// never panics or errors: the presentation layer turns them into notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Recorded,
    /// The deadline has passed; answers can no longer change.
    RejectedExpired,
    /// The question is an unfilled slot; there is nothing to answer.
    RejectedPlaceholder,
    /// The chosen option slot has no text and cannot be selected.
    RejectedUnavailable,
}

/// Countdown report produced by `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickStatus {
    pub phase: ExamPhase,
    pub time_left_seconds: i64,
    /// True exactly once: on the tick that crossed the deadline.
    pub expired_now: bool,
}

//
// ─── EXAM SESSION ──────────────────────────────────────────────────────────────
//

/// One candidate's sitting: the bank plus all mutable session state.
///
/// All timestamps come in from the services-layer clock to keep time
/// deterministic. The countdown is always derived from the fixed deadline;
/// expiry is detected on ticks and re-checked lazily on every answer attempt,
/// so a stopped ticker cannot extend the exam.
pub struct ExamSession {
    bank: Arc<QuestionBank>,
    state: SessionState,
    phase: ExamPhase,
    summary: Option<SubmissionSummary>,
}

impl ExamSession {
    /// Start a fresh sitting; fixes `deadline = now + 3h`.
    #[must_use]
    pub fn begin(bank: Arc<QuestionBank>, roll: RollNumber, now: DateTime<Utc>) -> Self {
        let state = SessionState::begin(roll, now + exam_duration());
        Self {
            bank,
            state,
            phase: ExamPhase::InProgress,
            summary: None,
        }
    }

    /// Resume a persisted sitting. The stored deadline is kept, never reset:
    /// a reload mid-exam continues with correctly reduced time, and a
    /// deadline already in the past yields `TimeExpired` immediately.
    #[must_use]
    pub fn restore(bank: Arc<QuestionBank>, state: SessionState, now: DateTime<Utc>) -> Self {
        let phase = if state.time_left_seconds(now) == 0 {
            ExamPhase::TimeExpired
        } else {
            ExamPhase::InProgress
        };
        Self {
            bank,
            state,
            phase,
            summary: None,
        }
    }

    // Accessors
    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> ExamPhase {
        self.phase
    }

    #[must_use]
    pub fn roll(&self) -> &RollNumber {
        self.state.roll()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.current_index()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionRecord> {
        self.bank.get(self.state.current_index()).ok()
    }

    #[must_use]
    pub fn question_status(&self, id: QuestionId) -> QuestionStatus {
        self.state.status(id)
    }

    #[must_use]
    pub fn time_left_seconds(&self, now: DateTime<Utc>) -> i64 {
        self.state.time_left_seconds(now)
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.phase == ExamPhase::Submitted
    }

    /// Fires the one-shot `InProgress -> TimeExpired` transition when the
    /// derived countdown hits zero. Returns true only on the call that
    /// performed the transition.
    fn refresh_phase(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase == ExamPhase::InProgress && self.state.time_left_seconds(now) == 0 {
            self.phase = ExamPhase::TimeExpired;
            return true;
        }
        false
    }

    /// Advance the countdown against the wall clock.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickStatus {
        let expired_now = self.refresh_phase(now);
        TickStatus {
            phase: self.phase,
            time_left_seconds: self.state.time_left_seconds(now),
            expired_now,
        }
    }

    /// Record an answer. Idempotent under repeated identical calls.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submitted` after terminal submission and
    /// `SessionError::UnknownQuestion` for an id outside the bank. Expiry,
    /// placeholder and unavailable-option rejections are `Ok` outcomes.
    pub fn select_option(
        &mut self,
        id: QuestionId,
        option: OptionIndex,
        now: DateTime<Utc>,
    ) -> Result<SelectOutcome, SessionError> {
        if self.phase == ExamPhase::Submitted {
            return Err(SessionError::Submitted);
        }
        let (placeholder, available) = {
            let question = self
                .bank
                .by_id(id)
                .ok_or(SessionError::UnknownQuestion(id))?;
            (question.is_placeholder(), question.option_available(option))
        };

        self.refresh_phase(now);
        if self.phase == ExamPhase::TimeExpired {
            return Ok(SelectOutcome::RejectedExpired);
        }
        if placeholder {
            return Ok(SelectOutcome::RejectedPlaceholder);
        }
        if !available {
            return Ok(SelectOutcome::RejectedUnavailable);
        }

        self.state.set_answer(id, option);
        Ok(SelectOutcome::Recorded)
    }

    /// Flip the review flag; its own inverse. Review flags are bookkeeping,
    /// not graded answers, so this stays allowed after expiry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submitted` after terminal submission and
    /// `SessionError::UnknownQuestion` for an id outside the bank.
    pub fn toggle_review(&mut self, id: QuestionId) -> Result<bool, SessionError> {
        if self.phase == ExamPhase::Submitted {
            return Err(SessionError::Submitted);
        }
        if !self.bank.contains(id) {
            return Err(SessionError::UnknownQuestion(id));
        }
        Ok(self.state.toggle_mark(id))
    }

    /// Move the displayed question. Out-of-range indices are a no-op, never a
    /// panic; browsing stays allowed after expiry. Returns whether the index
    /// changed.
    pub fn navigate(&mut self, index: usize) -> bool {
        if self.phase == ExamPhase::Submitted {
            return false;
        }
        if index >= self.bank.len() {
            return false;
        }
        self.state.set_current_index(index);
        true
    }

    /// Terminal submission. Idempotent: the first call computes the summary,
    /// every later call returns the same one without touching state.
    ///
    /// # Errors
    ///
    /// Propagates summary count validation via `SessionError::Summary`.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<SubmissionSummary, SessionError> {
        if let Some(summary) = &self.summary {
            return Ok(summary.clone());
        }
        let summary = SubmissionSummary::from_state(&self.state, &self.bank, now)?;
        self.phase = ExamPhase::Submitted;
        self.summary = Some(summary.clone());
        Ok(summary)
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("roll", &self.state.roll())
            .field("bank_len", &self.bank.len())
            .field("answered", &self.state.answered_count())
            .field("marked", &self.state.marked_count())
            .field("current_index", &self.state.current_index())
            .field("deadline", &self.state.deadline())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{QuestionRecord, Subject};
    use exam_core::time::fixed_now;

    fn question(id: u64, subject: Subject, prompt: &str) -> QuestionRecord {
        QuestionRecord::new(
            QuestionId::new(id),
            subject,
            prompt,
            ["a", "b", "c", "d"].map(str::to_owned),
        )
    }

    fn bank() -> Arc<QuestionBank> {
        Arc::new(
            QuestionBank::new(vec![
                question(1, Subject::Physics, "Q1"),
                question(2, Subject::Chemistry, "Q2"),
                question(3, Subject::Biology, "Q3"),
                question(4, Subject::Biology, ""),
                QuestionRecord::new(
                    QuestionId::new(5),
                    Subject::Physics,
                    "Q5",
                    ["a", "", "c", "d"].map(str::to_owned),
                ),
            ])
            .unwrap(),
        )
    }

    fn roll() -> RollNumber {
        RollNumber::new("ROLL001").unwrap()
    }

    fn opt(raw: u8) -> OptionIndex {
        OptionIndex::new(raw).unwrap()
    }

    fn in_progress() -> ExamSession {
        ExamSession::begin(bank(), roll(), fixed_now())
    }

    #[test]
    fn select_records_answer_and_is_idempotent() {
        let mut session = in_progress();
        let now = fixed_now();

        let outcome = session
            .select_option(QuestionId::new(1), opt(1), now)
            .unwrap();
        assert_eq!(outcome, SelectOutcome::Recorded);
        assert_eq!(session.state().answer(QuestionId::new(1)), Some(opt(1)));

        let outcome = session
            .select_option(QuestionId::new(1), opt(1), now)
            .unwrap();
        assert_eq!(outcome, SelectOutcome::Recorded);
        assert_eq!(session.state().answer(QuestionId::new(1)), Some(opt(1)));
        assert_eq!(session.state().answered_count(), 1);
    }

    #[test]
    fn select_rejects_unknown_question() {
        let mut session = in_progress();
        let err = session
            .select_option(QuestionId::new(42), opt(0), fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownQuestion(_)));
    }

    #[test]
    fn select_rejects_placeholder_and_unavailable_option() {
        let mut session = in_progress();
        let now = fixed_now();

        let outcome = session
            .select_option(QuestionId::new(4), opt(0), now)
            .unwrap();
        assert_eq!(outcome, SelectOutcome::RejectedPlaceholder);

        let outcome = session
            .select_option(QuestionId::new(5), opt(1), now)
            .unwrap();
        assert_eq!(outcome, SelectOutcome::RejectedUnavailable);

        let outcome = session
            .select_option(QuestionId::new(5), opt(0), now)
            .unwrap();
        assert_eq!(outcome, SelectOutcome::Recorded);
        assert_eq!(session.state().answered_count(), 1);
    }

    #[test]
    fn toggle_review_is_its_own_inverse_and_independent_of_answers() {
        let mut session = in_progress();
        let id = QuestionId::new(2);

        assert!(session.toggle_review(id).unwrap());
        assert_eq!(session.question_status(id), QuestionStatus::Marked);
        assert!(!session.toggle_review(id).unwrap());
        assert_eq!(session.question_status(id), QuestionStatus::Unanswered);

        session.select_option(id, opt(2), fixed_now()).unwrap();
        session.toggle_review(id).unwrap();
        assert_eq!(
            session.question_status(id),
            QuestionStatus::AnsweredAndMarked
        );
    }

    #[test]
    fn navigate_clamps_to_bank_range() {
        let mut session = in_progress();

        assert!(session.navigate(3));
        assert_eq!(session.current_index(), 3);

        assert!(!session.navigate(5));
        assert_eq!(session.current_index(), 3);
    }

    #[test]
    fn two_question_walkthrough_matches_expected_state() {
        let bank = Arc::new(
            QuestionBank::new(vec![
                question(1, Subject::Physics, "Q1"),
                question(2, Subject::Chemistry, "Q2"),
            ])
            .unwrap(),
        );
        let mut session = ExamSession::begin(bank, roll(), fixed_now());

        session
            .select_option(QuestionId::new(1), opt(1), fixed_now())
            .unwrap();
        session.toggle_review(QuestionId::new(2)).unwrap();
        session.navigate(1);

        assert_eq!(session.state().answer(QuestionId::new(1)), Some(opt(1)));
        assert!(session.state().is_marked(QuestionId::new(2)));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn countdown_is_monotonic_and_reaches_zero_at_deadline() {
        let mut session = in_progress();
        let start = fixed_now();

        let mut previous = session.tick(start).time_left_seconds;
        assert_eq!(previous, 3 * 60 * 60);
        for minutes in [1, 30, 90, 179, 180, 200] {
            let status = session.tick(start + Duration::minutes(minutes));
            assert!(status.time_left_seconds <= previous);
            assert!(status.time_left_seconds >= 0);
            previous = status.time_left_seconds;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn expiry_transition_fires_exactly_once() {
        let mut session = in_progress();
        let past_deadline = fixed_now() + Duration::hours(4);

        let first = session.tick(past_deadline);
        assert_eq!(first.phase, ExamPhase::TimeExpired);
        assert!(first.expired_now);
        assert_eq!(first.time_left_seconds, 0);

        let second = session.tick(past_deadline + Duration::seconds(1));
        assert_eq!(second.phase, ExamPhase::TimeExpired);
        assert!(!second.expired_now);
    }

    #[test]
    fn expiry_blocks_answers_but_not_review_or_navigation() {
        let mut session = in_progress();
        let late = fixed_now() + Duration::hours(4);

        let outcome = session
            .select_option(QuestionId::new(1), opt(0), late)
            .unwrap();
        assert_eq!(outcome, SelectOutcome::RejectedExpired);
        assert_eq!(session.state().answered_count(), 0);

        assert!(session.toggle_review(QuestionId::new(1)).unwrap());
        assert!(session.navigate(2));
        assert_eq!(session.phase(), ExamPhase::TimeExpired);
    }

    #[test]
    fn expiry_is_detected_without_a_tick() {
        // The ticker is only a trigger; the deadline comparison itself
        // gates every answer attempt.
        let mut session = in_progress();
        let outcome = session
            .select_option(QuestionId::new(1), opt(0), fixed_now() + Duration::hours(3))
            .unwrap();
        assert_eq!(outcome, SelectOutcome::RejectedExpired);
        assert_eq!(session.phase(), ExamPhase::TimeExpired);
    }

    #[test]
    fn restore_with_past_deadline_is_expired_immediately() {
        let state = SessionState::begin(roll(), fixed_now() - Duration::hours(3));
        let session = ExamSession::restore(bank(), state, fixed_now());

        assert_eq!(session.phase(), ExamPhase::TimeExpired);
        assert_eq!(session.time_left_seconds(fixed_now()), 0);
    }

    #[test]
    fn restore_with_future_deadline_keeps_reduced_countdown() {
        let deadline = fixed_now() + Duration::hours(1);
        let state = SessionState::begin(roll(), deadline);
        let session = ExamSession::restore(bank(), state, fixed_now());

        assert_eq!(session.phase(), ExamPhase::InProgress);
        assert_eq!(session.time_left_seconds(fixed_now()), 3600);
        assert_eq!(session.state().deadline(), deadline);
    }

    #[test]
    fn submit_is_terminal_and_idempotent() {
        let mut session = in_progress();
        let now = fixed_now();
        session
            .select_option(QuestionId::new(1), opt(1), now)
            .unwrap();
        session.toggle_review(QuestionId::new(2)).unwrap();

        let first = session.submit(now + Duration::minutes(10)).unwrap();
        assert_eq!(first.answered(), 1);
        assert_eq!(first.marked(), 1);
        assert_eq!(first.unanswered(), 4);
        assert_eq!(session.phase(), ExamPhase::Submitted);

        let second = session.submit(now + Duration::minutes(20)).unwrap();
        assert_eq!(second, first);

        let err = session
            .select_option(QuestionId::new(2), opt(0), now)
            .unwrap_err();
        assert!(matches!(err, SessionError::Submitted));
        assert!(matches!(
            session.toggle_review(QuestionId::new(1)),
            Err(SessionError::Submitted)
        ));
        assert!(!session.navigate(1));
    }

    #[test]
    fn submit_after_expiry_is_allowed() {
        let mut session = in_progress();
        let late = fixed_now() + Duration::hours(4);
        session.tick(late);

        let summary = session.submit(late).unwrap();
        assert_eq!(summary.answered(), 0);
        assert_eq!(summary.unanswered(), 5);
        assert_eq!(session.phase(), ExamPhase::Submitted);
    }
}
