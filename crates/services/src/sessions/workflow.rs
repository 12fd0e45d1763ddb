use std::sync::Arc;

use chrono::{DateTime, Utc};

use exam_core::Clock;
use exam_core::model::{OptionIndex, QuestionBank, QuestionId, RollNumber, SubmissionSummary};
use storage::repository::{SessionRecord, SessionStore, StorageError};

use crate::error::SessionError;
use crate::ticker::{TICK_PERIOD, Tick, Ticker};

use super::engine::{ExamPhase, ExamSession, SelectOutcome, TickStatus};

/// Orchestrates login, persisted mutation, and submission.
///
/// Owns the clock and the session store; the whole `SessionState` is written
/// as one record after every mutating event, so a crash between events can
/// never split answers from their deadline.
#[derive(Clone)]
pub struct ExamLoopService {
    clock: Clock,
    bank: Arc<QuestionBank>,
    sessions: Arc<dyn SessionStore>,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(clock: Clock, bank: Arc<QuestionBank>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            clock,
            bank,
            sessions,
        }
    }

    #[must_use]
    pub fn bank(&self) -> &Arc<QuestionBank> {
        &self.bank
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Restore-or-begin: reload the persisted sitting for this roll if one
    /// exists (deadline kept, not reset), otherwise fix a fresh deadline and
    /// persist it immediately. A record that cannot be decoded falls back to
    /// a fresh session instead of failing the login.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` for storage failures other than
    /// corruption.
    pub async fn login(&self, roll: RollNumber) -> Result<ExamSession, SessionError> {
        let now = self.clock.now();

        let record = match self.sessions.load(roll.as_str()).await {
            Ok(record) => record,
            Err(StorageError::Serialization(err)) => {
                tracing::warn!(roll = %roll, error = %err, "persisted session is corrupt; starting fresh");
                None
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(record) = record {
            match record.into_state(&self.bank) {
                Ok(state) => {
                    tracing::info!(
                        roll = %roll,
                        deadline = %state.deadline(),
                        "restored persisted exam session"
                    );
                    return Ok(ExamSession::restore(Arc::clone(&self.bank), state, now));
                }
                Err(err) => {
                    tracing::warn!(roll = %roll, error = %err, "persisted session is corrupt; starting fresh");
                }
            }
        }

        let session = ExamSession::begin(Arc::clone(&self.bank), roll, now);
        self.persist(&session).await?;
        tracing::info!(roll = %session.roll(), deadline = %session.state().deadline(), "started fresh exam session");
        Ok(session)
    }

    async fn persist(&self, session: &ExamSession) -> Result<(), SessionError> {
        let record = SessionRecord::from_state(session.state(), self.clock.now());
        self.sessions.save(&record).await?;
        Ok(())
    }

    /// Record an answer and persist on success.
    ///
    /// # Errors
    ///
    /// Propagates engine and storage errors; rejections are `Ok` outcomes.
    pub async fn select_option(
        &self,
        session: &mut ExamSession,
        id: QuestionId,
        option: OptionIndex,
    ) -> Result<SelectOutcome, SessionError> {
        let outcome = session.select_option(id, option, self.clock.now())?;
        if outcome == SelectOutcome::Recorded {
            self.persist(session).await?;
        }
        Ok(outcome)
    }

    /// Flip a review flag and persist.
    ///
    /// # Errors
    ///
    /// Propagates engine and storage errors.
    pub async fn toggle_review(
        &self,
        session: &mut ExamSession,
        id: QuestionId,
    ) -> Result<bool, SessionError> {
        let marked = session.toggle_review(id)?;
        self.persist(session).await?;
        Ok(marked)
    }

    /// Move the displayed question; persists only when the index changed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on persistence failures.
    pub async fn navigate(
        &self,
        session: &mut ExamSession,
        index: usize,
    ) -> Result<bool, SessionError> {
        let moved = session.navigate(index);
        if moved {
            self.persist(session).await?;
        }
        Ok(moved)
    }

    /// Start the countdown ticker for an in-progress session.
    #[must_use]
    pub fn start_ticker(&self) -> (Ticker, tokio::sync::mpsc::Receiver<Tick>) {
        Ticker::spawn(TICK_PERIOD)
    }

    /// Advance the countdown. The ticker is stopped as soon as the session
    /// leaves `InProgress` so no callback outlives the state machine.
    pub fn handle_tick(&self, session: &mut ExamSession, ticker: &mut Option<Ticker>) -> TickStatus {
        let status = session.tick(self.clock.now());
        if status.phase != ExamPhase::InProgress {
            if let Some(active) = ticker.take() {
                active.stop();
                tracing::debug!(roll = %session.roll(), "countdown ticker stopped");
            }
        }
        status
    }

    /// Terminal submission: compute the summary, clear the persisted record,
    /// and stop the ticker. Idempotent; repeat calls return the same summary.
    ///
    /// # Errors
    ///
    /// Propagates summary and storage errors.
    pub async fn submit(
        &self,
        session: &mut ExamSession,
        ticker: &mut Option<Ticker>,
    ) -> Result<SubmissionSummary, SessionError> {
        let already_submitted = session.is_submitted();
        let summary = session.submit(self.clock.now())?;

        if let Some(active) = ticker.take() {
            active.stop();
        }

        if !already_submitted {
            self.sessions.clear(session.roll().as_str()).await?;
            tracing::info!(
                roll = %summary.roll(),
                answered = summary.answered(),
                marked = summary.marked(),
                unanswered = summary.unanswered(),
                "exam submitted"
            );
        }

        Ok(summary)
    }

    /// Explicit logout: drop the persisted record and stop the ticker. The
    /// sitting can no longer be resumed afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on storage failures.
    pub async fn logout(
        &self,
        session: &ExamSession,
        ticker: &mut Option<Ticker>,
    ) -> Result<(), SessionError> {
        if let Some(active) = ticker.take() {
            active.stop();
        }
        self.sessions.clear(session.roll().as_str()).await?;
        tracing::info!(roll = %session.roll(), "logged out; persisted session cleared");
        Ok(())
    }
}
