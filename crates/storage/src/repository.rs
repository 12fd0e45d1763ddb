use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{OptionIndex, QuestionBank, QuestionId, RollNumber, SessionState};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a session.
///
/// This mirrors the domain `SessionState` so repositories can
/// serialize/deserialize without leaking storage concerns into the domain
/// layer. A record is always written and read as one unit; a crash can never
/// leave answers on disk without the deadline they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub roll: String,
    pub answers: BTreeMap<QuestionId, OptionIndex>,
    pub marked: BTreeSet<QuestionId>,
    pub current_index: usize,
    pub deadline: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl SessionRecord {
    #[must_use]
    pub fn from_state(state: &SessionState, saved_at: DateTime<Utc>) -> Self {
        Self {
            roll: state.roll().as_str().to_owned(),
            answers: state.answers().clone(),
            marked: state.marked().clone(),
            current_index: state.current_index(),
            deadline: state.deadline(),
            saved_at,
        }
    }

    /// Convert the record back into domain `SessionState`.
    ///
    /// Unknown question ids are pruned and the current index clamped by the
    /// domain restore path; an unusable roll is the one shape this cannot
    /// repair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the persisted roll is empty.
    pub fn into_state(self, bank: &QuestionBank) -> Result<SessionState, StorageError> {
        let roll = RollNumber::new(self.roll)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(SessionState::restore(
            roll,
            self.answers,
            self.marked,
            self.current_index,
            self.deadline,
            bank,
        ))
    }
}

/// Repository contract for persisted exam sessions, keyed by roll number.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the persisted session for a roll, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for an undecodable record, or
    /// other storage errors.
    async fn load(&self, roll: &str) -> Result<Option<SessionRecord>, StorageError>;

    /// Persist or overwrite the session record as one unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn save(&self, record: &SessionRecord) -> Result<(), StorageError>;

    /// Remove the persisted session for a roll. Removing an absent record is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn clear(&self, roll: &str) -> Result<(), StorageError>;
}

/// Repository contract for the login allow-list.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// True if the roll number is allowed to sit the exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn contains(&self, roll: &str) -> Result<bool, StorageError>;

    /// Replace the entire allow-list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn replace_all(&self, rolls: &[String]) -> Result<(), StorageError>;

    /// Number of rolls on the roster.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn len(&self) -> Result<usize, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<String, SessionRecord>>>,
    roster: Arc<Mutex<BTreeSet<String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            roster: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }
}

#[async_trait]
impl SessionStore for InMemoryRepository {
    async fn load(&self, roll: &str) -> Result<Option<SessionRecord>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(roll).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.roll.clone(), record.clone());
        Ok(())
    }

    async fn clear(&self, roll: &str) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(roll);
        Ok(())
    }
}

#[async_trait]
impl RosterStore for InMemoryRepository {
    async fn contains(&self, roll: &str) -> Result<bool, StorageError> {
        let guard = self
            .roster
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.contains(roll))
    }

    async fn replace_all(&self, rolls: &[String]) -> Result<(), StorageError> {
        let mut guard = self
            .roster
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clear();
        guard.extend(rolls.iter().cloned());
        Ok(())
    }

    async fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .roster
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

/// Aggregates session and roster repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionStore>,
    pub roster: Arc<dyn RosterStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionStore> = Arc::new(repo.clone());
        let roster: Arc<dyn RosterStore> = Arc::new(repo);
        Self { sessions, roster }
    }
}
