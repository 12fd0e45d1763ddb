use std::sync::Arc;

use exam_core::model::RollNumber;
use storage::repository::RosterStore;

use crate::error::AuthError;

/// Stateless allow-list check: a roll number may sit the exam iff it is
/// non-empty and present on the configured roster. Carries no session data.
#[derive(Clone)]
pub struct AuthService {
    roster: Arc<dyn RosterStore>,
}

impl AuthService {
    #[must_use]
    pub fn new(roster: Arc<dyn RosterStore>) -> Self {
        Self { roster }
    }

    /// Validate and authorize a raw roll identifier.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRoll` for an empty identifier,
    /// `AuthError::NotOnRoster` for an unknown one, and
    /// `AuthError::Storage` on roster lookup failures.
    pub async fn authenticate(&self, raw: &str) -> Result<RollNumber, AuthError> {
        let roll = RollNumber::new(raw)?;
        if self.roster.contains(roll.as_str()).await? {
            Ok(roll)
        } else {
            Err(AuthError::NotOnRoster)
        }
    }
}
