use thiserror::Error;

use crate::model::{BankError, QuestionError, RollError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Roll(#[from] RollError),
}
