use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Every question carries exactly this many option slots.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("option index {index} is out of range (0..{OPTION_COUNT})")]
    OptionOutOfRange { index: u8 },

    #[error("unknown subject: {raw}")]
    UnknownSubject { raw: String },
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// Subject category a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Physics,
    Chemistry,
    Biology,
}

impl Subject {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Biology => "Biology",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "physics" => Ok(Subject::Physics),
            "chemistry" => Ok(Subject::Chemistry),
            "biology" => Ok(Subject::Biology),
            _ => Err(QuestionError::UnknownSubject { raw: s.to_owned() }),
        }
    }
}

//
// ─── OPTION INDEX ──────────────────────────────────────────────────────────────
//

/// Zero-based index of a selected option, always within `0..OPTION_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionIndex(u8);

impl OptionIndex {
    /// Creates an `OptionIndex`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::OptionOutOfRange` if `raw >= OPTION_COUNT`.
    pub fn new(raw: u8) -> Result<Self, QuestionError> {
        if usize::from(raw) >= OPTION_COUNT {
            return Err(QuestionError::OptionOutOfRange { index: raw });
        }
        Ok(Self(raw))
    }

    /// Returns the underlying zero-based index
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn as_usize(&self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── QUESTION RECORD ───────────────────────────────────────────────────────────
//

/// One question in the bank: prompt text plus exactly four option strings.
///
/// An empty prompt marks a placeholder slot; an empty option string marks an
/// unavailable choice. Records are immutable once the bank is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    id: QuestionId,
    subject: Subject,
    prompt: String,
    options: [String; OPTION_COUNT],
}

impl QuestionRecord {
    #[must_use]
    pub fn new(
        id: QuestionId,
        subject: Subject,
        prompt: impl Into<String>,
        options: [String; OPTION_COUNT],
    ) -> Self {
        Self {
            id,
            subject,
            prompt: prompt.into(),
            options,
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    /// True for unfilled slots: there is nothing to answer.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.prompt.trim().is_empty()
    }

    /// Returns the option text, or `None` when the slot is unavailable.
    #[must_use]
    pub fn option(&self, index: OptionIndex) -> Option<&str> {
        let text = self.options[index.as_usize()].trim();
        if text.is_empty() { None } else { Some(text) }
    }

    #[must_use]
    pub fn option_available(&self, index: OptionIndex) -> bool {
        self.option(index).is_some()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
