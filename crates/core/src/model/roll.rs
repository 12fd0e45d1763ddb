use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RollError {
    #[error("roll number cannot be empty")]
    Empty,
}

/// A candidate's roll number, trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RollNumber(String);

impl RollNumber {
    /// Creates a validated roll number.
    ///
    /// # Errors
    ///
    /// Returns `RollError::Empty` if the input is empty or whitespace-only.
    pub fn new(raw: impl Into<String>) -> Result<Self, RollError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RollError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RollNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RollNumber {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_number_trims_input() {
        let roll = RollNumber::new("  ROLL001  ").unwrap();
        assert_eq!(roll.as_str(), "ROLL001");
    }

    #[test]
    fn roll_number_rejects_blank() {
        assert_eq!(RollNumber::new("   ").unwrap_err(), RollError::Empty);
        assert_eq!(RollNumber::new("").unwrap_err(), RollError::Empty);
    }
}
