//! Session names.
//!
//! A session groups every result of one or more scans of the same campaign.
//! Names are caller supplied or generated as a random UUID.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A validated session name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionName(String);

impl SessionName {
    /// Longest accepted name.
    pub const MAX_LEN: usize = 128;

    /// Validate a caller supplied name.
    pub fn new(name: impl Into<String>) -> Result<Self, SessionNameError> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(SessionNameError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(SessionNameError::TooLong(trimmed.len()));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(SessionNameError::ControlCharacter);
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Generate a fresh random name.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Use the given name, or generate one when absent.
    pub fn or_generate(name: Option<&str>) -> Result<Self, SessionNameError> {
        match name {
            Some(name) => Self::new(name),
            None => Ok(Self::generate()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionName {
    type Err = SessionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SessionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error type for session name validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionNameError {
    #[error("session name is empty")]
    Empty,
    #[error("session name is {0} characters long (max: 128)")]
    TooLong(usize),
    #[error("session name contains control characters")]
    ControlCharacter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names_are_unique() {
        let a = SessionName::generate();
        let b = SessionName::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_name_is_trimmed() {
        assert_eq!(SessionName::new("  office ").unwrap().as_str(), "office");
    }

    #[test]
    fn test_rejects_bad_names() {
        assert_eq!(SessionName::new("   "), Err(SessionNameError::Empty));
        assert_eq!(
            SessionName::new("a\nb"),
            Err(SessionNameError::ControlCharacter)
        );
        assert!(matches!(
            SessionName::new("x".repeat(200)),
            Err(SessionNameError::TooLong(200))
        ));
    }

    #[test]
    fn test_or_generate() {
        assert_eq!(
            SessionName::or_generate(Some("lab")).unwrap().as_str(),
            "lab"
        );
        assert!(SessionName::or_generate(None).is_ok());
    }
}
