//! Opaque identity of an authenticated caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest owner identifier accepted.
const MAX_OWNER_ID_LEN: usize = 128;

/// Identifier of the account that owns a record.
///
/// Owner ids are opaque: the crate never interprets them beyond equality.
///
/// # Examples
///
/// ```
/// use mapvault_core::OwnerId;
///
/// # fn main() -> Result<(), mapvault_core::OwnerIdError> {
/// let owner = OwnerId::new("alice")?;
/// assert_eq!(owner.as_str(), "alice");
/// assert!(OwnerId::new("  ").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

/// Errors returned by [`OwnerId::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnerIdError {
    /// The identifier was empty or whitespace.
    #[error("owner id must not be blank")]
    Blank,
    /// The identifier exceeded the length ceiling.
    #[error("owner id exceeds {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The identifier contained control characters.
    #[error("owner id must not contain control characters")]
    ControlCharacter,
}

impl OwnerId {
    /// Validates and constructs an [`OwnerId`].
    pub fn new(raw: impl Into<String>) -> Result<Self, OwnerIdError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(OwnerIdError::Blank);
        }
        if raw.chars().count() > MAX_OWNER_ID_LEN {
            return Err(OwnerIdError::TooLong {
                max: MAX_OWNER_ID_LEN,
            });
        }
        if raw.chars().any(char::is_control) {
            return Err(OwnerIdError::ControlCharacter);
        }
        Ok(Self(raw))
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = OwnerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OwnerId> for String {
    fn from(owner: OwnerId) -> Self {
        owner.0
    }
}
