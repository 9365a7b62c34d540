//! Domain identifier types with validation
//!
//! Newtype wrappers for document identifiers and sequence names. Each type
//! checks its format on construction so an invalid id never reaches a store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Document identifier newtype wrapper
///
/// Every persisted document carries one of these. The format is 24 lowercase
/// hex characters: a 4-byte big-endian creation timestamp followed by 8 random
/// bytes, so ids sort roughly by creation time.
///
/// # Examples
///
/// ```
/// use credo::domain::ids::DocumentId;
/// use std::str::FromStr;
///
/// let id = DocumentId::from_str("65f1c2a4b7e3d90012ab34cd").unwrap();
/// assert_eq!(id.as_str(), "65f1c2a4b7e3d90012ab34cd");
/// assert!(DocumentId::new("not-an-id").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Length of the textual form
    pub const LEN: usize = 24;

    /// Creates a DocumentId from its textual form
    ///
    /// # Returns
    ///
    /// Returns `Ok(DocumentId)` for 24 hex characters, `Err` otherwise.
    /// Upper-case input is accepted and folded to lower case.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into().trim().to_ascii_lowercase();
        if id.len() != Self::LEN {
            return Err(format!(
                "Document ID must be {} hex characters, got {}",
                Self::LEN,
                id.len()
            ));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Document ID contains non-hex characters: {id}"));
        }
        Ok(Self(id))
    }

    /// Generates a fresh id from the current time and uuid v4 randomness
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let random = Uuid::new_v4();

        let mut id = format!("{seconds:08x}");
        for byte in &random.as_bytes()[..8] {
            id.push_str(&format!("{byte:02x}"));
        }
        Self(id)
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sequence name newtype wrapper
///
/// Names one monotonically increasing counter, e.g. `user` or `billingAccount`.
/// Names are ASCII letters, digits, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SequenceName(String);

impl SequenceName {
    /// Creates a new SequenceName
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Sequence name cannot be empty".to_string());
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!("Sequence name contains invalid characters: {name}"));
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }

    pub(crate) fn from_static(name: &'static str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for SequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SequenceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SequenceName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SequenceName> for String {
    fn from(name: SequenceName) -> Self {
        name.0
    }
}

impl AsRef<str> for SequenceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
