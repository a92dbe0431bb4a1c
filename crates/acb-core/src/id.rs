//! Document identifiers.
//!
//! Identifiers are 24-character hexadecimal tokens: 4 bytes of
//! big-endian UNIX seconds followed by 8 random bytes. Stored records
//! created by other writers use the same width, so only the syntax is
//! checked on input.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of a document identifier in hex characters.
pub const DOC_ID_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid document identifier: '{0}'")]
pub struct InvalidDocId(pub String);

/// Identifier of a record in any collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocId(String);

impl DocId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let secs = Utc::now().timestamp().clamp(0, i64::from(u32::MAX)) as u32;
        let random = Uuid::new_v4();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..].copy_from_slice(&random.as_bytes()[..8]);

        let hex = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    /// Parse an identifier, accepting either hex case.
    ///
    /// The stored form is lowercase, so a canonical input comes back
    /// unchanged.
    pub fn parse(raw: &str) -> Result<Self, InvalidDocId> {
        if Self::is_valid(raw) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(InvalidDocId(raw.to_owned()))
        }
    }

    /// Syntactic check only; says nothing about whether a record exists.
    pub fn is_valid(raw: &str) -> bool {
        raw.len() == DOC_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocId {
    type Err = InvalidDocId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocId {
    type Error = InvalidDocId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocId> for String {
    fn from(id: DocId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
