//! Content fingerprints for emoji tables.
//!
//! A fingerprint is the lowercase hex SHA-256 of the canonical string
//! `id1=text1;id2=text2;...` built from entries sorted by ascending id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::Entry;

/// Length of a hex-encoded SHA-256 digest.
const HEX_LEN: usize = 64;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("Invalid fingerprint length: expected 64 hex chars, got {0}")]
    InvalidLength(usize),

    #[error("Invalid fingerprint encoding: {0}")]
    InvalidEncoding(String),
}

/// Deterministic digest of a table's `(id, text)` content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a set of entries. Input order does not matter.
    pub fn of_entries(entries: &[Entry]) -> Self {
        let mut sorted: Vec<&Entry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.id);
        Self::of_sorted(sorted.into_iter())
    }

    /// Fingerprint entries that are already sorted by id.
    pub fn of_sorted<'a>(entries: impl Iterator<Item = &'a Entry>) -> Self {
        let mut hasher = Sha256::new();
        for (i, entry) in entries.enumerate() {
            if i > 0 {
                hasher.update(b";");
            }
            hasher.update(entry.id.to_string().as_bytes());
            hasher.update(b"=");
            hasher.update(entry.text.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HEX_LEN {
            return Err(FingerprintError::InvalidLength(s.len()));
        }
        hex::decode(s).map_err(|e| FingerprintError::InvalidEncoding(e.to_string()))?;
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = FingerprintError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}
