//! Revision tokens and substrate exchange types
//!
//! A [`RevisionToken`] is the opaque identifier of the exact stored version of
//! a blob (a content hash on GitHub, the last commit id on GitLab). It is
//! captured on every pull and handed back on the next push so that the
//! substrate can reject stale writes. The core never interprets it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version identifier of a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    /// Wrap a substrate-issued token
    pub fn new(token: impl Into<String>) -> Self {
        RevisionToken(token.into())
    }

    /// The raw token text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current content of a stored file together with its revision token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    /// Decoded file text
    pub content: String,
    /// Token identifying this exact version
    pub revision: RevisionToken,
}

/// Guard attached to a push
///
/// The substrate enforces it; a push whose guard does not hold must fail
/// with [`Error::Conflict`](crate::Error::Conflict).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The file must not exist yet (first write of an append)
    Absent,
    /// The stored revision must still equal this token
    Matches(RevisionToken),
    /// Create or replace whatever is there
    Unconditional,
}

impl Precondition {
    /// Guard for a write based on a pulled revision, or on "no file"
    pub fn from_revision(revision: Option<RevisionToken>) -> Self {
        match revision {
            Some(token) => Precondition::Matches(token),
            None => Precondition::Absent,
        }
    }

    /// The token carried by the guard, if any
    pub fn token(&self) -> Option<&RevisionToken> {
        match self {
            Precondition::Matches(token) => Some(token),
            _ => None,
        }
    }
}

/// Acknowledgement of an accepted push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Substrate status code (200, 201, ...)
    pub status: u16,
    /// Revision of the file after the push, when the substrate reports it.
    /// Absent after a delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionToken>,
}
