//! In-process substrate
//!
//! `MemorySubstrate` keeps files in a map behind a `parking_lot::Mutex` and
//! enforces the same compare-and-swap contract as a forge: revision tokens
//! are the SHA-256 of the content, and a push whose precondition does not
//! hold is rejected with `Conflict`.
//!
//! Writes never need credentials.

use crate::substrate::{Change, Substrate};
use async_trait::async_trait;
use parking_lot::Mutex;
use repotable_core::{Blob, Commit, Error, Location, Options, Precondition, Result, RevisionToken};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

/// Files held in memory, keyed by location (without record identifier)
#[derive(Debug, Default)]
pub struct MemorySubstrate {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    files: HashMap<Location, Blob>,
    pushes: usize,
}

/// Content-hash revision token
pub fn content_token(content: &str) -> RevisionToken {
    let digest = Sha256::digest(content.as_bytes());
    RevisionToken::new(digest.iter().map(|b| format!("{:02x}", b)).collect::<String>())
}

impl MemorySubstrate {
    /// Empty substrate
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file directly, bypassing preconditions. Returns its token.
    pub fn insert(&self, location: &Location, content: impl Into<String>) -> RevisionToken {
        let content = content.into();
        let revision = content_token(&content);
        self.state.lock().files.insert(
            location.without_resource(),
            Blob {
                content,
                revision: revision.clone(),
            },
        );
        revision
    }

    /// Stored text, if the file exists
    pub fn content(&self, location: &Location) -> Option<String> {
        self.state
            .lock()
            .files
            .get(&location.without_resource())
            .map(|blob| blob.content.clone())
    }

    /// Number of accepted pushes so far
    pub fn push_count(&self) -> usize {
        self.state.lock().pushes
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.state.lock().files.len()
    }

    /// True if no files are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn conflict(location: &Location, reason: &str) -> Error {
    Error::Conflict {
        status: 409,
        reason: format!("{}: {}", location, reason),
    }
}

#[async_trait]
impl Substrate for MemorySubstrate {
    async fn pull(&self, location: &Location, _options: &Options) -> Result<Option<Blob>> {
        Ok(self.state.lock().files.get(&location.without_resource()).cloned())
    }

    async fn push(
        &self,
        location: &Location,
        _options: &Options,
        change: Change,
        precondition: Precondition,
    ) -> Result<Commit> {
        let key = location.without_resource();
        let mut state = self.state.lock();
        let current = state.files.get(&key).map(|blob| &blob.revision);

        let verdict = match (&precondition, current) {
            (Precondition::Absent, Some(_)) => Err(conflict(location, "file already exists")),
            (Precondition::Matches(_), None) => Err(conflict(location, "file no longer exists")),
            (Precondition::Matches(expected), Some(actual)) if expected != actual => {
                Err(conflict(location, "revision does not match"))
            }
            _ => Ok(current.is_some()),
        };
        let existed = match verdict {
            Ok(existed) => existed,
            Err(e) => {
                debug!(target: "repotable::memory", %location, change = change.verb(), "push rejected");
                return Err(e);
            }
        };

        let commit = match change {
            Change::Put(content) => {
                let revision = content_token(&content);
                state.files.insert(
                    key,
                    Blob {
                        content,
                        revision: revision.clone(),
                    },
                );
                Commit {
                    status: if existed { 200 } else { 201 },
                    revision: Some(revision),
                }
            }
            Change::Delete => {
                if !existed {
                    return Err(Error::NotFound {
                        location: location.to_string(),
                    });
                }
                state.files.remove(&key);
                Commit {
                    status: 200,
                    revision: None,
                }
            }
        };
        state.pushes += 1;
        debug!(target: "repotable::memory", %location, status = commit.status, "push accepted");
        Ok(commit)
    }

    fn requires_credentials(&self) -> bool {
        false
    }
}
