//! Storage substrate contract
//!
//! A substrate stores whole files addressed by [`Location`] and guards every
//! write with a [`Precondition`]. It is the only component that talks to
//! remote state; everything above it works on in-memory records.
//!
//! Implementations must:
//! - return the same [`RevisionToken`](repotable_core::RevisionToken) for
//!   two pulls of an unmodified file
//! - reject a push whose precondition does not hold with
//!   [`Error::Conflict`](repotable_core::Error::Conflict)
//! - never retry on their own

use async_trait::async_trait;
use repotable_core::{Blob, Commit, Error, Location, Options, Precondition, Result};
use std::sync::Arc;

/// What a push does to the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Create or replace the file with this text
    Put(String),
    /// Delete the file
    Delete,
}

impl Change {
    /// Short verb for logs and errors
    pub fn verb(&self) -> &'static str {
        match self {
            Change::Put(_) => "put",
            Change::Delete => "delete",
        }
    }
}

/// Whole-file storage with compare-and-swap writes
#[async_trait]
pub trait Substrate: Send + Sync {
    /// Current content and revision token, or `None` if the file does not
    /// exist.
    async fn pull(&self, location: &Location, options: &Options) -> Result<Option<Blob>>;

    /// Current content for the read path. Fails with `NotFound` if the
    /// file does not exist.
    ///
    /// Substrates with a cheaper read endpoint than `pull` override this.
    async fn fetch(&self, location: &Location, options: &Options) -> Result<String> {
        self.pull(location, options)
            .await?
            .map(|blob| blob.content)
            .ok_or_else(|| Error::NotFound {
                location: location.to_string(),
            })
    }

    /// Apply a change if the precondition holds.
    async fn push(
        &self,
        location: &Location,
        options: &Options,
        change: Change,
        precondition: Precondition,
    ) -> Result<Commit>;

    /// True if writes need credentials in the options
    fn requires_credentials(&self) -> bool {
        true
    }
}

#[async_trait]
impl<S: Substrate + ?Sized> Substrate for Arc<S> {
    async fn pull(&self, location: &Location, options: &Options) -> Result<Option<Blob>> {
        (**self).pull(location, options).await
    }

    async fn fetch(&self, location: &Location, options: &Options) -> Result<String> {
        (**self).fetch(location, options).await
    }

    async fn push(
        &self,
        location: &Location,
        options: &Options,
        change: Change,
        precondition: Precondition,
    ) -> Result<Commit> {
        (**self).push(location, options, change, precondition).await
    }

    fn requires_credentials(&self) -> bool {
        (**self).requires_credentials()
    }
}
