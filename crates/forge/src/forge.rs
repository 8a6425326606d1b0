//! Forge substrate
//!
//! [`ForgeSubstrate`] implements [`Substrate`] over the GitHub contents API
//! or the GitLab repository files API, picked per location by its
//! namespace. Requests go through a [`Transport`].
//!
//! Status mapping:
//!
//! | Status | Error |
//! |--------|-------|
//! | 401, 403 | `Unauthenticated` |
//! | 404 | `NotFound` (a pull returns `None` instead) |
//! | 409, 412, 422 | `Conflict` |
//! | 400 with a GitLab conflict message | `Conflict` |
//! | anything else | `Transport` |
//!
//! `Precondition::Unconditional` is realised by pulling the current token
//! first and sending it with the write.

use crate::transport::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::{github, gitlab};
use async_trait::async_trait;
use repotable_core::{Blob, Commit, Error, Location, Options, Precondition, Provider, Result, RevisionToken};
use repotable_engine::{Change, Substrate};
use serde_json::Value;
use tracing::debug;

/// Substrate backed by a forge's file API
#[derive(Debug, Default)]
pub struct ForgeSubstrate<T = UreqTransport> {
    transport: T,
}

impl<T: Transport> ForgeSubstrate<T> {
    /// Substrate over the given transport
    pub fn new(transport: T) -> Self {
        ForgeSubstrate { transport }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(&self, request: HttpRequest, operation: &str) -> Result<HttpResponse> {
        debug!(
            target: "repotable::forge",
            operation,
            method = %request.method,
            url = %request.url,
            "request"
        );
        self.transport.send(request).await
    }

    /// Token to guard a write with, pulling it for `Unconditional`.
    async fn guard_token(
        &self,
        location: &Location,
        options: &Options,
        precondition: Precondition,
    ) -> Result<Option<RevisionToken>> {
        match precondition {
            Precondition::Matches(token) => Ok(Some(token)),
            Precondition::Absent => Ok(None),
            Precondition::Unconditional => Ok(self.pull(location, options).await?.map(|blob| blob.revision)),
        }
    }
}

/// Map a non-success response to an error.
fn status_error(response: &HttpResponse, location: &Location, operation: &str) -> Error {
    if location.namespace() == Provider::GitLab {
        if let Some(conflict) = gitlab::conflict(response) {
            return conflict;
        }
    }
    match response.status {
        401 | 403 => Error::Unauthenticated {
            operation: operation.to_string(),
        },
        404 => Error::NotFound {
            location: location.to_string(),
        },
        status => Error::from_status(
            status,
            format!("{} {}: {}", operation, location, response_message(response)),
        ),
    }
}

fn response_message(response: &HttpResponse) -> String {
    response
        .json::<Value>()
        .ok()
        .and_then(|body| body["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| response.body.chars().take(200).collect())
}

#[async_trait]
impl<T: Transport> Substrate for ForgeSubstrate<T> {
    async fn pull(&self, location: &Location, options: &Options) -> Result<Option<Blob>> {
        let request = match location.namespace() {
            Provider::GitHub => github::pull_request(location, options)?,
            Provider::GitLab => gitlab::pull_request(location, options)?,
        };
        let response = self.send(request, "pull").await?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.ok() {
            return Err(status_error(&response, location, "pull"));
        }
        let blob = match location.namespace() {
            Provider::GitHub => github::parse_blob(location, &response)?,
            Provider::GitLab => gitlab::parse_blob(&response)?,
        };
        Ok(Some(blob))
    }

    async fn fetch(&self, location: &Location, options: &Options) -> Result<String> {
        let request = match location.namespace() {
            Provider::GitHub => github::fetch_request(location, options)?,
            Provider::GitLab => gitlab::fetch_request(location, options)?,
        };
        let response = self.send(request, "read").await?;
        if !response.ok() {
            return Err(status_error(&response, location, "read"));
        }
        Ok(response.body)
    }

    async fn push(
        &self,
        location: &Location,
        options: &Options,
        change: Change,
        precondition: Precondition,
    ) -> Result<Commit> {
        let operation = change.verb();
        let request = match change {
            Change::Put(content) => {
                let token = self.guard_token(location, options, precondition).await?;
                match location.namespace() {
                    Provider::GitHub => github::put_request(location, options, &content, token.as_ref())?,
                    Provider::GitLab => gitlab::put_request(location, options, &content, token.as_ref())?,
                }
            }
            Change::Delete => {
                if precondition == Precondition::Absent {
                    return Err(Error::invalid_input("deleting a file requires it to exist"));
                }
                let token = self
                    .guard_token(location, options, precondition)
                    .await?
                    .ok_or_else(|| Error::NotFound {
                        location: location.to_string(),
                    })?;
                match location.namespace() {
                    Provider::GitHub => github::delete_request(location, options, &token)?,
                    Provider::GitLab => gitlab::delete_request(location, options, Some(&token))?,
                }
            }
        };

        let response = self.send(request, operation).await?;
        if !response.ok() {
            return Err(status_error(&response, location, operation));
        }
        Ok(match location.namespace() {
            Provider::GitHub => github::parse_commit(&response),
            Provider::GitLab => gitlab::parse_commit(&response),
        })
    }
}
