//! Revision controller
//!
//! Runs the read-modify-write cycle for one mutating call:
//!
//! ```text
//! Resolving -> Pulling -> Decoding -> Mutating -> Encoding -> Pushing -> Done
//!     \           \          \           \           \          \
//!      +-----------+----------+-----------+-----------+----------+--> Failed
//! ```
//!
//! Stages run strictly in order. The revision token captured while pulling
//! is handed back on push; a stale token makes the substrate reject the
//! push and the rejection is returned as-is. Nothing is retried.
//!
//! # Recovery
//!
//! - Append: a missing file or unreadable content is an empty base. The
//!   first write of a missing file is pushed with `Precondition::Absent`.
//! - Remove: a missing file or unreadable content means there is nothing to
//!   remove. So does an identifier that matches no record. None of these
//!   push.
//! - Replace (create): does not pull; always pushes `Unconditional`.

use crate::codec::ContentCodec;
use crate::query;
use crate::substrate::{Change, Substrate};
use repotable_core::{
    scalar_eq, Blob, Commit, Error, Format, Location, Options, Precondition, Record, RecordSet,
    Result, RevisionToken,
};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

/// Stage of a controller cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building and validating the location
    Resolving,
    /// Fetching the current blob and revision token
    Pulling,
    /// Decoding the blob into records
    Decoding,
    /// Applying the mutation in memory
    Mutating,
    /// Encoding the new record set
    Encoding,
    /// Submitting the new content with the captured token
    Pushing,
    /// Finished
    Done,
    /// Aborted by an error at any earlier stage
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolving => "resolving",
            Stage::Pulling => "pulling",
            Stage::Decoding => "decoding",
            Stage::Mutating => "mutating",
            Stage::Encoding => "encoding",
            Stage::Pushing => "pushing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// In-memory transform applied between pull and push
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Append records, coerced onto the known columns in strict mode
    Append(Vec<Record>),
    /// Remove every record whose identifier column equals the value
    Remove(Value),
    /// Replace the whole content
    Replace(RecordSet),
}

impl Mutation {
    /// Operation name used in logs and `Unauthenticated` errors
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Append(_) => "append",
            Mutation::Remove(_) => "remove",
            Mutation::Replace(_) => "create",
        }
    }
}

/// Decoded state of the file before mutation
#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    /// Current records (empty when the file is missing or unreadable)
    pub records: RecordSet,
    /// Notation used to encode the result
    pub format: Format,
    /// Token of the pulled blob; `None` if the file does not exist
    pub revision: Option<RevisionToken>,
    /// False when the file was missing or could not be decoded
    pub readable: bool,
}

/// A push that went through
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    /// Records now stored
    pub records: RecordSet,
    /// Notation they were stored in
    pub format: Format,
    /// Substrate acknowledgement
    pub commit: Commit,
    /// Effective column set (the strict schema, when strict mode is on)
    pub columns: Vec<String>,
}

/// Result of a mutating cycle
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// New content was pushed
    Committed(Committed),
    /// Nothing changed, nothing was pushed; carries the unmodified base
    Unchanged(RecordSet),
}

impl Outcome {
    /// Records after the call
    pub fn records(&self) -> &RecordSet {
        match self {
            Outcome::Committed(c) => &c.records,
            Outcome::Unchanged(records) => records,
        }
    }

    /// True if a push happened
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed(_))
    }
}

/// Read-modify-write orchestrator over one substrate and one options value
pub struct RevisionController<'a> {
    substrate: &'a dyn Substrate,
    options: &'a Options,
    codec: ContentCodec,
}

impl<'a> RevisionController<'a> {
    /// Create a controller. Fails if the tabular options are invalid.
    pub fn new(substrate: &'a dyn Substrate, options: &'a Options) -> Result<Self> {
        Ok(RevisionController {
            substrate,
            options,
            codec: ContentCodec::from_options(options)?,
        })
    }

    /// Resolving stage. `operation` names a write that needs credentials.
    pub fn resolve(&self, input: &str, operation: Option<&str>) -> Result<Location> {
        debug!(target: "repotable::controller", stage = %Stage::Resolving, input);
        let location = Location::parse(input, self.options)?;
        if let Some(operation) = operation {
            if self.substrate.requires_credentials() && !self.options.has_credentials() {
                return Err(Error::Unauthenticated {
                    operation: operation.to_string(),
                });
            }
        }
        Ok(location)
    }

    /// Read path: fetch and decode. `Ok(None)` means the file holds no
    /// readable data.
    pub async fn read(&self, location: &Location) -> Result<Option<(RecordSet, Format)>> {
        debug!(target: "repotable::controller", stage = %Stage::Pulling, %location, "fetch");
        let text = self.substrate.fetch(location, self.options).await?;
        debug!(target: "repotable::controller", stage = %Stage::Decoding, %location, bytes = text.len());
        let decoded = self.codec.decode(&text);
        if decoded.is_none() {
            warn!(target: "repotable::controller", %location, "content is not readable as records");
        }
        Ok(decoded)
    }

    /// Pulling and Decoding stages, with empty-base recovery.
    pub async fn load(&self, location: &Location) -> Result<Base> {
        debug!(target: "repotable::controller", stage = %Stage::Pulling, %location);
        let blob = self.substrate.pull(location, self.options).await?;

        debug!(target: "repotable::controller", stage = %Stage::Decoding, %location);
        Ok(self.decode_base(location, blob))
    }

    fn fallback_format(&self, location: &Location) -> Format {
        self.options.format.unwrap_or_else(|| location.infer_format())
    }

    fn decode_base(&self, location: &Location, blob: Option<Blob>) -> Base {
        let Some(blob) = blob else {
            warn!(target: "repotable::controller", %location, "file not found, using empty base");
            return Base {
                records: RecordSet::empty(),
                format: self.fallback_format(location),
                revision: None,
                readable: false,
            };
        };
        match self.codec.decode(&blob.content) {
            Some((records, detected)) => Base {
                records,
                format: self.options.format.unwrap_or(detected),
                revision: Some(blob.revision),
                readable: true,
            },
            None => {
                warn!(target: "repotable::controller", %location, "unreadable content, using empty base");
                Base {
                    records: RecordSet::empty(),
                    format: self.fallback_format(location),
                    revision: Some(blob.revision),
                    readable: false,
                }
            }
        }
    }

    /// Run a full cycle.
    pub async fn execute(&self, location: &Location, mutation: Mutation) -> Result<Outcome> {
        let operation = mutation.name();
        self.cycle(location, mutation).await.map_err(|e| {
            debug!(target: "repotable::controller", stage = %Stage::Failed, %location, operation, error = %e);
            e
        })
    }

    async fn cycle(&self, location: &Location, mutation: Mutation) -> Result<Outcome> {
        let operation = mutation.name();
        let (base, precondition) = match &mutation {
            Mutation::Replace(_) => (
                Base {
                    records: RecordSet::empty(),
                    format: self.fallback_format(location),
                    revision: None,
                    readable: false,
                },
                Precondition::Unconditional,
            ),
            _ => {
                let base = self.load(location).await?;
                let precondition = Precondition::from_revision(base.revision.clone());
                (base, precondition)
            }
        };

        debug!(target: "repotable::controller", stage = %Stage::Mutating, %location, operation);
        let (records, columns) = match mutation {
            Mutation::Append(incoming) => self.append(base.records, incoming),
            Mutation::Replace(records) => {
                let columns = query::columns(records.as_slice());
                (records, columns)
            }
            Mutation::Remove(id) => {
                if !base.readable {
                    debug!(target: "repotable::controller", %location, "nothing to remove");
                    return Ok(Outcome::Unchanged(base.records));
                }
                match self.remove(&base.records, &id) {
                    Some(records) => {
                        let columns = query::columns(records.as_slice());
                        (records, columns)
                    }
                    None => {
                        debug!(target: "repotable::controller", %location, id = %id, "no record matched, skipping push");
                        return Ok(Outcome::Unchanged(base.records));
                    }
                }
            }
        };

        debug!(target: "repotable::controller", stage = %Stage::Encoding, %location, format = %base.format);
        let text = self.codec.encode(&records, base.format)?;

        debug!(target: "repotable::controller", stage = %Stage::Pushing, %location, precondition = ?precondition);
        let commit = self
            .substrate
            .push(location, self.options, Change::Put(text), precondition)
            .await
            .map_err(|e| {
                warn!(target: "repotable::controller", %location, operation, error = %e, "push rejected");
                e
            })?;

        info!(target: "repotable::controller", %location, operation, status = commit.status, records = records.len(), "committed");
        debug!(target: "repotable::controller", stage = %Stage::Done, %location);
        Ok(Outcome::Committed(Committed {
            records,
            format: base.format,
            commit,
            columns,
        }))
    }

    /// Delete the whole file. `NotFound` if it does not exist.
    pub async fn delete_file(&self, location: &Location) -> Result<Commit> {
        debug!(target: "repotable::controller", stage = %Stage::Pulling, %location, "delete file");
        let blob = self
            .substrate
            .pull(location, self.options)
            .await?
            .ok_or_else(|| Error::NotFound {
                location: location.to_string(),
            })?;

        debug!(target: "repotable::controller", stage = %Stage::Pushing, %location, "delete file");
        let commit = self
            .substrate
            .push(
                location,
                self.options,
                Change::Delete,
                Precondition::Matches(blob.revision),
            )
            .await?;
        info!(target: "repotable::controller", %location, status = commit.status, "file deleted");
        Ok(commit)
    }

    fn append(&self, base: RecordSet, incoming: Vec<Record>) -> (RecordSet, Vec<String>) {
        let mut records = base.into_vec();

        if !self.options.strict {
            records.extend(incoming);
            let columns = query::columns(&records);
            return (RecordSet::Many(records), columns);
        }

        let columns = match &self.options.columns {
            Some(known) if !known.is_empty() => known.clone(),
            _ => {
                let existing = query::columns(&records);
                if existing.is_empty() {
                    query::columns(&incoming)
                } else {
                    existing
                }
            }
        };
        records.extend(
            incoming
                .iter()
                .map(|record| query::conform(record, &columns, &self.options.default_value)),
        );
        (RecordSet::Many(records), columns)
    }

    /// `None` if no record matched.
    fn remove(&self, base: &RecordSet, id: &Value) -> Option<RecordSet> {
        let column = self.options.id_column.as_str();
        let kept: Vec<Record> = base
            .iter()
            .filter(|record| !record.get(column).is_some_and(|v| scalar_eq(v, id)))
            .cloned()
            .collect();
        if kept.len() == base.len() {
            None
        } else {
            Some(RecordSet::Many(kept))
        }
    }
}
