//! Public API for repotable
//!
//! Treat one file in a GitHub or GitLab repository as a small table:
//! read, filter and aggregate its records, append and remove records, and
//! commit every change back as a new revision of the file.
//!
//! ## Quick Start
//!
//! ```ignore
//! use repotable_api::{record, Options, Table};
//! use serde_json::json;
//!
//! let table = Table::forge().with_options(Options::default().with_credentials(None, token));
//! table.append("@github/acme/datasets:main/people.json", record(json!({"id": 1}))?).await?;
//! let active = table.read_where("@github/acme/datasets:main/people.json", json!({"status": "active"})).await?;
//! ```
//!
//! ## Concurrency
//!
//! Every write pulls the file's revision token and pushes only if it still
//! matches. When two writers race, one push fails with `Error::Conflict`;
//! nothing is retried. Re-running the whole call is safe.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod table;

pub use table::{record, Table};

pub use repotable_core::{
    Blob, Commit, Error, Format, Location, LocationSpec, Options, Precondition, Provider, Record,
    RecordSet, Result, RevisionToken,
};
pub use repotable_engine::{
    Aggregate, Change, Committed, ContentCodec, Filter, MemorySubstrate, Outcome, Predicate, Query,
    QueryOutput, Reduction, Substrate, Summary,
};
pub use repotable_forge::{ForgeSubstrate, HttpRequest, HttpResponse, ScriptedTransport, Transport, UreqTransport};
