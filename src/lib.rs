//! repotable - a file in a git forge, used as a table
//!
//! repotable reads a JSON or CSV file from a GitHub or GitLab repository,
//! filters and aggregates its records, and commits appends and removals
//! back as new revisions of the file. Writes are guarded by the file's
//! revision token, so concurrent writers cannot silently overwrite each
//! other.
//!
//! # Quick Start
//!
//! ```ignore
//! use repotable::{record, Options, Table};
//! use serde_json::json;
//!
//! let table = Table::forge().with_options(Options::default().with_credentials(None, token));
//! let loc = "@github/acme/datasets:main/people.json";
//!
//! table.append(loc, record(json!({"id": 1, "name": "ann"}))?).await?;
//! let total = table.read_where(loc, json!({"$count": "*"})).await?;
//! table.remove(loc, Some(json!(1))).await?;
//! ```
//!
//! # Architecture
//!
//! - `repotable-core`: records, locations, revision tokens, options, errors
//! - `repotable-engine`: codec, query engine, substrate trait, controller
//! - `repotable-forge`: GitHub/GitLab substrate over HTTP
//! - `repotable-api`: the [`Table`] facade re-exported here

pub use repotable_api::*;
