//! Core types for repotable
//!
//! This crate defines the vocabulary shared by every other crate:
//! - Record, RecordSet: the content of a stored file
//! - Format: structured (JSON) or tabular (CSV) notation
//! - Location, LocationSpec, Provider: where a file lives
//! - RevisionToken, Blob, Precondition, Commit: optimistic concurrency exchange
//! - Options: session configuration
//! - Error: error type hierarchy

#![warn(clippy::all)]

pub mod error;
pub mod location;
pub mod options;
pub mod record;
pub mod revision;

pub use error::{Error, Result};
pub use location::{Location, LocationSpec, Provider};
pub use options::{Author, Options, TabularOptions, DEFAULT_BRANCH, DEFAULT_ID_COLUMN, DEFAULT_MESSAGE};
pub use record::{number_value, scalar_eq, scalar_number, scalar_text, Format, Record, RecordSet};
pub use revision::{Blob, Commit, Precondition, RevisionToken};
