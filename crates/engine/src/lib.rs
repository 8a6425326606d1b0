//! Engine for repotable
//!
//! This crate holds everything between the facade and the wire:
//! - ContentCodec: structured/tabular detection, decode and encode
//! - Query: filters and aggregate directives over a record set
//! - Substrate: whole-file storage with compare-and-swap writes
//! - MemorySubstrate: in-process substrate
//! - RevisionController: the pull, mutate, push cycle
//!
//! The engine never talks to the network itself. Remote access lives behind
//! the [`Substrate`] trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod controller;
pub mod memory;
pub mod query;
pub mod substrate;

pub use codec::ContentCodec;
pub use controller::{Base, Committed, Mutation, Outcome, RevisionController, Stage};
pub use memory::{content_token, MemorySubstrate};
pub use query::{
    aggregate, columns, conform, select, Aggregate, Filter, Predicate, Query, QueryOutput, Reduction,
    Summary,
};
pub use substrate::{Change, Substrate};
