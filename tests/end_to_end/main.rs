//! End-to-end tests for the table facade
//!
//! ## Modules
//!
//! - `scenario`: append, append, remove over an initially missing file
//! - `concurrency`: revision tokens and racing writers
//! - `strict`: schema coercion under strict mode
//! - `query`: filters and aggregates through `read`
//! - `forge`: the facade over the forge substrate with a scripted transport
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test end_to_end
//! cargo test --test end_to_end concurrency::
//! ```

mod common;

mod concurrency;
mod forge;
mod query;
mod scenario;
mod strict;
