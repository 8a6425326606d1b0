//! Shared helpers

use repotable::{Location, MemorySubstrate, Options, RecordSet, Table};
use serde_json::Value;
use std::sync::Arc;

pub const LOC: &str = "@github/acme/datasets:main/people.json";

/// Table over a memory substrate the test can inspect directly
pub fn table() -> (Table, Arc<MemorySubstrate>) {
    let memory = Arc::new(MemorySubstrate::new());
    (Table::from_shared(memory.clone()), memory)
}

pub fn location(input: &str) -> Location {
    Location::parse(input, &Options::default()).unwrap()
}

/// Stored content parsed as JSON
pub fn stored(memory: &MemorySubstrate, input: &str) -> Value {
    serde_json::from_str(&memory.content(&location(input)).unwrap()).unwrap()
}

pub fn records(value: Value) -> RecordSet {
    RecordSet::try_from(value).unwrap()
}
