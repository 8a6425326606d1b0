//! Strict mode keeps a dataset's columns stable across appends

use crate::common::{records, stored, table, LOC};
use repotable::{record, Options};
use serde_json::{json, Value};

#[tokio::test]
async fn missing_column_takes_default_and_extra_column_is_dropped() {
    let (table, memory) = table();
    table
        .create(LOC, records(json!([{"id": 1, "name": "a", "email": "a@x"}])))
        .await
        .unwrap();

    let strict = table.with_options(Options::default().with_strict(true, json!("n/a")));
    let committed = strict
        .append(LOC, record(json!({"id": 2, "phone": "555"})).unwrap())
        .await
        .unwrap();

    assert_eq!(committed.columns, vec!["id", "name", "email"]);
    assert_eq!(
        stored(&memory, LOC),
        json!([
            {"id": 1, "name": "a", "email": "a@x"},
            {"id": 2, "name": "n/a", "email": "n/a"}
        ])
    );
}

#[tokio::test]
async fn first_append_defines_the_schema() {
    let (table, memory) = table();
    let strict = table.with_options(Options::default().with_strict(true, Value::Null));

    let committed = strict
        .append(LOC, record(json!({"id": 1, "name": "a"})).unwrap())
        .await
        .unwrap();
    let strict = strict.with_options(strict.options().clone().with_columns(committed.columns));

    strict
        .append(LOC, record(json!({"id": 2, "extra": true})).unwrap())
        .await
        .unwrap();
    assert_eq!(
        stored(&memory, LOC),
        json!([{"id": 1, "name": "a"}, {"id": 2, "name": null}])
    );
}

#[tokio::test]
async fn lenient_mode_keeps_every_field() {
    let (table, memory) = table();
    table
        .append(LOC, record(json!({"id": 1})).unwrap())
        .await
        .unwrap();
    table
        .append(LOC, record(json!({"id": 2, "extra": true})).unwrap())
        .await
        .unwrap();
    assert_eq!(
        stored(&memory, LOC),
        json!([{"id": 1}, {"id": 2, "extra": true}])
    );
}
