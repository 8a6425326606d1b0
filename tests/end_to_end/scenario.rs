//! Append, append, remove over a file that does not exist yet

use crate::common::{records, stored, table, LOC};
use repotable::{record, Options, Outcome, QueryOutput};
use serde_json::json;

#[tokio::test]
async fn append_append_remove() {
    let (table, memory) = table();

    let first = table
        .append(LOC, record(json!({"id": 1, "name": "a"})).unwrap())
        .await
        .unwrap();
    assert_eq!(first.commit.status, 201);
    assert_eq!(stored(&memory, LOC), json!([{"id": 1, "name": "a"}]));

    let second = table
        .append(LOC, record(json!({"id": 2, "name": "b"})).unwrap())
        .await
        .unwrap();
    assert_eq!(second.commit.status, 200);
    assert_ne!(first.commit.revision, second.commit.revision);
    assert_eq!(
        stored(&memory, LOC),
        json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])
    );

    let removed = table.remove(LOC, Some(json!(1))).await.unwrap();
    assert!(removed.is_committed());
    assert_eq!(stored(&memory, LOC), json!([{"id": 2, "name": "b"}]));

    let out = table.read(LOC, None).await.unwrap().unwrap();
    assert_eq!(out, QueryOutput::Records(records(json!([{"id": 2, "name": "b"}]))));
}

#[tokio::test]
async fn append_many_at_once() {
    let (table, memory) = table();
    table
        .append(LOC, records(json!([{"id": 1}, {"id": 2}])))
        .await
        .unwrap();
    assert_eq!(stored(&memory, LOC), json!([{"id": 1}, {"id": 2}]));
}

#[tokio::test]
async fn remove_absent_identifier_is_idempotent() {
    let (table, memory) = table();
    table.create(LOC, records(json!([{"id": 1}]))).await.unwrap();
    let pushes = memory.push_count();

    let outcome = table.remove(LOC, Some(json!(42))).await.unwrap();
    assert_eq!(outcome, Outcome::Unchanged(records(json!([{"id": 1}]))));
    let again = table.remove(LOC, Some(json!(42))).await.unwrap();
    assert!(!again.is_committed());
    assert_eq!(memory.push_count(), pushes);
}

#[tokio::test]
async fn csv_file_round_trips_through_appends() {
    let (table, memory) = table();
    let loc = "@github/acme/datasets:main/people.csv";

    table
        .append(loc, record(json!({"id": 1, "name": "a"})).unwrap())
        .await
        .unwrap();
    table
        .append(loc, record(json!({"id": 2, "name": "b, c"})).unwrap())
        .await
        .unwrap();

    let text = memory.content(&crate::common::location(loc)).unwrap();
    assert_eq!(text, "id,name\n1,a\n2,\"b, c\"\n");

    let out = table.read(loc, None).await.unwrap().unwrap();
    assert_eq!(
        out,
        QueryOutput::Records(records(json!([
            {"id": "1", "name": "a"},
            {"id": "2", "name": "b, c"}
        ])))
    );
    assert_eq!(table.list_columns(loc).await.unwrap(), vec!["id", "name"]);
}

#[tokio::test]
async fn csv_file_uses_configured_delimiter() {
    let (table, memory) = table();
    let table = table.with_options(Options::default().with_delimiter(';'));
    let loc = "@github/acme/datasets:main/people.csv";

    table
        .append(loc, record(json!({"id": 1, "name": "a"})).unwrap())
        .await
        .unwrap();
    let text = memory.content(&crate::common::location(loc)).unwrap();
    assert_eq!(text, "id;name\n1;a\n");

    let out = table.read(loc, None).await.unwrap().unwrap();
    assert_eq!(out, QueryOutput::Records(records(json!([{"id": "1", "name": "a"}]))));
}
