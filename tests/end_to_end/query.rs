//! Filters and aggregates through the facade

use crate::common::{records, table, LOC};
use repotable::{Predicate, Query, QueryOutput, Reduction, Table};
use serde_json::json;

async fn orders() -> Table {
    let (table, _memory) = table();
    table
        .create(
            LOC,
            records(json!([
                {"id": 1, "status": "active", "amt": 10},
                {"id": 2, "status": "closed", "amt": 20},
                {"id": 3, "status": "active", "amt": 30}
            ])),
        )
        .await
        .unwrap();
    table
}

fn ids(out: &QueryOutput) -> Vec<i64> {
    out.records()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn equality_and_its_complement() {
    let table = orders().await;
    let active = table
        .read_where(LOC, json!({"status": "active"}))
        .await
        .unwrap()
        .unwrap();
    let rest = table
        .read_where(LOC, json!({"status": "not:active"}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ids(&active), vec![1, 3]);
    assert_eq!(ids(&rest), vec![2]);
}

#[tokio::test]
async fn sum_without_filters() {
    let table = orders().await;
    let out = table
        .read_where(LOC, json!({"$sum": "amt"}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out.summary().unwrap()["sum:amt"], json!(60));
}

#[tokio::test]
async fn aggregates_follow_filters() {
    let table = orders().await;
    let query = Query::new()
        .where_eq("status", "active")
        .aggregate(Reduction::Sum, "amt")
        .aggregate(Reduction::Max, "amt")
        .aggregate(Reduction::Group, "status");
    let out = table.read(LOC, Some(query)).await.unwrap().unwrap();
    let summary = out.summary().unwrap();
    assert_eq!(summary["sum:amt"], json!(40));
    assert_eq!(summary["max:amt"], json!(30));
    assert_eq!(summary["group:status"], json!({"active": 2}));
}

#[tokio::test]
async fn range_filter() {
    let table = orders().await;
    let query = Query::new().filter("amt", Predicate::Lt(json!(25)));
    let out = table.read(LOC, Some(query)).await.unwrap().unwrap();
    assert_eq!(ids(&out), vec![1, 2]);
}
