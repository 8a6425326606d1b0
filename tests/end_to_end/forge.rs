//! The facade over the forge substrate, with a scripted transport

use repotable::{record, Error, ForgeSubstrate, Options, ScriptedTransport, Table};
use serde_json::json;
use std::sync::Arc;

const LOC: &str = "@github/acme/datasets:main/people.json";

fn table(transport: ScriptedTransport) -> (Table, Arc<ForgeSubstrate<ScriptedTransport>>) {
    let forge = Arc::new(ForgeSubstrate::new(transport));
    let table = Table::from_shared(forge.clone())
        .with_options(Options::default().with_credentials(None, "tok").with_message("add"));
    (table, forge)
}

#[tokio::test]
async fn append_to_missing_file_creates_it_without_sha() {
    let (table, forge) = table(
        ScriptedTransport::new()
            .respond(404, r#"{"message":"Not Found"}"#)
            .respond(201, r#"{"content":{"sha":"s1"}}"#),
    );

    let committed = table
        .append(LOC, record(json!({"id": 1, "name": "a"})).unwrap())
        .await
        .unwrap();
    assert_eq!(committed.commit.status, 201);

    let requests = forge.transport().requests();
    assert_eq!(requests.len(), 2);
    let body = requests[1].body.as_ref().unwrap();
    assert!(body.get("sha").is_none());
    assert_eq!(body["message"], "add");
    let content = repotable_forge::decode_base64(body["content"].as_str().unwrap()).unwrap();
    let pushed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(pushed, json!([{"id": 1, "name": "a"}]));
}

#[tokio::test]
async fn append_sends_pulled_sha_and_surfaces_conflict() {
    let (table, forge) = table(
        ScriptedTransport::new()
            .respond(200, r#"{"type":"file","sha":"s1","content":"W10="}"#)
            .respond(409, r#"{"message":"people.json does not match s1"}"#),
    );

    let err = table
        .append(LOC, record(json!({"id": 1})).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let requests = forge.transport().requests();
    assert_eq!(requests.len(), 2, "conflicts are not retried");
    assert_eq!(forge.transport().remaining(), 0);
    assert_eq!(requests[1].body.as_ref().unwrap()["sha"], "s1");
}

#[tokio::test]
async fn read_uses_the_raw_endpoint() {
    let (table, forge) = table(ScriptedTransport::new().respond(200, "id,amt\n1,10\n2,20\n"));
    let out = table
        .read_where(LOC, json!({"$sum": "amt"}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out.summary().unwrap()["sum:amt"], json!(30));
    assert!(forge.transport().requests()[0]
        .url
        .starts_with("https://raw.githubusercontent.com/"));
}

#[tokio::test]
async fn bad_credentials_are_unauthenticated() {
    let (table, _forge) = table(ScriptedTransport::new().respond(401, r#"{"message":"Bad credentials"}"#));
    let err = table
        .append(LOC, record(json!({"id": 1})).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthenticated { .. }));
}
