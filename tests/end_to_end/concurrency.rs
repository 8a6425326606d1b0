//! Optimistic concurrency through revision tokens

use crate::common::{location, stored, table, LOC};
use async_trait::async_trait;
use parking_lot::Mutex;
use repotable::{
    record, Blob, Change, Commit, MemorySubstrate, Options, Precondition, Result, Substrate, Table,
};
use repotable::Location;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn sequential_pulls_return_the_same_token() {
    let (table, _memory) = table();
    table
        .append(LOC, record(json!({"id": 1})).unwrap())
        .await
        .unwrap();

    let a = table.pull(LOC).await.unwrap().unwrap();
    let b = table.pull(LOC).await.unwrap().unwrap();
    assert_eq!(a.revision, b.revision);
}

#[tokio::test]
async fn stale_token_is_rejected() {
    let (table, memory) = table();
    table
        .append(LOC, record(json!({"id": 1})).unwrap())
        .await
        .unwrap();
    let before = table.pull(LOC).await.unwrap().unwrap();

    table
        .append(LOC, record(json!({"id": 2})).unwrap())
        .await
        .unwrap();

    let err = memory
        .push(
            &location(LOC),
            &Options::default(),
            Change::Put("[]".into()),
            Precondition::Matches(before.revision),
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(stored(&memory, LOC), json!([{"id": 1}, {"id": 2}]));
}

/// Lets another writer commit between this caller's pull and push.
struct Racing {
    inner: Arc<MemorySubstrate>,
    rival: Mutex<Option<String>>,
}

#[async_trait]
impl Substrate for Racing {
    async fn pull(&self, location: &Location, options: &Options) -> Result<Option<Blob>> {
        let blob = self.inner.pull(location, options).await?;
        if let Some(content) = self.rival.lock().take() {
            self.inner.insert(location, content);
        }
        Ok(blob)
    }

    async fn push(
        &self,
        location: &Location,
        options: &Options,
        change: Change,
        precondition: Precondition,
    ) -> Result<Commit> {
        self.inner.push(location, options, change, precondition).await
    }

    fn requires_credentials(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn racing_writer_wins_and_loser_sees_conflict() {
    let memory = Arc::new(MemorySubstrate::new());
    memory.insert(&location(LOC), r#"[{"id": 1}]"#);
    let racing = Racing {
        inner: memory.clone(),
        rival: Mutex::new(Some(r#"[{"id": 1}, {"id": "rival"}]"#.to_string())),
    };
    let table = Table::new(racing);

    let err = table
        .append(LOC, record(json!({"id": 2})).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // The rival's write survives and nothing was retried.
    assert_eq!(stored(&memory, LOC), json!([{"id": 1}, {"id": "rival"}]));
    assert_eq!(memory.push_count(), 0);

    // Re-running the whole call pulls a fresh token and succeeds.
    table
        .append(LOC, record(json!({"id": 2})).unwrap())
        .await
        .unwrap();
    assert_eq!(
        stored(&memory, LOC),
        json!([{"id": 1}, {"id": "rival"}, {"id": 2}])
    );
}

#[tokio::test]
async fn first_write_races_with_a_create() {
    let memory = Arc::new(MemorySubstrate::new());
    let racing = Racing {
        inner: memory.clone(),
        rival: Mutex::new(Some(r#"[{"id": "rival"}]"#.to_string())),
    };
    let table = Table::new(racing);

    let err = table
        .append(LOC, record(json!({"id": 1})).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(stored(&memory, LOC), json!([{"id": "rival"}]));
}
