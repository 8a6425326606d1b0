//! Table facade
//!
//! [`Table`] treats one file in a remote repository as a small table. Every
//! call resolves its location against the table's [`Options`] and runs one
//! cycle of the revision controller over the table's substrate.
//!
//! ## Desugaring
//!
//! | Facade | Controller |
//! |--------|------------|
//! | `read(loc, query)` | `resolve` → `read` → `Query::run` |
//! | `create(loc, records)` | `resolve` → `execute(Replace)` |
//! | `append(loc, records)` | `resolve` → `execute(Append)` |
//! | `remove(loc, id)` | `resolve` → `execute(Remove)` |
//! | `list_columns(loc)` | `read(loc, None)` → `columns` |
//! | `pull(loc)` | `resolve` → `Substrate::pull` |
//! | `drop_file(loc)` | `resolve` → `delete_file` |
//!
//! ## Options
//!
//! Options are never mutated by an operation. `with_options` and `reset`
//! return a new table over the same substrate.

use repotable_core::{Blob, Commit, Error, Location, Options, Record, RecordSet, Result};
use repotable_engine::{
    columns, Committed, MemorySubstrate, Mutation, Outcome, Predicate, Query, QueryOutput,
    RevisionController, Substrate,
};
use repotable_forge::{ForgeSubstrate, UreqTransport};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A remote file used as a table
#[derive(Clone)]
pub struct Table {
    substrate: Arc<dyn Substrate>,
    options: Options,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table").field("options", &self.options).finish()
    }
}

impl Table {
    /// Table over any substrate, with default options
    pub fn new(substrate: impl Substrate + 'static) -> Self {
        Self::from_shared(Arc::new(substrate))
    }

    /// Table over a shared substrate
    pub fn from_shared(substrate: Arc<dyn Substrate>) -> Self {
        Table {
            substrate,
            options: Options::default(),
        }
    }

    /// Table over GitHub/GitLab through `ureq`
    pub fn forge() -> Self {
        Self::new(ForgeSubstrate::new(UreqTransport::default()))
    }

    /// Table over a fresh in-process substrate
    pub fn memory() -> Self {
        Self::new(MemorySubstrate::new())
    }

    /// Current options
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Same substrate, new options
    pub fn with_options(&self, options: Options) -> Self {
        Table {
            substrate: Arc::clone(&self.substrate),
            options,
        }
    }

    /// Same substrate, default options
    pub fn reset(&self) -> Self {
        self.with_options(Options::default())
    }

    /// Underlying substrate
    pub fn substrate(&self) -> &Arc<dyn Substrate> {
        &self.substrate
    }

    fn controller(&self) -> Result<RevisionController<'_>> {
        RevisionController::new(self.substrate.as_ref(), &self.options)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read records, filtered and optionally aggregated.
    ///
    /// A record identifier in the location adds an equality filter on the
    /// id column. `Ok(None)` means the file holds no readable data; a
    /// missing file is `NotFound`.
    pub async fn read(&self, location: &str, query: Option<Query>) -> Result<Option<QueryOutput>> {
        let controller = self.controller()?;
        let location = controller.resolve(location, None)?;
        let query = self.scoped_query(&location, query.unwrap_or_default());
        Ok(controller
            .read(&location)
            .await?
            .map(|(records, _format)| query.run(&records)))
    }

    /// [`Table::read`] with a loosely-typed query (`{"status": "not:done",
    /// "$sum": "amt"}`).
    pub async fn read_where(&self, location: &str, query: Value) -> Result<Option<QueryOutput>> {
        let query = Query::from_value(query)?;
        self.read(location, Some(query)).await
    }

    fn scoped_query(&self, location: &Location, query: Query) -> Query {
        match location.resource() {
            Some(id) => query.filter(
                self.options.id_column.clone(),
                Predicate::Eq(Value::String(id.to_string())),
            ),
            None => query,
        }
    }

    /// Column names in first-seen order; empty when the file holds no data.
    pub async fn list_columns(&self, location: &str) -> Result<Vec<String>> {
        Ok(match self.read(location, None).await? {
            Some(QueryOutput::Records(records)) => columns(records.as_slice()),
            _ => Vec::new(),
        })
    }

    /// Current content and revision token, `None` if the file is missing.
    pub async fn pull(&self, location: &str) -> Result<Option<Blob>> {
        let controller = self.controller()?;
        let location = controller.resolve(location, None)?;
        self.substrate.pull(&location, &self.options).await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create or replace the file with exactly these records.
    pub async fn create(&self, location: &str, records: impl Into<RecordSet>) -> Result<Commit> {
        let controller = self.controller()?;
        let location = controller.resolve(location, Some("create"))?;
        match controller
            .execute(&location, Mutation::Replace(records.into()))
            .await?
        {
            Outcome::Committed(committed) => Ok(committed.commit),
            Outcome::Unchanged(_) => Err(Error::Internal {
                reason: "replace finished without a push".to_string(),
            }),
        }
    }

    /// Append one or more records. A missing file is created.
    ///
    /// In strict mode the result's `columns` is the schema the records were
    /// coerced onto; fold it into the options with `Options::with_columns`
    /// to keep it for later appends.
    pub async fn append(&self, location: &str, records: impl Into<RecordSet>) -> Result<Committed> {
        let records = records.into().into_vec();
        if records.is_empty() {
            return Err(Error::invalid_input("append needs at least one record"));
        }
        let controller = self.controller()?;
        let location = controller.resolve(location, Some("append"))?;
        match controller.execute(&location, Mutation::Append(records)).await? {
            Outcome::Committed(committed) => Ok(committed),
            Outcome::Unchanged(_) => Err(Error::Internal {
                reason: "append finished without a push".to_string(),
            }),
        }
    }

    /// Remove every record whose id column equals `id`, or the identifier
    /// embedded in the location when `id` is `None`.
    ///
    /// Nothing is pushed when no record matches.
    pub async fn remove(&self, location: &str, id: Option<Value>) -> Result<Outcome> {
        let controller = self.controller()?;
        let location = controller.resolve(location, Some("remove"))?;
        let id = match (id, location.resource()) {
            (Some(id), _) => id,
            (None, Some(resource)) => Value::String(resource.to_string()),
            (None, None) => {
                return Err(Error::invalid_input(
                    "remove needs an identifier, as an argument or in the location",
                ))
            }
        };
        controller.execute(&location, Mutation::Remove(id)).await
    }

    /// Delete the whole file.
    pub async fn drop_file(&self, location: &str) -> Result<Commit> {
        let controller = self.controller()?;
        let location = controller.resolve(location, Some("drop"))?;
        controller.delete_file(&location).await
    }
}

/// Convenience for building a record from a JSON object.
pub fn record(value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::invalid_input(format!("a record must be an object, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repotable_engine::{Reduction, Summary};
    use serde_json::json;

    const LOC: &str = "@github/acme/data:main/people.json";

    fn set(value: Value) -> RecordSet {
        RecordSet::try_from(value).unwrap()
    }

    async fn seeded() -> Table {
        let table = Table::memory();
        table
            .create(
                LOC,
                set(json!([
                    {"id": 1, "name": "ann", "amt": 10},
                    {"id": 2, "name": "bob", "amt": 20},
                    {"id": 3, "name": "cat", "amt": 30}
                ])),
            )
            .await
            .unwrap();
        table
    }

    #[tokio::test]
    async fn test_read_everything() {
        let table = seeded().await;
        let out = table.read(LOC, None).await.unwrap().unwrap();
        assert_eq!(out.records().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let table = Table::memory();
        let err = table.read(LOC, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_by_embedded_identifier() {
        let table = seeded().await;
        let out = table.read(&format!("{}/2", LOC), None).await.unwrap().unwrap();
        let records = out.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.as_slice()[0]["name"], "bob");
    }

    #[tokio::test]
    async fn test_read_where_aggregates() {
        let table = seeded().await;
        let out = table
            .read_where(LOC, json!({"$sum": "amt", "$count": "*"}))
            .await
            .unwrap()
            .unwrap();
        let mut expected = Summary::new();
        expected.insert("sum:amt".into(), json!(60));
        expected.insert("count:*".into(), json!(3));
        assert_eq!(out, QueryOutput::Summary(expected));
    }

    #[tokio::test]
    async fn test_typed_query() {
        let table = seeded().await;
        let query = Query::new()
            .filter("amt", Predicate::Gte(json!(20)))
            .aggregate(Reduction::Avg, "amt");
        let out = table.read(LOC, Some(query)).await.unwrap().unwrap();
        assert_eq!(out.summary().unwrap()["avg:amt"], json!(25));
    }

    #[tokio::test]
    async fn test_unreadable_file_reads_as_no_data() {
        let memory = Arc::new(MemorySubstrate::new());
        let table = Table::from_shared(memory.clone());
        let location = Location::parse(LOC, table.options()).unwrap();
        memory.insert(&location, "{ nope");
        assert_eq!(table.read(LOC, None).await.unwrap(), None);
        assert!(table.list_columns(LOC).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_columns() {
        let table = seeded().await;
        assert_eq!(table.list_columns(LOC).await.unwrap(), vec!["id", "name", "amt"]);
    }

    #[tokio::test]
    async fn test_remove_by_embedded_identifier() {
        let table = seeded().await;
        let outcome = table.remove(&format!("{}/1", LOC), None).await.unwrap();
        assert!(outcome.is_committed());
        assert_eq!(outcome.records().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_without_identifier_is_invalid() {
        let table = seeded().await;
        let err = table.remove(LOC, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_append_nothing_is_invalid() {
        let table = Table::memory();
        let err = table.append(LOC, Vec::<Record>::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_drop_file() {
        let table = seeded().await;
        table.drop_file(LOC).await.unwrap();
        assert_eq!(table.pull(LOC).await.unwrap(), None);
        assert!(table.drop_file(LOC).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_location_fails_locally() {
        let table = Table::memory();
        let err = table.append("people.json", record(json!({"id": 1})).unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidLocation { .. }));
    }

    #[tokio::test]
    async fn test_forge_writes_need_credentials() {
        let table = Table::forge();
        let err = table.append(LOC, record(json!({"id": 1})).unwrap()).await.unwrap_err();
        assert_eq!(
            err,
            Error::Unauthenticated {
                operation: "append".into()
            }
        );
    }

    #[test]
    fn test_forge_table_starts_with_default_options() {
        let table = Table::forge();
        assert_eq!(table.options(), &Options::default());
        assert!(table.substrate().requires_credentials());
    }

    #[test]
    fn test_reset_keeps_substrate() {
        let table = Table::memory().with_options(Options::default().with_branch("dev"));
        assert_eq!(table.options().branch, "dev");
        let reset = table.reset();
        assert_eq!(reset.options(), &Options::default());
        assert!(Arc::ptr_eq(table.substrate(), reset.substrate()));
    }

    #[test]
    fn test_record_helper() {
        assert!(record(json!({"id": 1})).is_ok());
        assert!(record(json!([1])).is_err());
    }
}
