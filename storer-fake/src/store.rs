//! Capture-and-replay storer for unit tests.
//!
//! [`FakeStorer`] never evaluates a query. Reads hand back a fixture
//! configured per table together with one configured error, and record the
//! query they were given so tests can assert on what the code under test
//! asked for.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, ser::serialize_to_bson};

use storer_core::{
    error::{StorerError, StorerResult},
    page::PaginationParams,
    storer::{Storer, StorerBuilder, UpdateOptions},
};

type TableMap<T> = HashMap<String, T>;


/// In-memory test double for the [`Storer`] contract.
///
/// # Behavior
///
/// - `find` / `find_one` record the query, copy the table's fixture into the
///   result target and return the configured error, independently of each other.
/// - `update`, `update_many` and `update_with_options` record query and change.
/// - `count` records the query and always reports zero, so tests assert on the
///   captured query rather than on a simulated count.
/// - `create`, `create_many`, `delete`, `delete_many` and `aggregate` do
///   nothing and succeed. Deletes are expected to be soft deletes issued
///   through `update`.
///
/// # Thread Safety
///
/// `FakeStorer` is cloneable and clones share the same fixtures and captures.
/// Maps sit behind async read-write locks, but concurrent callers overwrite
/// each other's captures (last write wins); tests that need a particular
/// capture must sequence their calls.
///
/// # Panics
///
/// Reads panic when a table's fixture does not fit the result target, e.g. a
/// string fixture for `find`. That is a broken test setup, not a runtime
/// condition.
///
/// # Example
///
/// ```ignore
/// use storer_fake::FakeStorer;
/// use storer_core::storer::Storer;
/// use bson::{bson, doc, Document};
///
/// let storer = FakeStorer::builder()
///     .with_result("users", bson!([{ "id": 1, "name": "a" }]))
///     .build_now();
///
/// let mut user = Document::new();
/// storer.find_one("users", &doc! { "id": 1 }, &mut user).await?;
///
/// assert_eq!(user, doc! { "id": 1, "name": "a" });
/// assert_eq!(storer.last_query("users").await, Some(doc! { "id": 1 }));
/// ```
#[derive(Default, Clone, Debug)]
pub struct FakeStorer {
    /// Fixture returned by reads: table -> result value
    results: Arc<RwLock<TableMap<Bson>>>,
    /// Error returned by every `find` and `find_one`
    error: Arc<RwLock<Option<StorerError>>>,
    /// Last query seen per table
    queries: Arc<RwLock<TableMap<Document>>>,
    /// Last change seen per table
    changes: Arc<RwLock<TableMap<Document>>>,
}

impl FakeStorer {
    /// Creates a double that replays `results` and fails reads with `error`.
    pub fn new(results: HashMap<String, Bson>, error: Option<StorerError>) -> Self {
        Self {
            results: Arc::new(RwLock::new(results)),
            error: Arc::new(RwLock::new(error)),
            queries: Arc::new(RwLock::new(TableMap::new())),
            changes: Arc::new(RwLock::new(TableMap::new())),
        }
    }

    /// Creates a builder for configuring fixtures fluently.
    pub fn builder() -> FakeStorerBuilder {
        FakeStorerBuilder::default()
    }

    /// The most recent query captured for `table`, if any.
    pub async fn last_query(&self, table: &str) -> Option<Document> {
        self.queries
            .read()
            .await
            .get(table)
            .cloned()
    }

    /// The most recent change captured for `table`, if any.
    pub async fn last_change(&self, table: &str) -> Option<Document> {
        self.changes
            .read()
            .await
            .get(table)
            .cloned()
    }

    /// Replaces the error returned by reads. `None` makes reads succeed.
    pub async fn set_error(&self, error: Option<StorerError>) {
        *self.error.write().await = error;
    }

    /// Replaces the fixture replayed for `table`.
    pub async fn set_result(&self, table: &str, result: impl Into<Bson>) {
        self.results
            .write()
            .await
            .insert(table.to_string(), result.into());
    }

    async fn capture_query(&self, table: &str, query: &Document) {
        tracing::trace!(table, %query, "captured query");

        self.queries
            .write()
            .await
            .insert(table.to_string(), query.clone());
    }

    async fn capture_change(&self, table: &str, query: &Document, change: &Document) {
        self.capture_query(table, query).await;

        tracing::trace!(table, %change, "captured change");

        self.changes
            .write()
            .await
            .insert(table.to_string(), change.clone());
    }

    async fn configured_error(&self) -> StorerResult<()> {
        match &*self.error.read().await {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn fixture(&self, table: &str) -> Option<Bson> {
        self.results
            .read()
            .await
            .get(table)
            .cloned()
    }
}

/// Converts a fixture into the rows `find` hands back.
fn fixture_rows(table: &str, fixture: Option<Bson>) -> Vec<Document> {
    match fixture {
        None | Some(Bson::Null) => Vec::new(),
        Some(Bson::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Bson::Document(document) => document,
                other => panic!(
                    "fixture for table `{table}` holds a {:?} element, expected documents",
                    other.element_type()
                ),
            })
            .collect(),
        Some(other) => panic!(
            "fixture for table `{table}` is a {:?}, expected an array of documents",
            other.element_type()
        ),
    }
}

/// Converts a fixture into the record `find_one` hands back. Array fixtures
/// yield their first element.
fn fixture_record(table: &str, fixture: Option<Bson>) -> Document {
    match fixture {
        None | Some(Bson::Null) => Document::new(),
        Some(Bson::Document(document)) => document,
        Some(Bson::Array(items)) => fixture_rows(table, Some(Bson::Array(items)))
            .into_iter()
            .next()
            .unwrap_or_default(),
        Some(other) => panic!(
            "fixture for table `{table}` is a {:?}, expected a document",
            other.element_type()
        ),
    }
}


#[async_trait]
impl Storer for FakeStorer {
    async fn find(
        &self,
        table: &str,
        query: &Document,
        result: &mut Vec<Document>,
        _pagination: Option<&PaginationParams>,
    ) -> StorerResult<()> {
        self.capture_query(table, query).await;
        *result = fixture_rows(table, self.fixture(table).await);

        self.configured_error().await
    }

    async fn find_one(&self, table: &str, query: &Document, result: &mut Document) -> StorerResult<()> {
        self.capture_query(table, query).await;
        *result = fixture_record(table, self.fixture(table).await);

        self.configured_error().await
    }

    async fn create(&self, _table: &str, _object: &Document) -> StorerResult<()> {
        Ok(())
    }

    async fn create_many(&self, _table: &str, _objects: &[Document]) -> StorerResult<()> {
        Ok(())
    }

    async fn update(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()> {
        self.capture_change(table, query, change).await;

        Ok(())
    }

    async fn update_many(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()> {
        self.capture_change(table, query, change).await;

        Ok(())
    }

    async fn update_with_options(
        &self,
        table: &str,
        query: &Document,
        change: &Document,
        _options: &UpdateOptions,
    ) -> StorerResult<()> {
        self.capture_change(table, query, change).await;

        Ok(())
    }

    async fn delete(&self, _table: &str, _query: &Document) -> StorerResult<()> {
        // Soft deletes go through `update`
        Ok(())
    }

    async fn delete_many(&self, _table: &str, _query: &Document) -> StorerResult<()> {
        Ok(())
    }

    async fn count(&self, table: &str, query: &Document) -> StorerResult<u64> {
        self.capture_query(table, query).await;

        Ok(0)
    }

    async fn aggregate(&self, _table: &str, _pipeline: &[Document], _result: &mut Vec<Document>) -> StorerResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorerResult<()> {
        Ok(())
    }

    fn new_pagination_params(&self) -> PaginationParams {
        PaginationParams::default()
    }
}


/// Builder for constructing [`FakeStorer`] instances.
///
/// # Example
///
/// ```ignore
/// use storer_fake::FakeStorer;
/// use serde_json::json;
///
/// let storer = FakeStorer::builder()
///     .with_json_result("orders", json!([]))?
///     .with_error(StorerError::NotFound)
///     .build_now();
/// ```
#[derive(Default, Debug)]
pub struct FakeStorerBuilder {
    results: HashMap<String, Bson>,
    error: Option<StorerError>,
}

impl FakeStorerBuilder {
    /// Sets the fixture replayed for `table`.
    pub fn with_result(mut self, table: &str, result: impl Into<Bson>) -> Self {
        self.results.insert(table.to_string(), result.into());
        self
    }

    /// Sets the fixture replayed for `table` from a JSON value.
    ///
    /// # Errors
    ///
    /// [`StorerError::InvalidArgument`] if the value has no BSON representation.
    pub fn with_json_result(self, table: &str, result: serde_json::Value) -> StorerResult<Self> {
        let result = serialize_to_bson(&result)?;

        Ok(self.with_result(table, result))
    }

    /// Sets the error returned by every read.
    pub fn with_error(mut self, error: StorerError) -> Self {
        self.error = Some(error);
        self
    }

    /// Builds the double without going through [`StorerBuilder`].
    pub fn build_now(self) -> FakeStorer {
        FakeStorer::new(self.results, self.error)
    }
}

#[async_trait]
impl StorerBuilder for FakeStorerBuilder {
    type Storer = FakeStorer;

    /// Always succeeds.
    async fn build(self) -> StorerResult<Self::Storer> {
        Ok(self.build_now())
    }
}

#[cfg(test)]
mod tests {
    use bson::{bson, doc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use storer_core::{error::ErrorKind, table::StorerExt};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: i32,
        name: String,
    }

    fn users_fixture() -> FakeStorer {
        FakeStorer::builder()
            .with_result("users", bson!([{ "id": 1, "name": "a" }]))
            .build_now()
    }

    #[tokio::test]
    async fn find_one_replays_first_row_and_captures_query() {
        let storer = users_fixture();
        let mut dest = Document::new();

        storer.find_one("users", &doc! { "id": 1 }, &mut dest).await.unwrap();

        assert_eq!(dest, doc! { "id": 1, "name": "a" });
        assert_eq!(storer.last_query("users").await, Some(doc! { "id": 1 }));
    }

    #[tokio::test]
    async fn find_one_accepts_document_fixture() {
        let storer = FakeStorer::builder()
            .with_result("settings", doc! { "theme": "dark" })
            .build_now();
        let mut dest = Document::new();

        storer.find_one("settings", &doc! {}, &mut dest).await.unwrap();

        assert_eq!(dest, doc! { "theme": "dark" });
    }

    #[tokio::test]
    async fn configured_error_does_not_stop_result_population() {
        let storer = FakeStorer::builder()
            .with_json_result("orders", json!([{ "sku": "x-1" }]))
            .unwrap()
            .with_error(StorerError::NotFound)
            .build_now();
        let mut dest = vec![doc! { "stale": true }];

        let err = storer.find("orders", &doc! {}, &mut dest, None).await.unwrap_err();

        assert_eq!(err, StorerError::NotFound);
        assert_eq!(dest, vec![doc! { "sku": "x-1" }]);
    }

    #[tokio::test]
    async fn reconfiguring_error_keeps_the_same_rows() {
        let storer = users_fixture();
        let mut first = Vec::new();
        let mut second = Vec::new();

        storer.find("users", &doc! {}, &mut first, None).await.unwrap();
        storer.set_error(Some(StorerError::Driver("down".into()))).await;
        let err = storer.find("users", &doc! {}, &mut second, None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Driver);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_fixture_empties_the_target() {
        let storer = FakeStorer::builder()
            .with_error(StorerError::NotFound)
            .build_now();
        let mut dest = vec![doc! { "stale": true }];

        let err = storer.find("orders", &doc! {}, &mut dest, None).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(dest.is_empty());
    }

    #[tokio::test]
    async fn last_query_tracks_each_table_independently() {
        let storer = users_fixture();
        let mut rows = Vec::new();

        storer.find("users", &doc! { "name": "a" }, &mut rows, None).await.unwrap();
        storer.update("orders", &doc! { "id": 7 }, &doc! { "$set": { "paid": true } }).await.unwrap();
        storer.find("users", &doc! { "name": "b" }, &mut rows, None).await.unwrap();

        assert_eq!(storer.last_query("users").await, Some(doc! { "name": "b" }));
        assert_eq!(storer.last_query("orders").await, Some(doc! { "id": 7 }));
        assert_eq!(storer.last_change("orders").await, Some(doc! { "$set": { "paid": true } }));
        assert_eq!(storer.last_change("users").await, None);
        assert_eq!(storer.last_query("invoices").await, None);
    }

    #[tokio::test]
    async fn update_with_options_captures_like_update() {
        let storer = FakeStorer::default();
        let options = UpdateOptions::new().with_array_filters([doc! { "elem.qty": { "$gt": 1 } }]);

        storer
            .update_with_options("carts", &doc! { "id": 3 }, &doc! { "$inc": { "items.$[elem].qty": -1 } }, &options)
            .await
            .unwrap();

        assert_eq!(storer.last_query("carts").await, Some(doc! { "id": 3 }));
        assert_eq!(storer.last_change("carts").await, Some(doc! { "$inc": { "items.$[elem].qty": -1 } }));
    }

    #[tokio::test]
    async fn count_is_always_zero_but_captures_query() {
        let storer = users_fixture();

        let count = storer.count("users", &doc! { "name": "a" }).await.unwrap();

        assert_eq!(count, 0);
        assert_eq!(storer.last_query("users").await, Some(doc! { "name": "a" }));
    }

    #[tokio::test]
    async fn writes_and_aggregate_are_no_ops() {
        let storer = users_fixture();
        let mut out = vec![doc! { "kept": true }];

        storer.create("users", &doc! { "id": 2 }).await.unwrap();
        storer.create_many("users", &[doc! { "id": 3 }]).await.unwrap();
        storer.delete("users", &doc! { "id": 1 }).await.unwrap();
        storer.delete_many("users", &doc! {}).await.unwrap();
        storer.aggregate("users", &[doc! { "$match": {} }], &mut out).await.unwrap();

        assert_eq!(out, vec![doc! { "kept": true }]);
        assert_eq!(storer.last_query("users").await, None);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_defaults_are_first_page() {
        let storer = FakeStorer::default();

        assert!(storer.close().await.is_ok());
        assert!(storer.close().await.is_ok());

        let params = storer.new_pagination_params();

        assert!(params.limit > 0);
        assert_eq!(params.page, 0);
    }

    #[tokio::test]
    async fn clones_share_captures() {
        let storer = FakeStorer::default();
        let handle = storer.clone();

        handle.count("users", &doc! { "active": true }).await.unwrap();

        assert_eq!(storer.last_query("users").await, Some(doc! { "active": true }));
    }

    #[tokio::test]
    async fn typed_tables_decode_fixtures() {
        let storer = users_fixture();
        let mut user = User { id: 0, name: String::new() };

        storer.table("users").find_one(&doc! { "id": 1 }, &mut user).await.unwrap();

        assert_eq!(user, User { id: 1, name: "a".into() });
    }

    #[tokio::test]
    async fn builder_trait_builds() {
        let storer = FakeStorer::builder().build().await.unwrap();

        assert_eq!(storer.count("t", &doc! {}).await, Ok(0));
    }

    #[tokio::test]
    #[should_panic(expected = "expected an array of documents")]
    async fn find_panics_on_shape_mismatch() {
        let storer = FakeStorer::builder()
            .with_result("users", "not rows")
            .build_now();
        let mut rows = Vec::new();

        let _ = storer.find("users", &doc! {}, &mut rows, None).await;
    }
}
