//! Session-per-call MongoDB adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use futures::TryStreamExt;
use bson::Document;
use mongodb::{
    Client, ClientSession, Collection, IndexModel,
    options::{IndexOptions, UpdateOptions as MongoUpdateOptions},
};

use storer_core::{
    error::{StorerError, StorerResult},
    page::{DEFAULT_LIMIT, PaginationParams},
    storer::{Storer, StorerBuilder, UpdateOptions, ensure_table},
};

use crate::{
    connect::{ConnectConfig, MongoStorerBuilder, run_op},
    error::driver_error,
    query::{ensure_index_keys, find_options, sort_document},
};

const BACKEND: &str = "mongodb-session";

/// MongoDB storer that checks out a fresh session for every call.
///
/// One long-lived [`Client`] is kept; each operation starts its own
/// [`ClientSession`], uses it exclusively, and drops it before returning, on
/// the error path too. This costs a session checkout per call in exchange for
/// complete isolation between calls.
///
/// # Semantics
///
/// - Default pagination: `limit = 50`, `page = 0`, `sort_by = "-_id"`
///   (newest first).
/// - Every comma separated sort key is honored, in order.
/// - `update` and `update_many` both update every matching record;
///   `update_with_options` applies array filters and upsert.
/// - `delete` and `delete_many` physically remove every matching record.
///   Soft deletes are the caller's job, through `update`.
/// - `create_many` is an ordered insert and not atomic: records before a
///   failing one stay inserted.
/// - [`ensure_index`](Self::ensure_index) creates indexes.
/// - `close` shuts the client down; later calls to `close` are no-ops and
///   every other operation fails with a driver error.
#[derive(Debug)]
pub struct MongoSessionStorer {
    client: Client,
    database: String,
    config: ConnectConfig,
    closed: AtomicBool,
}

impl MongoSessionStorer {
    /// Creates a builder for the given connection string.
    pub fn builder(uri: &str) -> MongoStorerBuilder<MongoSessionStorer> {
        MongoStorerBuilder::new(uri)
    }

    fn collection(&self, table: &str) -> Collection<Document> {
        self.client
            .database(&self.database)
            .collection(table)
    }

    fn check(&self, table: &str) -> StorerResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorerError::Driver("storer is closed".into()));
        }

        ensure_table(table)
    }

    /// Creates an index on `table` unless an identical one already exists.
    ///
    /// `keys` maps field names to index directions or types, e.g.
    /// `doc! { "email": 1 }`.
    pub async fn ensure_index(&self, table: &str, keys: Document, options: Option<IndexOptions>) -> StorerResult<()> {
        self.check(table)?;
        ensure_index_keys(&keys)?;

        let mut model = IndexModel::default();
        model.keys = keys;
        model.options = options;

        run_op(BACKEND, "ensure_index", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;

            self.collection(table)
                .create_index(model)
                .session(&mut session)
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn start_session(&self) -> StorerResult<ClientSession> {
        self.client
            .start_session()
            .await
            .map_err(driver_error)
    }
}

#[async_trait]
impl Storer for MongoSessionStorer {
    async fn find(
        &self,
        table: &str,
        query: &Document,
        result: &mut Vec<Document>,
        pagination: Option<&PaginationParams>,
    ) -> StorerResult<()> {
        self.check(table)?;

        let params = match pagination {
            Some(params) => params.clone(),
            None => self.new_pagination_params(),
        };
        params.validate()?;
        let options = find_options(&params, sort_document(&params.sort_keys()?));

        run_op(BACKEND, "find", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;
            let mut cursor = self.collection(table)
                .find(query.clone())
                .with_options(options)
                .session(&mut session)
                .await
                .map_err(driver_error)?;

            *result = cursor
                .stream(&mut session)
                .try_collect::<Vec<Document>>()
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn find_one(&self, table: &str, query: &Document, result: &mut Document) -> StorerResult<()> {
        self.check(table)?;

        run_op(BACKEND, "find_one", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;
            let found = self.collection(table)
                .find_one(query.clone())
                .session(&mut session)
                .await
                .map_err(driver_error)?;

            *result = found.ok_or(StorerError::NotFound)?;

            Ok(())
        })
        .await
    }

    async fn create(&self, table: &str, object: &Document) -> StorerResult<()> {
        self.check(table)?;

        run_op(BACKEND, "create", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;

            self.collection(table)
                .insert_one(object)
                .session(&mut session)
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn create_many(&self, table: &str, objects: &[Document]) -> StorerResult<()> {
        self.check(table)?;

        if objects.is_empty() {
            return Ok(());
        }

        run_op(BACKEND, "create_many", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;

            self.collection(table)
                .insert_many(objects)
                .session(&mut session)
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn update(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()> {
        self.update_with_options(table, query, change, &UpdateOptions::default())
            .await
    }

    async fn update_many(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()> {
        self.update_with_options(table, query, change, &UpdateOptions::default())
            .await
    }

    async fn update_with_options(
        &self,
        table: &str,
        query: &Document,
        change: &Document,
        options: &UpdateOptions,
    ) -> StorerResult<()> {
        self.check(table)?;

        let mut native = MongoUpdateOptions::default();
        native.array_filters = options.array_filters.clone();
        native.upsert = options.upsert;

        run_op(BACKEND, "update", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;

            self.collection(table)
                .update_many(query.clone(), change.clone())
                .with_options(native)
                .session(&mut session)
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn delete(&self, table: &str, query: &Document) -> StorerResult<()> {
        self.delete_many(table, query).await
    }

    async fn delete_many(&self, table: &str, query: &Document) -> StorerResult<()> {
        self.check(table)?;

        run_op(BACKEND, "delete", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;

            self.collection(table)
                .delete_many(query.clone())
                .session(&mut session)
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn count(&self, table: &str, query: &Document) -> StorerResult<u64> {
        self.check(table)?;

        run_op(BACKEND, "count", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;

            self.collection(table)
                .count_documents(query.clone())
                .session(&mut session)
                .await
                .map_err(driver_error)
        })
        .await
    }

    async fn aggregate(&self, table: &str, pipeline: &[Document], result: &mut Vec<Document>) -> StorerResult<()> {
        self.check(table)?;

        run_op(BACKEND, "aggregate", table, self.config.operation_timeout, async {
            let mut session = self.start_session().await?;
            let mut cursor = self.collection(table)
                .aggregate(pipeline.to_vec())
                .session(&mut session)
                .await
                .map_err(driver_error)?;

            *result = cursor
                .stream(&mut session)
                .try_collect::<Vec<Document>>()
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn close(&self) -> StorerResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.client.clone().shutdown().await;
        tracing::debug!(backend = BACKEND, "closed");

        Ok(())
    }

    fn new_pagination_params(&self) -> PaginationParams {
        self.config
            .default_pagination
            .clone()
            .unwrap_or_else(|| PaginationParams::new(DEFAULT_LIMIT, "-_id", 0))
    }
}

#[async_trait]
impl StorerBuilder for MongoStorerBuilder<MongoSessionStorer> {
    type Storer = MongoSessionStorer;

    async fn build(self) -> StorerResult<Self::Storer> {
        let (client, database) = self.config.connect().await?;

        Ok(MongoSessionStorer {
            client,
            database,
            config: self.config,
            closed: AtomicBool::new(false),
        })
    }
}
