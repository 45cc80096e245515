//! Pooled-client MongoDB adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use futures::TryStreamExt;
use bson::Document;
use mongodb::{Client, Collection, Database, options::IndexOptions};

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

const BACKEND: &str = "mongodb-pooled";

/// MongoDB storer running every call directly on one shared, pooled client.
///
/// Concurrent calls are multiplexed by the driver's connection pool; the
/// adapter itself holds no mutable state beyond the close flag.
///
/// # Semantics
///
/// - Default pagination: `limit = 50`, `page = 0`, `sort_by = "_id"`
///   (oldest first).
/// - Only the first sort key is honored; further keys are ignored.
/// - `update` and `update_many` update every matching record.
/// - `update_with_options` and [`ensure_index`](Self::ensure_index) are not
///   supported and fail with [`StorerError::Unsupported`].
/// - `delete` and `delete_many` physically remove every matching record.
/// - `create_many` is an ordered insert and not atomic.
/// - `close` disconnects the client; later calls to `close` are no-ops.
#[derive(Debug)]
pub struct MongoPooledStorer {
    client: Client,
    database: Database,
    config: ConnectConfig,
    closed: AtomicBool,
}

impl MongoPooledStorer {
    /// Creates a builder for the given connection string.
    pub fn builder(uri: &str) -> MongoStorerBuilder<MongoPooledStorer> {
        MongoStorerBuilder::new(uri)
    }

    fn collection(&self, table: &str) -> Collection<Document> {
        self.database.collection(table)
    }

    /// Index management is not available on this adapter; use
    /// [`MongoSessionStorer::ensure_index`](crate::MongoSessionStorer::ensure_index).
    pub async fn ensure_index(&self, table: &str, keys: Document, _options: Option<IndexOptions>) -> StorerResult<()> {
        self.check(table)?;
        ensure_index_keys(&keys)?;

        Err(StorerError::Unsupported(
            "ensure_index is not available on the pooled MongoDB storer".into(),
        ))
    }

    fn check(&self, table: &str) -> StorerResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorerError::Driver("storer is closed".into()));
        }

        ensure_table(table)
    }
}

#[async_trait]
impl Storer for MongoPooledStorer {
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
        let options = find_options(&params, sort_document(params.primary_sort_key()?.as_ref()));

        run_op(BACKEND, "find", table, self.config.operation_timeout, async {
            *result = self.collection(table)
                .find(query.clone())
                .with_options(options)
                .await
                .map_err(driver_error)?
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
            *result = self.collection(table)
                .find_one(query.clone())
                .await
                .map_err(driver_error)?
                .ok_or(StorerError::NotFound)?;

            Ok(())
        })
        .await
    }

    async fn create(&self, table: &str, object: &Document) -> StorerResult<()> {
        self.check(table)?;

        run_op(BACKEND, "create", table, self.config.operation_timeout, async {
            self.collection(table)
                .insert_one(object)
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
            self.collection(table)
                .insert_many(objects)
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn update(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()> {
        self.update_many(table, query, change).await
    }

    async fn update_many(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()> {
        self.check(table)?;

        run_op(BACKEND, "update", table, self.config.operation_timeout, async {
            self.collection(table)
                .update_many(query.clone(), change.clone())
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn update_with_options(
        &self,
        table: &str,
        _query: &Document,
        _change: &Document,
        _options: &UpdateOptions,
    ) -> StorerResult<()> {
        self.check(table)?;

        Err(StorerError::Unsupported(
            "update_with_options is not available on the pooled MongoDB storer, use update or update_many".into(),
        ))
    }

    async fn delete(&self, table: &str, query: &Document) -> StorerResult<()> {
        self.delete_many(table, query).await
    }

    async fn delete_many(&self, table: &str, query: &Document) -> StorerResult<()> {
        self.check(table)?;

        run_op(BACKEND, "delete", table, self.config.operation_timeout, async {
            self.collection(table)
                .delete_many(query.clone())
                .await
                .map_err(driver_error)?;

            Ok(())
        })
        .await
    }

    async fn count(&self, table: &str, query: &Document) -> StorerResult<u64> {
        self.check(table)?;

        run_op(BACKEND, "count", table, self.config.operation_timeout, async {
            self.collection(table)
                .count_documents(query.clone())
                .await
                .map_err(driver_error)
        })
        .await
    }

    async fn aggregate(&self, table: &str, pipeline: &[Document], result: &mut Vec<Document>) -> StorerResult<()> {
        self.check(table)?;

        run_op(BACKEND, "aggregate", table, self.config.operation_timeout, async {
            *result = self.collection(table)
                .aggregate(pipeline.to_vec())
                .await
                .map_err(driver_error)?
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
            .unwrap_or_else(|| PaginationParams::new(DEFAULT_LIMIT, "_id", 0))
    }
}

#[async_trait]
impl StorerBuilder for MongoStorerBuilder<MongoPooledStorer> {
    type Storer = MongoPooledStorer;

    async fn build(self) -> StorerResult<Self::Storer> {
        let (client, database) = self.config.connect().await?;

        Ok(MongoPooledStorer {
            database: client.database(&database),
            client,
            config: self.config,
            closed: AtomicBool::new(false),
        })
    }
}
