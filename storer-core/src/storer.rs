//! The storer contract.
//!
//! [`Storer`] is the operation set every backend implements and every caller
//! depends on. Queries, changes and pipelines are BSON documents interpreted
//! by the backend; results are written into caller-owned targets.
//!
//! # Examples
//!
//! ```ignore
//! use storer::prelude::*;
//! use bson::{doc, Document};
//!
//! async fn active_users(storer: &dyn Storer) -> StorerResult<Vec<Document>> {
//!     let mut users = Vec::new();
//!     let params = storer.new_pagination_params();
//!
//!     storer.find("users", &doc! { "active": true }, &mut users, Some(&params)).await?;
//!
//!     Ok(users)
//! }
//! ```

use async_trait::async_trait;
use bson::Document;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::{StorerError, StorerResult},
    page::PaginationParams,
};

/// Backend-specific modifiers for [`Storer::update_with_options`].
///
/// A backend that cannot apply a modifier fails with
/// [`StorerError::Unsupported`] instead of running a plain update.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    /// Filters selecting which array elements positional `$[<id>]` operators touch.
    pub array_filters: Option<Vec<Document>>,
    /// Insert a new record when nothing matches.
    pub upsert: Option<bool>,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_array_filters(mut self, filters: impl IntoIterator<Item = Document>) -> Self {
        self.array_filters = Some(filters.into_iter().collect());
        self
    }

    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }
}

/// Abstract data-access contract implemented by every backend.
///
/// # Thread Safety
///
/// Implementations are `Send + Sync`; how concurrent calls are multiplexed
/// (session per call, pooled client, locks) is backend-specific and
/// documented by the implementer.
///
/// # Error Handling
///
/// Every operation returns a [`StorerResult`]. Backends map native failures
/// into [`StorerError`]; only [`StorerError::NotFound`] is meant for
/// programmatic branching.
///
/// # Soft Delete
///
/// Soft deletion is a calling convention: set a marker field through
/// [`update`](Self::update). The contract does not enforce it, and whether
/// [`delete`](Self::delete) removes records physically is documented per
/// backend.
#[async_trait]
pub trait Storer: Send + Sync + Debug {
    /// Finds every record in `table` matching `query` and writes one page of
    /// them into `result`.
    ///
    /// Records are ordered by `pagination.sort_by`, the first
    /// `pagination.skip()` are skipped and at most `pagination.limit` are
    /// returned. With `None` the backend's
    /// [`new_pagination_params`](Self::new_pagination_params) apply. No match
    /// leaves `result` empty and is not an error.
    async fn find(
        &self,
        table: &str,
        query: &Document,
        result: &mut Vec<Document>,
        pagination: Option<&PaginationParams>,
    ) -> StorerResult<()>;

    /// Writes the first record matching `query` into `result`.
    ///
    /// Fails with [`StorerError::NotFound`] when nothing matches.
    async fn find_one(&self, table: &str, query: &Document, result: &mut Document) -> StorerResult<()>;

    /// Inserts one record.
    async fn create(&self, table: &str, object: &Document) -> StorerResult<()>;

    /// Inserts a batch of records. Atomicity across the batch is
    /// backend-specific.
    async fn create_many(&self, table: &str, objects: &[Document]) -> StorerResult<()>;

    /// Applies `change` to every record matching `query`. Zero matches is not
    /// an error.
    async fn update(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()>;

    /// Explicit batch variant of [`update`](Self::update).
    async fn update_many(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()>;

    /// Applies `change` with backend-specific modifiers.
    ///
    /// Returns [`StorerError::Unsupported`] if the backend cannot honor
    /// `options`; it never silently falls back to a plain update.
    async fn update_with_options(
        &self,
        table: &str,
        query: &Document,
        change: &Document,
        options: &UpdateOptions,
    ) -> StorerResult<()>;

    /// Removes every record matching `query`.
    async fn delete(&self, table: &str, query: &Document) -> StorerResult<()>;

    /// Explicit batch variant of [`delete`](Self::delete).
    async fn delete_many(&self, table: &str, query: &Document) -> StorerResult<()>;

    /// Counts the records matching `query`.
    async fn count(&self, table: &str, query: &Document) -> StorerResult<u64>;

    /// Runs a backend-native aggregation pipeline and writes its output into
    /// `result`. Pipeline syntax is not portable across backends.
    async fn aggregate(&self, table: &str, pipeline: &[Document], result: &mut Vec<Document>) -> StorerResult<()>;

    /// Releases the underlying connection. Calling it again is a no-op on
    /// every backend in this workspace.
    async fn close(&self) -> StorerResult<()>;

    /// This backend's default pagination.
    fn new_pagination_params(&self) -> PaginationParams;
}

/// Rejects empty table names before they reach a driver.
pub fn ensure_table(table: &str) -> StorerResult<()> {
    if table.trim().is_empty() {
        return Err(StorerError::InvalidArgument("table name must not be empty".into()));
    }

    Ok(())
}

macro_rules! forward_storer {
    ($([$($generics:tt)*] $wrapper:ty),* $(,)?) => {$(
        #[async_trait]
        impl<$($generics)*> Storer for $wrapper
        where
            S: Storer + ?Sized,
        {
            async fn find(
                &self,
                table: &str,
                query: &Document,
                result: &mut Vec<Document>,
                pagination: Option<&PaginationParams>,
            ) -> StorerResult<()> {
                (**self)
                    .find(table, query, result, pagination)
                    .await
            }

            async fn find_one(&self, table: &str, query: &Document, result: &mut Document) -> StorerResult<()> {
                (**self).find_one(table, query, result).await
            }

            async fn create(&self, table: &str, object: &Document) -> StorerResult<()> {
                (**self).create(table, object).await
            }

            async fn create_many(&self, table: &str, objects: &[Document]) -> StorerResult<()> {
                (**self).create_many(table, objects).await
            }

            async fn update(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()> {
                (**self).update(table, query, change).await
            }

            async fn update_many(&self, table: &str, query: &Document, change: &Document) -> StorerResult<()> {
                (**self).update_many(table, query, change).await
            }

            async fn update_with_options(
                &self,
                table: &str,
                query: &Document,
                change: &Document,
                options: &UpdateOptions,
            ) -> StorerResult<()> {
                (**self)
                    .update_with_options(table, query, change, options)
                    .await
            }

            async fn delete(&self, table: &str, query: &Document) -> StorerResult<()> {
                (**self).delete(table, query).await
            }

            async fn delete_many(&self, table: &str, query: &Document) -> StorerResult<()> {
                (**self).delete_many(table, query).await
            }

            async fn count(&self, table: &str, query: &Document) -> StorerResult<u64> {
                (**self).count(table, query).await
            }

            async fn aggregate(
                &self,
                table: &str,
                pipeline: &[Document],
                result: &mut Vec<Document>,
            ) -> StorerResult<()> {
                (**self)
                    .aggregate(table, pipeline, result)
                    .await
            }

            async fn close(&self) -> StorerResult<()> {
                (**self).close().await
            }

            fn new_pagination_params(&self) -> PaginationParams {
                (**self).new_pagination_params()
            }
        }
    )*};
}

forward_storer!(['a, S] &'a S, [S] Box<S>, [S] Arc<S>);

/// Factory for backend instances.
///
/// Construction is total: it yields a usable storer or an error, never a
/// partially initialized one.
#[async_trait]
pub trait StorerBuilder {
    type Storer: Storer;

    async fn build(self) -> StorerResult<Self::Storer>;
}
