//! Typed access to a single table.
//!
//! [`Table`] wraps any [`Storer`] and converts between caller types and the
//! BSON documents the contract speaks, so call sites can work with their own
//! structs instead of raw documents.
//!
//! # Example
//!
//! ```ignore
//! use storer::prelude::*;
//! use bson::doc;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! # async fn example(storer: &dyn Storer) -> StorerResult<()> {
//! let users = storer.table("users");
//! users.create(&User { id: 1, name: "Alice".into() }).await?;
//!
//! let mut found = Vec::<User>::new();
//! users.find(&doc! { "name": "Alice" }, &mut found, None).await?;
//! # Ok(()) }
//! ```

use bson::{Document, de::deserialize_from_document, ser::serialize_to_document};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::{StorerError, StorerResult},
    page::{Page, PaginationParams},
    storer::{Storer, UpdateOptions},
};

/// A named table bound to a storer reference.
#[derive(Debug)]
pub struct Table<'a, S: Storer + ?Sized> {
    name: String,
    storer: &'a S,
}

impl<'a, S: Storer + ?Sized> Table<'a, S> {
    /// Creates a new table handle.
    pub fn new(name: impl Into<String>, storer: &'a S) -> Self {
        Self { name: name.into(), storer }
    }

    /// Returns the name of this table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finds matching records and decodes them into `result`.
    ///
    /// `result` is overwritten with whatever the backend produced, possibly
    /// nothing, even when the backend also reports an error.
    ///
    /// # Errors
    ///
    /// The backend's error. Otherwise [`StorerError::Driver`] if a record
    /// does not decode into `T`, in which case `result` is left untouched.
    pub async fn find<T>(
        &self,
        query: &Document,
        result: &mut Vec<T>,
        pagination: Option<&PaginationParams>,
    ) -> StorerResult<()>
    where
        T: DeserializeOwned,
    {
        let mut documents = Vec::new();
        let outcome = self.storer
            .find(&self.name, query, &mut documents, pagination)
            .await;

        match decode_all(documents) {
            Ok(decoded) => {
                *result = decoded;
                outcome
            }
            Err(err) => outcome.and(Err(err)),
        }
    }

    /// Finds the first matching record and decodes it into `result`.
    ///
    /// Follows the same rules as [`find`](Self::find): the backend's error
    /// wins over a decode failure, and `result` only changes when the record
    /// decodes. An empty record that `T` cannot represent leaves it as is.
    pub async fn find_one<T>(&self, query: &Document, result: &mut T) -> StorerResult<()>
    where
        T: DeserializeOwned,
    {
        let mut document = Document::new();
        let outcome = self.storer
            .find_one(&self.name, query, &mut document)
            .await;

        match deserialize_from_document(document) {
            Ok(decoded) => {
                *result = decoded;
                outcome
            }
            Err(err) => outcome.and(Err(StorerError::decode(err))),
        }
    }

    /// Fetches one page of matching records together with the total match
    /// count.
    pub async fn find_page<T>(&self, query: &Document, pagination: Option<&PaginationParams>) -> StorerResult<Page<T>>
    where
        T: DeserializeOwned,
    {
        let params = match pagination {
            Some(params) => params.clone(),
            None => self.storer.new_pagination_params(),
        };
        let count = self.count(query).await?;
        let mut items = Vec::new();

        self.find(query, &mut items, Some(&params)).await?;

        Ok(Page::from_parts(items, count, &params))
    }

    /// Serializes and inserts one record.
    ///
    /// # Errors
    ///
    /// [`StorerError::InvalidArgument`] if `object` does not serialize to a
    /// document, otherwise the backend's error.
    pub async fn create<T>(&self, object: &T) -> StorerResult<()>
    where
        T: Serialize,
    {
        let document = serialize_to_document(object)?;

        self.storer
            .create(&self.name, &document)
            .await
    }

    /// Serializes and inserts a batch of records.
    pub async fn create_many<T>(&self, objects: &[T]) -> StorerResult<()>
    where
        T: Serialize,
    {
        let documents = objects
            .iter()
            .map(serialize_to_document)
            .collect::<Result<Vec<_>, _>>()?;

        self.storer
            .create_many(&self.name, &documents)
            .await
    }

    /// Applies `change` to every matching record.
    pub async fn update(&self, query: &Document, change: &Document) -> StorerResult<()> {
        self.storer
            .update(&self.name, query, change)
            .await
    }

    /// Explicit batch variant of [`update`](Self::update).
    pub async fn update_many(&self, query: &Document, change: &Document) -> StorerResult<()> {
        self.storer
            .update_many(&self.name, query, change)
            .await
    }

    /// Applies `change` with backend-specific modifiers.
    pub async fn update_with_options(
        &self,
        query: &Document,
        change: &Document,
        options: &UpdateOptions,
    ) -> StorerResult<()> {
        self.storer
            .update_with_options(&self.name, query, change, options)
            .await
    }

    /// Removes every matching record.
    pub async fn delete(&self, query: &Document) -> StorerResult<()> {
        self.storer.delete(&self.name, query).await
    }

    /// Explicit batch variant of [`delete`](Self::delete).
    pub async fn delete_many(&self, query: &Document) -> StorerResult<()> {
        self.storer
            .delete_many(&self.name, query)
            .await
    }

    /// Counts matching records.
    pub async fn count(&self, query: &Document) -> StorerResult<u64> {
        self.storer.count(&self.name, query).await
    }

    /// Runs an aggregation pipeline and decodes its output into `result`.
    pub async fn aggregate<T>(&self, pipeline: &[Document], result: &mut Vec<T>) -> StorerResult<()>
    where
        T: DeserializeOwned,
    {
        let mut documents = Vec::new();

        self.storer
            .aggregate(&self.name, pipeline, &mut documents)
            .await?;

        *result = decode_all(documents)?;

        Ok(())
    }
}

fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> StorerResult<Vec<T>> {
    documents
        .into_iter()
        .map(|document| deserialize_from_document(document).map_err(StorerError::decode))
        .collect()
}

/// Extension trait giving every storer a [`table`](StorerExt::table) accessor.
pub trait StorerExt: Storer {
    /// Gets a typed handle for the table with the given name.
    fn table<'a>(&'a self, name: &str) -> Table<'a, Self> {
        Table::new(name, self)
    }
}

impl<S: Storer + ?Sized> StorerExt for S {}
