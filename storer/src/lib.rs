//! One data-access contract over document-store drivers.
//!
//! This crate is the entry point of the storer workspace. It re-exports the
//! contract from `storer-core`, the in-memory test double from `storer-fake`
//! and, behind the `mongodb` feature, the MongoDB adapters.
//!
//! # Features
//!
//! - **One contract** - application code depends on [`Storer`](storer::Storer), never on a driver
//! - **Typed tables** - [`StorerExt::table`](table::StorerExt::table) decodes records into your Serde types
//! - **Pagination** - [`PaginationParams`](page::PaginationParams) with comma separated, signed sort keys
//! - **Test double** - [`fake::FakeStorer`] replays fixtures and records what was submitted
//!
//! # Quick Start
//!
//! ```ignore
//! use storer::{prelude::*, fake::FakeStorer};
//! use bson::{bson, doc};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: i32,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> StorerResult<()> {
//!     let storer = FakeStorer::builder()
//!         .with_result("users", bson!([{ "id": 1, "name": "Alice" }]))
//!         .build()
//!         .await?;
//!
//!     let page = storer
//!         .table("users")
//!         .find_page::<User>(&doc! {}, None)
//!         .await?;
//!
//!     println!("users: {:?}", page.items);
//!
//!     storer.close().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! [`Storer`](storer::Storer) is object safe, and `&S`, `Box<S>` and `Arc<S>`
//! forward to `S`, so a backend picked at runtime works the same way:
//!
//! ```ignore
//! use std::sync::Arc;
//! use storer::{prelude::*, fake::FakeStorer};
//!
//! let storer: Arc<dyn Storer> = Arc::new(FakeStorer::default());
//! let params = storer.new_pagination_params();
//! ```
//!
//! # Backends
//!
//! - [`fake`] - Capture-and-replay double for unit tests
//! - [`mongodb`] - Session-per-call and pooled-client MongoDB adapters (requires `mongodb` feature)

pub mod prelude;

pub use storer_core::{error, page, storer, table};

// Re-export BSON types for convenience
pub use bson;

/// In-memory test double.
pub mod fake {
    pub use storer_fake::{FakeStorer, FakeStorerBuilder};
}

/// MongoDB adapters.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use storer_mongodb::{
        DEFAULT_CONNECT_TIMEOUT,
        DEFAULT_OPERATION_TIMEOUT,
        IndexOptions,
        MongoPooledStorer,
        MongoSessionStorer,
        MongoStorerBuilder,
        soft_delete,
    };
}
