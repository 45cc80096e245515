//! MongoDB adapters for the storer contract.
//!
//! Two adapters share one builder and one set of query helpers but differ in
//! how they use the driver and in a few documented behaviors:
//!
//! | | [`MongoSessionStorer`] | [`MongoPooledStorer`] |
//! |---|---|---|
//! | Concurrency | fresh session per call | shared pooled client |
//! | Default sort | `-_id` (newest first) | `_id` (oldest first) |
//! | Sort keys honored | all | first only |
//! | `update_with_options` | array filters and upsert | `Unsupported` |
//! | `ensure_index` | `createIndexes` | `Unsupported` |
//!
//! Both delete physically, and both map driver failures to
//! [`StorerError::Driver`](storer_core::error::StorerError::Driver), except
//! driver-side argument validation which becomes `InvalidArgument`.
//!
//! To use these adapters through the facade, enable the `mongodb` feature:
//!
//! ```toml
//! [dependencies]
//! storer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use storer::{mongodb::MongoSessionStorer, storer::{Storer, StorerBuilder}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storer = MongoSessionStorer::builder("mongodb://localhost:27017/app")
//!         .build()
//!         .await?;
//!
//!     storer.close().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as storer_mongodb;

pub mod connect;
pub mod pooled;
pub mod query;
pub mod session;

pub(crate) mod error;

pub use connect::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_OPERATION_TIMEOUT, MongoStorerBuilder};
pub use pooled::MongoPooledStorer;
pub use query::soft_delete;
pub use session::MongoSessionStorer;

pub use mongodb::options::IndexOptions;
