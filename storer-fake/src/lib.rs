//! In-memory test double for the storer contract.
//!
//! [`FakeStorer`] lets code that depends on a [`Storer`](storer_core::storer::Storer)
//! be unit tested without a database. It does not evaluate queries: it
//! replays one fixture per table, returns one configured error from reads,
//! and records the last query and change submitted per table.
//!
//! # Quick Start
//!
//! ```ignore
//! use storer_fake::FakeStorer;
//! use storer_core::{error::StorerError, storer::Storer};
//! use bson::{bson, doc};
//!
//! #[tokio::test]
//! async fn deactivates_user() {
//!     let storer = FakeStorer::builder()
//!         .with_result("users", bson!([{ "id": 1, "active": true }]))
//!         .build_now();
//!
//!     deactivate(&storer, 1).await.unwrap();
//!
//!     assert_eq!(storer.last_query("users").await, Some(doc! { "id": 1 }));
//!     assert_eq!(storer.last_change("users").await, Some(doc! { "$set": { "active": false } }));
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as storer_fake;

pub mod store;

pub use store::{FakeStorer, FakeStorerBuilder};
