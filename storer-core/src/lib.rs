//! Core contract of the storer project: one data-access interface over
//! incompatible document-store drivers.
//!
//! This crate provides:
//!
//! - **Storer contract** ([`storer`]) - The operation set every backend implements
//! - **Pagination** ([`page`]) - Limit/page/sort parameters, sort key parsing and result pages
//! - **Typed tables** ([`table`]) - Decoding results into caller types
//! - **Error handling** ([`error`]) - The four error kinds every backend maps into
//!
//! Queries, changes and pipelines are [`bson::Document`] values; their dialect
//! belongs to the backend that interprets them.

#[allow(unused_extern_crates)]
extern crate self as storer_core;

pub mod error;
pub mod page;
pub mod storer;
pub mod table;
