//! Convenient re-exports of commonly used types from storer.
//!
//! ```ignore
//! use storer::prelude::*;
//! ```

pub use storer_core::{
    storer::{Storer, StorerBuilder, UpdateOptions},
    table::{StorerExt, Table},
    page::{DEFAULT_LIMIT, Page, PaginationParams, PaginationParamsBuilder, SortDirection, SortKey},
    error::{ErrorKind, StorerError, StorerResult},
};
