//! Pagination parameters, sort keys and result pages.
//!
//! [`PaginationParams`] is the limit/page/sort triple every `find` call is
//! governed by. Pages are 0-indexed: page `n` skips `n * limit` records.

use serde::{Deserialize, Serialize};

use crate::error::{StorerError, StorerResult};

/// Number of records per page when a backend has nothing better to offer.
pub const DEFAULT_LIMIT: usize = 50;

/// Sort direction for a single sort key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// One parsed element of [`PaginationParams::sort_by`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Parses a single key such as `"-created_at"` or `"name"`.
    ///
    /// A leading `-` means descending, a leading `+` or no prefix means ascending.
    pub fn parse(key: &str) -> StorerResult<Self> {
        let key = key.trim();
        let (field, direction) = match key.strip_prefix('-') {
            Some(field) => (field, SortDirection::Desc),
            None => (key.strip_prefix('+').unwrap_or(key), SortDirection::Asc),
        };

        if field.is_empty() {
            return Err(StorerError::InvalidArgument(format!("empty sort field in `{key}`")));
        }

        Ok(Self { field: field.to_string(), direction })
    }
}

/// Parameters selecting which subset of matching records a `find` returns,
/// and in which order.
///
/// # Example
///
/// ```ignore
/// use storer::page::PaginationParams;
///
/// let params = PaginationParams::new(10, "-created_at,name", 2);
/// assert_eq!(params.skip(), 20);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaginationParams {
    /// Maximum number of records per page. Must be greater than zero.
    pub limit: usize,
    /// Comma separated field names, `-` prefixed for descending order.
    /// Empty means the backend's natural order.
    pub sort_by: String,
    /// The page index (0-indexed).
    pub page: usize,
}

impl PaginationParams {
    /// Creates new pagination parameters.
    pub fn new(limit: usize, sort_by: impl Into<String>, page: usize) -> Self {
        Self { limit, sort_by: sort_by.into(), page }
    }

    /// Creates a new builder for constructing pagination parameters.
    pub fn builder() -> PaginationParamsBuilder {
        PaginationParamsBuilder::new()
    }

    /// Number of records to skip for this page.
    pub fn skip(&self) -> usize {
        self.page.saturating_mul(self.limit)
    }

    /// Parses [`sort_by`](Self::sort_by) into its keys, in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`StorerError::InvalidArgument`] if any element is empty.
    pub fn sort_keys(&self) -> StorerResult<Vec<SortKey>> {
        if self.sort_by.trim().is_empty() {
            return Ok(Vec::new());
        }

        self.sort_by
            .split(',')
            .map(SortKey::parse)
            .collect()
    }

    /// The first sort key, if any. Backends that can only sort on a single
    /// field use this and ignore the rest.
    pub fn primary_sort_key(&self) -> StorerResult<Option<SortKey>> {
        Ok(self.sort_keys()?.into_iter().next())
    }

    /// Checks the invariants a backend relies on before issuing a query.
    pub fn validate(&self) -> StorerResult<()> {
        if self.limit == 0 {
            return Err(StorerError::InvalidArgument("pagination limit must be greater than zero".into()));
        }

        self.sort_keys().map(|_| ())
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, sort_by: String::new(), page: 0 }
    }
}

/// Builder for constructing [`PaginationParams`] instances.
///
/// Unset values fall back to `limit = 50`, `page = 0` and natural order.
#[derive(Debug, Default)]
pub struct PaginationParamsBuilder {
    limit: Option<usize>,
    sort_by: Option<String>,
    page: Option<usize>,
}

impl PaginationParamsBuilder {
    /// Creates a new builder with no parameters set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of records per page.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the sort specification, e.g. `"-_id"` or `"last_name,first_name"`.
    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    /// Sets the page index (0-indexed).
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Builds and returns the [`PaginationParams`].
    pub fn build(self) -> PaginationParams {
        PaginationParams {
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            sort_by: self.sort_by.unwrap_or_default(),
            page: self.page.unwrap_or(0),
        }
    }
}

/// A single page of decoded records plus navigation metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The records on this page.
    pub items: Vec<T>,
    /// Total number of matching records across all pages.
    pub count: u64,
    /// The next page index, if more records follow.
    pub next_page: Option<usize>,
    /// The previous page index, if this is not the first page.
    pub previous_page: Option<usize>,
}

impl<T> Page<T> {
    /// Assembles a page from the records fetched for `params` and the total
    /// match count.
    pub fn from_parts(items: Vec<T>, count: u64, params: &PaginationParams) -> Self {
        let seen = params.skip().saturating_add(items.len()) as u64;

        Self {
            next_page: (seen < count).then(|| params.page + 1),
            previous_page: params.page.checked_sub(1),
            items,
            count,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }
}
