//! Translation of storer pagination into MongoDB find options.

use bson::{Document, doc};
use mongodb::options::FindOptions;

use storer_core::{
    error::{StorerError, StorerResult},
    page::{PaginationParams, SortDirection, SortKey},
};

/// Builds a MongoDB sort specification, `None` for natural order.
pub(crate) fn sort_document<'a>(keys: impl IntoIterator<Item = &'a SortKey>) -> Option<Document> {
    let sort = keys
        .into_iter()
        .fold(Document::new(), |mut sort, key| {
            sort.insert(
                key.field.clone(),
                match key.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                },
            );
            sort
        });

    (!sort.is_empty()).then_some(sort)
}

/// Builds skip/limit/sort options for one page.
pub(crate) fn find_options(params: &PaginationParams, sort: Option<Document>) -> FindOptions {
    let mut options = FindOptions::default();

    options.skip = Some(params.skip() as u64);
    options.limit = Some(i64::try_from(params.limit).unwrap_or(i64::MAX));
    options.sort = sort;

    options
}

/// Rejects an index specification without keys.
pub(crate) fn ensure_index_keys(keys: &Document) -> StorerResult<()> {
    if keys.is_empty() {
        return Err(StorerError::InvalidArgument("index keys must not be empty".into()));
    }

    Ok(())
}

/// A `$set` document usable as a soft-delete marker, e.g.
/// `storer.update(table, &query, &soft_delete("deleted_at", now))`.
pub fn soft_delete(field: &str, value: impl Into<bson::Bson>) -> Document {
    doc! { "$set": { field: value.into() } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keeps_key_order_and_direction() {
        let params = PaginationParams::new(10, "-created_at,name", 0);
        let keys = params.sort_keys().unwrap();

        let sort = sort_document(&keys).unwrap();

        assert_eq!(sort, doc! { "created_at": -1, "name": 1 });
        assert_eq!(sort.keys().next().map(String::as_str), Some("created_at"));
    }

    #[test]
    fn primary_key_only() {
        let params = PaginationParams::new(10, "name,-age", 0);
        let primary = params.primary_sort_key().unwrap();

        assert_eq!(sort_document(primary.as_ref()), Some(doc! { "name": 1 }));
    }

    #[test]
    fn natural_order_has_no_sort() {
        assert_eq!(sort_document(&Vec::<SortKey>::new()), None);
    }

    #[test]
    fn second_page_skips_first() {
        let options = find_options(&PaginationParams::new(10, "", 1), None);

        assert_eq!(options.skip, Some(10));
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.sort, None);
    }

    #[test]
    fn huge_limit_saturates() {
        let options = find_options(&PaginationParams::new(usize::MAX, "", 0), None);

        assert_eq!(options.limit, Some(i64::MAX));
    }

    #[test]
    fn index_needs_keys() {
        assert!(ensure_index_keys(&doc! { "email": 1 }).is_ok());
        assert_eq!(
            ensure_index_keys(&Document::new()).unwrap_err().kind(),
            storer_core::error::ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn soft_delete_sets_marker() {
        assert_eq!(soft_delete("deleted", true), doc! { "$set": { "deleted": true } });
    }
}
