//! Exercises the contract the way application code uses it: through
//! `dyn Storer`, wrapper types and typed tables, backed by the fake.

use std::sync::Arc;
use bson::{Document, bson, doc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use storer::{fake::FakeStorer, prelude::*};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct User {
    id: i32,
    name: String,
    active: bool,
}

/// A tiny service that only knows the contract.
struct Users<'a> {
    storer: &'a dyn Storer,
}

impl<'a> Users<'a> {
    async fn get(&self, id: i32) -> StorerResult<User> {
        let mut user = User { id: 0, name: String::new(), active: false };

        self.storer
            .table("users")
            .find_one(&doc! { "id": id }, &mut user)
            .await?;

        Ok(user)
    }

    async fn deactivate(&self, id: i32) -> StorerResult<()> {
        self.storer
            .update("users", &doc! { "id": id }, &doc! { "$set": { "active": false } })
            .await
    }

    async fn exists(&self, id: i32) -> StorerResult<bool> {
        match self.get(id).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[tokio::test]
async fn find_one_replays_fixture_and_records_query() {
    let storer = FakeStorer::builder()
        .with_result("users", bson!([{ "id": 1, "name": "a" }]))
        .build()
        .await
        .unwrap();
    let dyn_storer: &dyn Storer = &storer;

    let mut dest = Document::new();
    dyn_storer
        .find_one("users", &doc! { "id": 1 }, &mut dest)
        .await
        .unwrap();

    assert_eq!(dest, doc! { "id": 1, "name": "a" });
    assert_eq!(storer.last_query("users").await, Some(doc! { "id": 1 }));
}

#[tokio::test]
async fn configured_error_still_overwrites_destination() {
    let storer = FakeStorer::builder()
        .with_error(StorerError::NotFound)
        .build()
        .await
        .unwrap();
    let boxed: Box<dyn Storer> = Box::new(storer);

    let mut dest = vec![doc! { "stale": true }];
    let err = boxed
        .find("orders", &doc! {}, &mut dest, None)
        .await
        .unwrap_err();

    assert_eq!(err, StorerError::NotFound);
    assert!(dest.is_empty());
}

#[tokio::test]
async fn error_and_results_are_independent_channels() {
    let storer = FakeStorer::builder()
        .with_result("users", bson!([{ "id": 1, "name": "a" }, { "id": 2, "name": "b" }]))
        .build_now();

    let mut first = Vec::new();
    storer.find("users", &doc! {}, &mut first, None).await.unwrap();

    storer
        .set_error(Some(StorerError::Driver("connection reset".into())))
        .await;

    let mut second = Vec::new();
    let err = storer
        .find("users", &doc! {}, &mut second, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Driver);
    assert_eq!(first, second);
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn service_reads_and_writes_through_the_contract() {
    let storer = FakeStorer::builder()
        .with_json_result("users", json!([{ "id": 7, "name": "grace", "active": true }]))
        .unwrap()
        .build_now();
    let users = Users { storer: &storer };

    let user = users.get(7).await.unwrap();
    assert_eq!(user, User { id: 7, name: "grace".into(), active: true });

    users.deactivate(7).await.unwrap();

    assert_eq!(storer.last_query("users").await, Some(doc! { "id": 7 }));
    assert_eq!(
        storer.last_change("users").await,
        Some(doc! { "$set": { "active": false } })
    );
}

#[tokio::test]
async fn callers_branch_on_not_found_only() {
    let missing = FakeStorer::builder()
        .with_error(StorerError::NotFound)
        .build_now();
    let broken = FakeStorer::builder()
        .with_error(StorerError::Driver("timed out".into()))
        .build_now();

    assert!(!Users { storer: &missing }.exists(1).await.unwrap());

    let err = Users { storer: &broken }.exists(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Driver);
}

#[tokio::test]
async fn shared_storer_sees_every_clone() {
    let storer = Arc::new(FakeStorer::default());
    let shared: Arc<dyn Storer> = storer.clone();

    shared
        .update_with_options(
            "orders",
            &doc! { "id": 3 },
            &doc! { "$set": { "items.$[i].qty": 0 } },
            &UpdateOptions::new().with_array_filters([doc! { "i.sku": "x" }]),
        )
        .await
        .unwrap();

    assert_eq!(storer.last_query("orders").await, Some(doc! { "id": 3 }));
    assert_eq!(
        storer.last_change("orders").await,
        Some(doc! { "$set": { "items.$[i].qty": 0 } })
    );
}

#[tokio::test]
async fn typed_page_uses_backend_defaults() {
    let storer = FakeStorer::builder()
        .with_result(
            "users",
            bson!([
                { "id": 1, "name": "a", "active": true },
                { "id": 2, "name": "b", "active": false }
            ]),
        )
        .build_now();

    let page = storer
        .table("users")
        .find_page::<User>(&doc! { "active": true }, None)
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.previous_page, None);
    assert_eq!(storer.new_pagination_params(), PaginationParams::new(DEFAULT_LIMIT, "", 0));
    assert_eq!(storer.last_query("users").await, Some(doc! { "active": true }));
}

#[tokio::test]
async fn pagination_parses_signed_sort_keys() {
    let params = PaginationParams::builder()
        .with_limit(10)
        .with_sort_by("-created_at, name")
        .with_page(1)
        .build();

    assert_eq!(params.skip(), 10);
    assert_eq!(
        params.sort_keys().unwrap(),
        vec![
            SortKey { field: "created_at".into(), direction: SortDirection::Desc },
            SortKey { field: "name".into(), direction: SortDirection::Asc },
        ]
    );
}

#[tokio::test]
async fn close_is_idempotent() {
    let storer: Box<dyn Storer> = Box::new(FakeStorer::default());

    storer.close().await.unwrap();
    storer.close().await.unwrap();
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct Order {
    sku: String,
}

#[tokio::test]
async fn typed_find_clears_stale_orders_on_error() {
    let storer = FakeStorer::builder()
        .with_result("orders", bson!([]))
        .with_error(StorerError::NotFound)
        .build_now();
    let mut orders = vec![Order { sku: "stale".into() }];

    let err = storer
        .table("orders")
        .find(&doc! {}, &mut orders, None)
        .await
        .unwrap_err();

    assert_eq!(err, StorerError::NotFound);
    assert!(orders.is_empty());
}

#[tokio::test]
async fn typed_find_keeps_backend_error_over_bad_fixture() {
    let storer = FakeStorer::builder()
        .with_result("orders", bson!([{ "sku": 5 }]))
        .with_error(StorerError::NotFound)
        .build_now();
    let mut orders = vec![Order { sku: "stale".into() }];

    let err = storer
        .table("orders")
        .find(&doc! {}, &mut orders, None)
        .await
        .unwrap_err();

    assert_eq!(err, StorerError::NotFound);
    assert_eq!(orders, vec![Order { sku: "stale".into() }]);
}
