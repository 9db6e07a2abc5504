//! Order workflow behaviour against the in-memory store.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code uses expect for clear failure messages

use food_order_core::workflow::{self, INITIAL_STATUS, PersistFailure, PersistOutcome};
use food_order_core::{Order, OrderId, OrderStore, OrderStoreError, Quantity};
use food_order_testing::{InMemoryOrderStore, init_test_tracing};

fn order(pairs: &[(&str, f64)]) -> Order {
    Order::from_raw(pairs.iter().copied()).expect("valid test order")
}

#[tokio::test]
async fn happy_path_writes_items_then_tracking() -> anyhow::Result<()> {
    init_test_tracing();
    let store = InMemoryOrderStore::new();

    let outcome = workflow::persist(&order(&[("pizza", 2.0)]), &store).await?;

    assert_eq!(outcome, PersistOutcome::Persisted(OrderId::new(1)));

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].order_id, OrderId::new(1));
    assert_eq!(items[0].food_item, "pizza");
    assert_eq!(items[0].quantity, Quantity::new(2).expect("positive"));

    let tracking = store.tracking_entries();
    assert_eq!(tracking.len(), 1);
    assert_eq!(tracking[0].order_id, OrderId::new(1));
    assert_eq!(tracking[0].status, "in progress");
    Ok(())
}

#[tokio::test]
async fn second_item_failure_leaves_first_item_and_no_tracking() -> anyhow::Result<()> {
    init_test_tracing();
    let store = InMemoryOrderStore::new();
    store.fail_item_inserts_for("samosa");

    let outcome = workflow::persist(&order(&[("pizza", 1.0), ("samosa", 3.0)]), &store).await?;

    let PersistOutcome::Aborted(PersistFailure::ItemRejected {
        order_id,
        food_item,
        reason,
    }) = outcome
    else {
        panic!("expected an item rejection, got {outcome:?}");
    };
    assert_eq!(order_id, OrderId::new(1));
    assert_eq!(food_item, "samosa");
    assert!(matches!(reason, OrderStoreError::Database(_)));

    let items = store.get_order_items(order_id).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].food_item, "pizza");
    assert!(store.get_order_history(order_id).await?.is_empty());
    assert_eq!(store.get_order_status(order_id).await?, None);
    Ok(())
}

#[tokio::test]
async fn failure_stops_before_later_items() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    store.fail_item_inserts_for("pizza");

    let outcome = workflow::persist(
        &order(&[("pizza", 1.0), ("samosa", 1.0), ("vada pav", 1.0)]),
        &store,
    )
    .await?;

    assert!(!outcome.is_persisted());
    assert!(store.items().is_empty());
    assert!(store.tracking_entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_menu_item_aborts_the_order() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();

    let outcome = workflow::persist(&order(&[("sushi", 1.0)]), &store).await?;

    assert_eq!(outcome.order_id(), None);
    assert!(store.tracking_entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn partial_orders_are_detectable() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();

    let complete = workflow::persist(&order(&[("pizza", 1.0)]), &store).await?;
    store.fail_item_inserts_for("samosa");
    let partial =
        workflow::persist(&order(&[("mango lassi", 2.0), ("samosa", 1.0)]), &store).await?;

    assert!(complete.is_persisted());
    assert!(!partial.is_persisted());

    assert_eq!(store.find_untracked_orders().await?, vec![OrderId::new(2)]);
    Ok(())
}

#[tokio::test]
async fn empty_order_writes_nothing() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    store.fail_allocation();

    let outcome = workflow::persist(&Order::new(), &store).await?;

    assert_eq!(outcome, PersistOutcome::Aborted(PersistFailure::EmptyOrder));
    assert!(store.items().is_empty());
    assert!(store.tracking_entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn allocation_failure_propagates() {
    let store = InMemoryOrderStore::new();
    store.fail_allocation();

    let result = workflow::persist(&order(&[("pizza", 1.0)]), &store).await;

    assert!(matches!(result, Err(OrderStoreError::Connection(_))));
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn tracking_failure_propagates_after_items_are_written() {
    let store = InMemoryOrderStore::new();
    store.fail_tracking_inserts();

    let result = workflow::persist(&order(&[("pizza", 1.0), ("samosa", 2.0)]), &store).await;

    assert!(matches!(result, Err(OrderStoreError::Database(_))));
    assert_eq!(store.items().len(), 2);
    assert!(store.tracking_entries().is_empty());
}

#[tokio::test]
async fn ids_continue_from_the_largest_existing_order() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    assert_eq!(store.allocate_next_order_id().await?, OrderId::new(1));

    store
        .insert_order_item("pizza", Quantity::new(1).expect("positive"), OrderId::new(5))
        .await?;
    assert_eq!(store.allocate_next_order_id().await?, OrderId::new(6));

    let outcome = workflow::persist(&order(&[("samosa", 1.0)]), &store).await?;
    assert_eq!(outcome.order_id(), Some(OrderId::new(6)));
    Ok(())
}

#[tokio::test]
async fn exhausted_id_space_is_an_error_not_a_wrap() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    store
        .insert_order_item("pizza", Quantity::new(1).expect("positive"), OrderId::new(i64::MAX))
        .await?;

    assert_eq!(
        store.allocate_next_order_id().await,
        Err(OrderStoreError::id_space_exhausted())
    );

    let result = workflow::persist(&order(&[("samosa", 1.0)]), &store).await;
    assert_eq!(result, Err(OrderStoreError::id_space_exhausted()));

    let result = workflow::persist_atomic(&order(&[("samosa", 1.0)]), &store).await;
    assert_eq!(result, Err(OrderStoreError::id_space_exhausted()));

    assert_eq!(store.items().len(), 1, "No item written under a wrapped id");
    assert!(store.tracking_entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn total_price_sums_line_prices() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();

    let outcome =
        workflow::persist(&order(&[("pizza", 2.0), ("mango lassi", 1.0)]), &store).await?;
    let order_id = outcome.order_id().expect("persisted");

    assert!((store.get_total_order_price(order_id).await? - 21.0).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn total_price_of_order_without_items_is_zero() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    assert!(store.get_total_order_price(OrderId::new(42)).await?.abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn status_of_unknown_order_is_absent() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    assert_eq!(store.get_order_status(OrderId::new(99)).await?, None);
    Ok(())
}

#[tokio::test]
async fn latest_status_wins() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    let order_id = workflow::persist(&order(&[("pizza", 1.0)]), &store)
        .await?
        .order_id()
        .expect("persisted");

    store.insert_order_tracking(order_id, "delivered").await?;

    assert_eq!(store.get_order_status(order_id).await?.as_deref(), Some("delivered"));
    let history: Vec<_> = store
        .get_order_history(order_id)
        .await?
        .into_iter()
        .map(|entry| entry.status)
        .collect();
    assert_eq!(history, [INITIAL_STATUS, "delivered"]);
    Ok(())
}

#[tokio::test]
async fn workflow_accepts_a_trait_object() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    let dyn_store: &dyn OrderStore = &store;

    let outcome = workflow::persist(&order(&[("rava dosa", 1.0)]), dyn_store).await?;

    assert!(outcome.is_persisted());
    Ok(())
}

#[tokio::test]
async fn order_decoded_from_front_end_json_persists_in_key_order() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    let order: Order = serde_json::from_str(r#"{"vada pav": 2.0, "pav bhaji": 1}"#)?;

    let outcome = workflow::persist(&order, &store).await?;

    assert!(outcome.is_persisted());
    let names: Vec<_> = store.items().into_iter().map(|item| item.food_item).collect();
    assert_eq!(names, ["vada pav", "pav bhaji"]);
    assert_eq!(order.to_string(), "2 vada pav, 1 pav bhaji");
    Ok(())
}

#[tokio::test]
async fn atomic_persist_leaves_nothing_on_failure() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    store.fail_item_inserts_for("samosa");

    let result = workflow::persist_atomic(&order(&[("pizza", 1.0), ("samosa", 1.0)]), &store).await;

    assert!(matches!(result, Err(OrderStoreError::Database(_))));
    assert!(store.items().is_empty());
    assert!(store.tracking_entries().is_empty());
    assert!(store.find_untracked_orders().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn atomic_persist_records_items_and_status() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();

    let outcome = workflow::persist_atomic(&order(&[("pizza", 2.0), ("samosa", 1.0)]), &store).await?;

    assert_eq!(outcome, PersistOutcome::Persisted(OrderId::new(1)));
    assert_eq!(store.items().len(), 2);
    assert_eq!(
        store.get_order_status(OrderId::new(1)).await?.as_deref(),
        Some(INITIAL_STATUS)
    );
    Ok(())
}

#[tokio::test]
async fn concurrent_atomic_persists_get_distinct_ids() -> anyhow::Result<()> {
    let store = InMemoryOrderStore::new();
    let first = order(&[("pizza", 1.0)]);
    let second = order(&[("samosa", 1.0)]);

    let (a, b) = futures::join!(
        workflow::persist_atomic(&first, &store),
        workflow::persist_atomic(&second, &store)
    );

    let mut ids = vec![a?.order_id(), b?.order_id()];
    ids.sort();
    assert_eq!(ids, [Some(OrderId::new(1)), Some(OrderId::new(2))]);
    Ok(())
}

#[tokio::test]
async fn close_releases_the_store() {
    let store = InMemoryOrderStore::new();
    let handle = store.clone();

    store.close().await.expect("close succeeds");

    let result = workflow::persist(&order(&[("pizza", 1.0)]), &handle).await;
    assert_eq!(result, Err(OrderStoreError::Closed));
}
