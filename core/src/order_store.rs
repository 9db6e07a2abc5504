//! Order store trait and related types.
//!
//! This module defines the boundary between the order workflow and the
//! relational backend that actually holds orders. Each operation is one
//! independent backend call with its own transaction.
//!
//! # Design
//!
//! Every operation returns `Result<T, OrderStoreError>`. The store never
//! decides which failures are fatal: a failed item insert is rolled back and
//! reported like any other error, and the workflow chooses to absorb it
//! (see [`crate::workflow::persist`]).
//!
//! # Implementations
//!
//! - `PostgresOrderStore` (in `food-order-postgres` crate): Production implementation
//! - `InMemoryOrderStore` (in `food-order-testing` crate): Fast, deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use food_order_core::order_store::{OrderStore, OrderStoreError};
//! use food_order_core::{OrderId, Quantity};
//!
//! async fn example<S: OrderStore>(store: &S) -> Result<(), OrderStoreError> {
//!     let order_id = store.allocate_next_order_id().await?;
//!     if let Some(quantity) = Quantity::new(2) {
//!         store.insert_order_item("pizza", quantity, order_id).await?;
//!     }
//!     store.insert_order_tracking(order_id, "in progress").await?;
//!
//!     let total = store.get_total_order_price(order_id).await?;
//!     let status = store.get_order_status(order_id).await?;
//!     println!("order {order_id}: {status:?}, total {total:.2}");
//!     Ok(())
//! }
//! ```

use crate::order::{Order, OrderId, OrderItem, Quantity, TrackingEntry};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by every [`OrderStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, OrderStoreError>> + Send + 'a>>;

/// Errors that can occur during order store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderStoreError {
    /// The backend rejected the statement or procedure call.
    ///
    /// Covers constraint violations, unknown food items raised by the
    /// `insert_order_item` procedure, and any other SQL-level failure.
    #[error("Database error: {0}")]
    Database(String),

    /// The connection to the backend failed or was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store was used after being closed.
    #[error("Order store is closed")]
    Closed,
}

impl OrderStoreError {
    /// Allocation found `i64::MAX` already in use.
    #[must_use]
    pub fn id_space_exhausted() -> Self {
        Self::Database("order id space exhausted".to_string())
    }
}

/// Order persistence backend.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a store can be shared with the
/// async service that receives orders.
///
/// # Concurrency
///
/// [`allocate_next_order_id`](OrderStore::allocate_next_order_id) reads
/// `max(order_id) + 1` without reserving it. Two callers interleaving
/// allocation and their first item insert can receive the same id. Use
/// [`persist_order_atomically`](OrderStore::persist_order_atomically) when
/// that matters.
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` so the trait can be used as
/// `&dyn OrderStore` or `Arc<dyn OrderStore>`.
pub trait OrderStore: Send + Sync {
    /// Return the largest existing order id plus one, or `1` when there are no orders.
    ///
    /// # Errors
    ///
    /// - `Database`/`Connection`: the query failed
    fn allocate_next_order_id(&self) -> StoreFuture<'_, OrderId>;

    /// Persist one line item through the backend's `insert_order_item` procedure.
    ///
    /// Commits on success. On any failure the local transaction is rolled
    /// back before the error is returned.
    ///
    /// # Errors
    ///
    /// - `Database`: the procedure rejected the item (e.g. not on the menu)
    /// - `Connection`: the backend could not be reached
    fn insert_order_item<'a>(
        &'a self,
        food_item: &'a str,
        quantity: Quantity,
        order_id: OrderId,
    ) -> StoreFuture<'a, ()>;

    /// Append one tracking entry for an order and commit.
    ///
    /// # Errors
    ///
    /// - `Database`/`Connection`: the insert failed
    fn insert_order_tracking<'a>(&'a self, order_id: OrderId, status: &'a str) -> StoreFuture<'a, ()>;

    /// Sum of line prices for an order, `0.0` when it has no items.
    ///
    /// # Errors
    ///
    /// - `Database`/`Connection`: the aggregation call failed
    fn get_total_order_price(&self, order_id: OrderId) -> StoreFuture<'_, f64>;

    /// Most recent status of an order, or `None` if it has no tracking entry.
    ///
    /// # Errors
    ///
    /// - `Database`/`Connection`: the lookup failed
    fn get_order_status(&self, order_id: OrderId) -> StoreFuture<'_, Option<String>>;

    /// Line items recorded for an order, in insertion order.
    ///
    /// # Errors
    ///
    /// - `Database`/`Connection`: the lookup failed
    fn get_order_items(&self, order_id: OrderId) -> StoreFuture<'_, Vec<OrderItem>>;

    /// Every tracking entry for an order, oldest first.
    ///
    /// # Errors
    ///
    /// - `Database`/`Connection`: the lookup failed
    fn get_order_history(&self, order_id: OrderId) -> StoreFuture<'_, Vec<TrackingEntry>>;

    /// Order ids that have line items but no tracking entry.
    ///
    /// These are orders whose persistence stopped part way through.
    ///
    /// # Errors
    ///
    /// - `Database`/`Connection`: the lookup failed
    fn find_untracked_orders(&self) -> StoreFuture<'_, Vec<OrderId>>;

    /// Allocate an id, insert every item and the initial status in one transaction.
    ///
    /// Allocation is serialized against other callers of this method, so ids
    /// are never handed out twice. On failure nothing is written.
    ///
    /// # Errors
    ///
    /// - `Database`: an item or the tracking entry was rejected
    /// - `Connection`: the backend could not be reached
    fn persist_order_atomically<'a>(
        &'a self,
        order: &'a Order,
        initial_status: &'a str,
    ) -> StoreFuture<'a, OrderId>;

    /// Release the backend connection.
    ///
    /// # Errors
    ///
    /// - `Connection`: the connection could not be shut down cleanly
    fn close(self) -> StoreFuture<'static, ()>
    where
        Self: Sized;
}
