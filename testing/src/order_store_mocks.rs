//! In-memory order store for fast, deterministic testing.
//!
//! Mirrors the behaviour of the Postgres schema: items must be on the menu,
//! `(order_id, food_item)` is unique, line price is `unit price * quantity`,
//! and tracking entries are append-only.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use crate::mocks::default_menu;
use chrono::Utc;
use food_order_core::order_store::StoreFuture;
use food_order_core::{
    Order, OrderId, OrderItem, OrderStore, OrderStoreError, Quantity, TrackingEntry,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct Tables {
    menu: HashMap<String, f64>,
    items: Vec<OrderItem>,
    tracking: Vec<TrackingEntry>,
    failing_items: HashSet<String>,
    fail_tracking: bool,
    fail_allocation: bool,
    closed: bool,
}

impl Tables {
    fn ensure_open(&self) -> Result<(), OrderStoreError> {
        if self.closed {
            Err(OrderStoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn next_order_id(&self) -> Result<OrderId, OrderStoreError> {
        OrderId::after(self.items.iter().map(|item| item.order_id.get()).max())
            .ok_or_else(OrderStoreError::id_space_exhausted)
    }

    /// Validate an item the way the `insert_order_item` procedure does.
    fn priced_item(
        &self,
        food_item: &str,
        quantity: Quantity,
        order_id: OrderId,
    ) -> Result<OrderItem, OrderStoreError> {
        if self.failing_items.contains(food_item) {
            return Err(OrderStoreError::Database(format!(
                "injected failure for {food_item}"
            )));
        }

        let unit_price = self
            .menu
            .get(food_item)
            .copied()
            .ok_or_else(|| OrderStoreError::Database(format!("unknown food item: {food_item}")))?;

        let duplicate = self
            .items
            .iter()
            .any(|item| item.order_id == order_id && item.food_item == food_item);
        if duplicate {
            return Err(OrderStoreError::Database(format!(
                "duplicate item {food_item} for order {order_id}"
            )));
        }

        Ok(OrderItem {
            order_id,
            food_item: food_item.to_string(),
            quantity,
            total_price: unit_price * f64::from(quantity.get()),
        })
    }

    fn tracking_entry(&self, order_id: OrderId, status: &str) -> Result<TrackingEntry, OrderStoreError> {
        if self.fail_tracking {
            return Err(OrderStoreError::Database(
                "injected failure for order_tracking".to_string(),
            ));
        }

        Ok(TrackingEntry {
            order_id,
            status: status.to_string(),
            recorded_at: Utc::now(),
        })
    }
}

/// In-memory `OrderStore`.
///
/// Clones share the same tables, so a test can keep a handle for assertions
/// after passing another to the code under test.
///
/// # Example
///
/// ```
/// use food_order_core::{OrderId, OrderStore, Quantity};
/// use food_order_testing::InMemoryOrderStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryOrderStore::new();
/// assert_eq!(store.allocate_next_order_id().await.unwrap(), OrderId::new(1));
///
/// store
///     .insert_order_item("samosa", Quantity::new(2).unwrap(), OrderId::new(5))
///     .await
///     .unwrap();
/// assert_eq!(store.allocate_next_order_id().await.unwrap(), OrderId::new(6));
/// assert_eq!(store.get_total_order_price(OrderId::new(5)).await.unwrap(), 10.0);
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryOrderStore {
    /// Create an empty store using [`default_menu`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_menu(default_menu())
    }

    /// Create an empty store with a custom `(food item, unit price)` menu.
    #[must_use]
    pub fn with_menu<I, S>(menu: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let tables = Tables {
            menu: menu.into_iter().map(|(name, price)| (name.into(), price)).collect(),
            ..Tables::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Make every insert of `food_item` fail with a database error.
    pub fn fail_item_inserts_for(&self, food_item: impl Into<String>) {
        self.tables.write().unwrap().failing_items.insert(food_item.into());
    }

    /// Make every tracking insert fail with a database error.
    pub fn fail_tracking_inserts(&self) {
        self.tables.write().unwrap().fail_tracking = true;
    }

    /// Make id allocation fail with a connection error.
    pub fn fail_allocation(&self) {
        self.tables.write().unwrap().fail_allocation = true;
    }

    /// Snapshot of all item rows in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<OrderItem> {
        self.tables.read().unwrap().items.clone()
    }

    /// Snapshot of all tracking entries in insertion order.
    #[must_use]
    pub fn tracking_entries(&self) -> Vec<TrackingEntry> {
        self.tables.read().unwrap().tracking.clone()
    }

    /// Whether [`OrderStore::close`] has been called on any clone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tables.read().unwrap().closed
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn allocate_next_order_id(&self) -> StoreFuture<'_, OrderId> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            tables.ensure_open()?;
            if tables.fail_allocation {
                return Err(OrderStoreError::Connection(
                    "injected allocation failure".to_string(),
                ));
            }
            tables.next_order_id()
        })
    }

    fn insert_order_item<'a>(
        &'a self,
        food_item: &'a str,
        quantity: Quantity,
        order_id: OrderId,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            tables.ensure_open()?;
            let item = tables.priced_item(food_item, quantity, order_id)?;
            tables.items.push(item);
            Ok(())
        })
    }

    fn insert_order_tracking<'a>(&'a self, order_id: OrderId, status: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            tables.ensure_open()?;
            let entry = tables.tracking_entry(order_id, status)?;
            tables.tracking.push(entry);
            Ok(())
        })
    }

    fn get_total_order_price(&self, order_id: OrderId) -> StoreFuture<'_, f64> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            tables.ensure_open()?;
            Ok(tables
                .items
                .iter()
                .filter(|item| item.order_id == order_id)
                .map(|item| item.total_price)
                .sum())
        })
    }

    fn get_order_status(&self, order_id: OrderId) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            tables.ensure_open()?;
            Ok(tables
                .tracking
                .iter()
                .rev()
                .find(|entry| entry.order_id == order_id)
                .map(|entry| entry.status.clone()))
        })
    }

    fn get_order_items(&self, order_id: OrderId) -> StoreFuture<'_, Vec<OrderItem>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            tables.ensure_open()?;
            Ok(tables
                .items
                .iter()
                .filter(|item| item.order_id == order_id)
                .cloned()
                .collect())
        })
    }

    fn get_order_history(&self, order_id: OrderId) -> StoreFuture<'_, Vec<TrackingEntry>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            tables.ensure_open()?;
            Ok(tables
                .tracking
                .iter()
                .filter(|entry| entry.order_id == order_id)
                .cloned()
                .collect())
        })
    }

    fn find_untracked_orders(&self) -> StoreFuture<'_, Vec<OrderId>> {
        Box::pin(async move {
            let tables = self.tables.read().unwrap();
            tables.ensure_open()?;
            let tracked: HashSet<OrderId> =
                tables.tracking.iter().map(|entry| entry.order_id).collect();
            let untracked: BTreeSet<OrderId> = tables
                .items
                .iter()
                .map(|item| item.order_id)
                .filter(|order_id| !tracked.contains(order_id))
                .collect();
            Ok(untracked.into_iter().collect())
        })
    }

    fn persist_order_atomically<'a>(
        &'a self,
        order: &'a Order,
        initial_status: &'a str,
    ) -> StoreFuture<'a, OrderId> {
        Box::pin(async move {
            // One write lock for the whole sequence plays the role of the
            // backend transaction.
            let mut tables = self.tables.write().unwrap();
            tables.ensure_open()?;
            if tables.fail_allocation {
                return Err(OrderStoreError::Connection(
                    "injected allocation failure".to_string(),
                ));
            }

            let order_id = tables.next_order_id()?;
            let rows = order
                .iter()
                .map(|line| tables.priced_item(&line.food_item, line.quantity, order_id))
                .collect::<Result<Vec<_>, _>>()?;
            let entry = tables.tracking_entry(order_id, initial_status)?;

            tables.items.extend(rows);
            tables.tracking.push(entry);
            Ok(order_id)
        })
    }

    fn close(self) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.tables.write().unwrap().closed = true;
            Ok(())
        })
    }
}
