//! Order persistence workflow.
//!
//! Persisting an order takes several independent store calls:
//!
//! 1. allocate a new order id
//! 2. insert each line item, in order
//! 3. append the initial `"in progress"` tracking entry
//!
//! [`persist`] runs them best-effort. The first rejected item stops the
//! sequence and is reported as [`PersistOutcome::Aborted`]; items written
//! before it stay in the store without a tracking entry, and show up in
//! [`OrderStore::find_untracked_orders`]. The tracking entry is only written
//! once every item has been written.
//!
//! [`persist_atomic`] hands the whole sequence to the store as a single
//! transaction instead.

use crate::order::{Order, OrderId};
use crate::order_store::{OrderStore, OrderStoreError};
use std::fmt;

/// Status recorded for every newly persisted order.
pub const INITIAL_STATUS: &str = "in progress";

/// Why an order was not persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistFailure {
    /// The order had no items. Nothing was allocated or written.
    EmptyOrder,

    /// The store rejected a line item.
    ///
    /// Items before `food_item` were written under `order_id`; no tracking
    /// entry exists for it.
    ItemRejected {
        /// Id allocated for the order.
        order_id: OrderId,
        /// Item whose insertion failed.
        food_item: String,
        /// Error reported by the store.
        reason: OrderStoreError,
    },
}

impl fmt::Display for PersistFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOrder => write!(f, "order has no items"),
            Self::ItemRejected {
                order_id,
                food_item,
                reason,
            } => write!(f, "order {order_id}: could not record {food_item}: {reason}"),
        }
    }
}

/// Result of a persistence attempt that did not hit a propagated error.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum PersistOutcome {
    /// Every item and the initial tracking entry were written.
    Persisted(OrderId),
    /// The attempt stopped early; see [`PersistFailure`].
    Aborted(PersistFailure),
}

impl PersistOutcome {
    /// Id of the persisted order, `None` if aborted.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::Persisted(order_id) => Some(*order_id),
            Self::Aborted(_) => None,
        }
    }

    /// Whether the order was fully persisted.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }
}

/// Persist an order one row at a time.
///
/// Item insertion failures are absorbed into [`PersistOutcome::Aborted`].
/// No compensating delete runs for items already written.
///
/// # Errors
///
/// Allocation and tracking-insert failures are returned as
/// [`OrderStoreError`]. If the tracking insert fails, all items have
/// already been written.
pub async fn persist<S>(order: &Order, store: &S) -> Result<PersistOutcome, OrderStoreError>
where
    S: OrderStore + ?Sized,
{
    if order.is_empty() {
        metrics::counter!("food_order.persist.aborted", "reason" => "empty").increment(1);
        return Ok(PersistOutcome::Aborted(PersistFailure::EmptyOrder));
    }

    let order_id = store.allocate_next_order_id().await?;
    tracing::debug!(order_id = %order_id, items = order.len(), "Allocated order id");

    for line in order {
        if let Err(reason) = store
            .insert_order_item(&line.food_item, line.quantity, order_id)
            .await
        {
            tracing::warn!(
                order_id = %order_id,
                food_item = %line.food_item,
                quantity = line.quantity.get(),
                error = %reason,
                "Order item rejected, aborting order"
            );
            metrics::counter!("food_order.persist.aborted", "reason" => "item_rejected")
                .increment(1);

            return Ok(PersistOutcome::Aborted(PersistFailure::ItemRejected {
                order_id,
                food_item: line.food_item.clone(),
                reason,
            }));
        }
    }

    store.insert_order_tracking(order_id, INITIAL_STATUS).await?;

    tracing::info!(order_id = %order_id, items = order.len(), "Order persisted");
    metrics::counter!("food_order.persist.completed").increment(1);

    Ok(PersistOutcome::Persisted(order_id))
}

/// Persist an order as one backend transaction.
///
/// Unlike [`persist`], a rejected item leaves nothing behind and concurrent
/// callers never share an id. The rejected item is not identified, so the
/// failure is reported as a propagated error.
///
/// # Errors
///
/// Returns any [`OrderStoreError`] raised by the transaction.
pub async fn persist_atomic<S>(order: &Order, store: &S) -> Result<PersistOutcome, OrderStoreError>
where
    S: OrderStore + ?Sized,
{
    if order.is_empty() {
        metrics::counter!("food_order.persist.aborted", "reason" => "empty").increment(1);
        return Ok(PersistOutcome::Aborted(PersistFailure::EmptyOrder));
    }

    let order_id = store.persist_order_atomically(order, INITIAL_STATUS).await?;

    tracing::info!(order_id = %order_id, items = order.len(), "Order persisted atomically");
    metrics::counter!("food_order.persist.completed").increment(1);

    Ok(PersistOutcome::Persisted(order_id))
}
