//! `PostgreSQL` order store.
//!
//! The store owns exactly one connection for its lifetime. Calls are
//! serialized on that connection; there is no pool, no retry and no
//! reconnection, so a lost connection surfaces on the next call.
//!
//! # Example
//!
//! ```no_run
//! use food_order_core::{Order, workflow};
//! use food_order_core::order_store::OrderStore;
//! use food_order_postgres::{PostgresConfig, PostgresOrderStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresOrderStore::connect(&PostgresConfig::from_env()?).await?;
//! store.migrate().await?;
//!
//! let order = Order::from_raw([("pizza", 2.0)])?;
//! let outcome = workflow::persist(&order, &store).await?;
//! println!("{outcome:?}");
//!
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::PostgresConfig;
use chrono::{DateTime, Utc};
use food_order_core::order_store::StoreFuture;
use food_order_core::{
    Order, OrderId, OrderItem, OrderStore, OrderStoreError, Quantity, TrackingEntry,
};
use sqlx::{ConnectOptions, Connection, PgConnection};
use tokio::sync::Mutex;

/// Map a driver error onto the store's error type.
fn store_error(error: sqlx::Error) -> OrderStoreError {
    match error {
        e @ (sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed) => OrderStoreError::Connection(e.to_string()),
        e => OrderStoreError::Database(e.to_string()),
    }
}

/// Log and count a failed item insert, then map the driver error.
fn item_insert_failed(
    order_id: OrderId,
    food_item: &str,
    quantity: Quantity,
    error: sqlx::Error,
) -> OrderStoreError {
    tracing::warn!(
        order_id = %order_id,
        food_item = food_item,
        quantity = quantity.get(),
        error = %error,
        "Order item insert failed"
    );
    metrics::counter!("food_order.item_insert.failed").increment(1);
    store_error(error)
}

/// Order store backed by a single `PostgreSQL` connection.
///
/// Expects the schema from this crate's migrations: the `food_items`,
/// `orders` and `order_tracking` tables, the `insert_order_item` procedure
/// and the `get_total_order_price` function.
pub struct PostgresOrderStore {
    conn: Mutex<PgConnection>,
}

impl PostgresOrderStore {
    /// Open a connection using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::Connection`] if the server cannot be
    /// reached within the configured timeout or rejects the login.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, OrderStoreError> {
        let options = config.connect_options();
        let conn = tokio::time::timeout(config.connect_timeout(), options.connect())
            .await
            .map_err(|_| {
                OrderStoreError::Connection(format!(
                    "timed out after {}s connecting to {}:{}",
                    config.connect_timeout, config.host, config.port
                ))
            })?
            .map_err(|e| OrderStoreError::Connection(e.to_string()))?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connected to order database"
        );

        Ok(Self::from_connection(conn))
    }

    /// Wrap an already open connection.
    #[must_use]
    pub fn from_connection(conn: PgConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run database migrations.
    ///
    /// Creates the order tables, the stored procedure, the aggregation
    /// function and the seeded menu if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), OrderStoreError> {
        let mut conn = self.conn.lock().await;
        sqlx::migrate!("./migrations")
            .run(&mut *conn)
            .await
            .map_err(|e| OrderStoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl OrderStore for PostgresOrderStore {
    fn allocate_next_order_id(&self) -> StoreFuture<'_, OrderId> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let max: Option<i64> = sqlx::query_scalar("SELECT MAX(order_id) FROM orders")
                .fetch_one(&mut *conn)
                .await
                .map_err(store_error)?;

            let order_id = OrderId::after(max).ok_or_else(OrderStoreError::id_space_exhausted)?;
            tracing::debug!(order_id = %order_id, "Next order id");
            Ok(order_id)
        })
    }

    fn insert_order_item<'a>(
        &'a self,
        food_item: &'a str,
        quantity: Quantity,
        order_id: OrderId,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let mut tx = conn.begin().await.map_err(store_error)?;

            let result = sqlx::query("CALL insert_order_item($1, $2, $3)")
                .bind(food_item)
                .bind(quantity.get())
                .bind(order_id.get())
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => {
                    tx.commit()
                        .await
                        .map_err(|e| item_insert_failed(order_id, food_item, quantity, e))?;
                    tracing::debug!(
                        order_id = %order_id,
                        food_item = food_item,
                        quantity = quantity.get(),
                        "Order item inserted"
                    );
                    Ok(())
                }
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::warn!(error = %rollback, "Rollback after failed item insert failed");
                    }
                    Err(item_insert_failed(order_id, food_item, quantity, e))
                }
            }
        })
    }

    fn insert_order_tracking<'a>(&'a self, order_id: OrderId, status: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            sqlx::query("INSERT INTO order_tracking (order_id, status) VALUES ($1, $2)")
                .bind(order_id.get())
                .bind(status)
                .execute(&mut *conn)
                .await
                .map_err(store_error)?;

            tracing::debug!(order_id = %order_id, status = status, "Tracking entry inserted");
            Ok(())
        })
    }

    fn get_total_order_price(&self, order_id: OrderId) -> StoreFuture<'_, f64> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let total: Option<f64> =
                sqlx::query_scalar("SELECT get_total_order_price($1)::DOUBLE PRECISION")
                    .bind(order_id.get())
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(store_error)?;

            Ok(total.unwrap_or(0.0))
        })
    }

    fn get_order_status(&self, order_id: OrderId) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            sqlx::query_scalar(
                r"
                SELECT status
                FROM order_tracking
                WHERE order_id = $1
                ORDER BY id DESC
                LIMIT 1
                ",
            )
            .bind(order_id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(store_error)
        })
    }

    fn get_order_items(&self, order_id: OrderId) -> StoreFuture<'_, Vec<OrderItem>> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let rows: Vec<(i64, String, i32, f64)> = sqlx::query_as(
                r"
                SELECT o.order_id, f.name, o.quantity, o.total_price::DOUBLE PRECISION
                FROM orders o
                JOIN food_items f ON f.item_id = o.item_id
                WHERE o.order_id = $1
                ORDER BY o.inserted_at ASC, o.item_id ASC
                ",
            )
            .bind(order_id.get())
            .fetch_all(&mut *conn)
            .await
            .map_err(store_error)?;

            rows.into_iter()
                .map(|(order_id, food_item, quantity, total_price)| {
                    let quantity = Quantity::new(quantity).ok_or_else(|| {
                        OrderStoreError::Database(format!(
                            "Invalid quantity {quantity} stored for {food_item}"
                        ))
                    })?;
                    Ok(OrderItem {
                        order_id: OrderId::new(order_id),
                        food_item,
                        quantity,
                        total_price,
                    })
                })
                .collect()
        })
    }

    fn get_order_history(&self, order_id: OrderId) -> StoreFuture<'_, Vec<TrackingEntry>> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let rows: Vec<(i64, String, DateTime<Utc>)> = sqlx::query_as(
                r"
                SELECT order_id, status, recorded_at
                FROM order_tracking
                WHERE order_id = $1
                ORDER BY id ASC
                ",
            )
            .bind(order_id.get())
            .fetch_all(&mut *conn)
            .await
            .map_err(store_error)?;

            Ok(rows
                .into_iter()
                .map(|(order_id, status, recorded_at)| TrackingEntry {
                    order_id: OrderId::new(order_id),
                    status,
                    recorded_at,
                })
                .collect())
        })
    }

    fn find_untracked_orders(&self) -> StoreFuture<'_, Vec<OrderId>> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let ids: Vec<i64> = sqlx::query_scalar(
                r"
                SELECT DISTINCT o.order_id
                FROM orders o
                WHERE NOT EXISTS (
                    SELECT 1 FROM order_tracking t WHERE t.order_id = o.order_id
                )
                ORDER BY o.order_id ASC
                ",
            )
            .fetch_all(&mut *conn)
            .await
            .map_err(store_error)?;

            Ok(ids.into_iter().map(OrderId::new).collect())
        })
    }

    fn persist_order_atomically<'a>(
        &'a self,
        order: &'a Order,
        initial_status: &'a str,
    ) -> StoreFuture<'a, OrderId> {
        Box::pin(async move {
            let mut conn = self.conn.lock().await;
            let mut tx = conn.begin().await.map_err(store_error)?;

            // Self-conflicting lock: a second allocator waits until this
            // transaction commits, so max(order_id) cannot be read twice.
            sqlx::query("LOCK TABLE orders IN SHARE ROW EXCLUSIVE MODE")
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;

            let max: Option<i64> = sqlx::query_scalar("SELECT MAX(order_id) FROM orders")
                .fetch_one(&mut *tx)
                .await
                .map_err(store_error)?;
            let order_id = OrderId::after(max).ok_or_else(OrderStoreError::id_space_exhausted)?;

            for line in order {
                sqlx::query("CALL insert_order_item($1, $2, $3)")
                    .bind(&line.food_item)
                    .bind(line.quantity.get())
                    .bind(order_id.get())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| item_insert_failed(order_id, &line.food_item, line.quantity, e))?;
            }

            sqlx::query("INSERT INTO order_tracking (order_id, status) VALUES ($1, $2)")
                .bind(order_id.get())
                .bind(initial_status)
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;

            tx.commit().await.map_err(store_error)?;

            tracing::debug!(order_id = %order_id, items = order.len(), "Order committed");
            Ok(order_id)
        })
    }

    fn close(self) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.conn
                .into_inner()
                .close()
                .await
                .map_err(store_error)?;
            tracing::debug!("Order database connection closed");
            Ok(())
        })
    }
}
