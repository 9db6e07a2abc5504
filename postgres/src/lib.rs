//! `PostgreSQL` order store for the food-order workflow.
//!
//! This crate provides the production implementation of the `OrderStore`
//! trait from `food-order-core`. It uses sqlx and supports:
//!
//! - Line item insertion through the `insert_order_item` stored procedure
//! - An append-only `order_tracking` status log
//! - Order totals through the `get_total_order_price` function
//! - Fully transactional order persistence with serialized id allocation
//! - Embedded migrations for the schema and seeded menu
//!
//! # Example
//!
//! ```ignore
//! use food_order_postgres::{PostgresConfig, PostgresOrderStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresOrderStore::connect(&PostgresConfig::from_env()?).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod store;

pub use config::{ConfigError, PostgresConfig};
pub use store::PostgresOrderStore;
