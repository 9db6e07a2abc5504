//! # Food Order Testing
//!
//! Testing utilities for the food-order crates.
//!
//! This crate provides:
//! - [`InMemoryOrderStore`]: a deterministic `OrderStore` with failure injection
//! - [`mocks::default_menu`]: the menu the Postgres migrations seed
//! - [`init_test_tracing`]: log output for failing tests
//!
//! ## Example
//!
//! ```
//! use food_order_core::{Order, workflow};
//! use food_order_testing::InMemoryOrderStore;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryOrderStore::new();
//! let order = Order::from_raw([("pizza", 2.0)]).unwrap();
//!
//! let outcome = workflow::persist(&order, &store).await.unwrap();
//! assert_eq!(outcome.order_id().map(|id| id.get()), Some(1));
//! assert_eq!(store.tracking_entries().len(), 1);
//! # });
//! ```

mod order_store_mocks;

pub use order_store_mocks::InMemoryOrderStore;

/// Fixed data shared by tests.
pub mod mocks {
    /// Menu of `(food item, unit price)` pairs.
    ///
    /// Matches the rows seeded into `food_items` by the Postgres migrations,
    /// so the same assertions hold against either store.
    #[must_use]
    pub fn default_menu() -> Vec<(String, f64)> {
        [
            ("pav bhaji", 6.0),
            ("chole bhature", 7.0),
            ("pizza", 8.0),
            ("mango lassi", 5.0),
            ("masala dosa", 6.0),
            ("vegetable biryani", 9.0),
            ("vada pav", 4.0),
            ("rava dosa", 7.0),
            ("samosa", 5.0),
        ]
        .into_iter()
        .map(|(name, price)| (name.to_string(), price))
        .collect()
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`. Safe to call from every test; only the first call
/// installs the subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
