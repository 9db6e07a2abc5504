//! # Food Order Core
//!
//! Types and workflow for recording food orders placed through a
//! conversational agent.
//!
//! The front end hands over an order (food item → quantity) and a session
//! string. This crate turns that into rows in a relational backend:
//!
//! - [`order`]: `OrderId`, `Quantity`, `Order` and the row types read back
//! - [`format`]: renders an order as `"2 pizza, 1 mango lassi"`
//! - [`session`]: isolates the `/sessions/<id>/contexts/` span of a session string
//! - [`order_store`]: the `OrderStore` trait every backend implements
//! - [`workflow`]: allocate an id, write each line item, then the initial status
//!
//! ## Implementations
//!
//! - `PostgresOrderStore` (in `food-order-postgres`): production backend
//! - `InMemoryOrderStore` (in `food-order-testing`): deterministic tests
//!
//! ## Example
//!
//! ```ignore
//! use food_order_core::{Order, workflow::{self, PersistOutcome}};
//!
//! let order: Order = serde_json::from_str(r#"{"pizza": 2, "mango lassi": 1}"#)?;
//! match workflow::persist(&order, &store).await? {
//!     PersistOutcome::Persisted(order_id) => println!("order #{order_id}: {order}"),
//!     PersistOutcome::Aborted(failure) => println!("could not place order: {failure}"),
//! }
//! ```

pub mod format;
pub mod order;
pub mod order_store;
pub mod session;
pub mod workflow;

// Re-export commonly used types
pub use format::{WholeQuantity, format_order_items};
pub use order::{Order, OrderError, OrderId, OrderItem, OrderLine, Quantity, TrackingEntry};
pub use order_store::{OrderStore, OrderStoreError};
pub use session::{extract_session_id, extract_session_path};
pub use workflow::{INITIAL_STATUS, PersistFailure, PersistOutcome};
