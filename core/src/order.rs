//! Order identification and composition types.
//!
//! An [`Order`] is what the conversational front end hands over: an
//! insertion-ordered mapping from food item name to [`Quantity`]. Once
//! persisted it is identified by an [`OrderId`], and read back as
//! [`OrderItem`] rows plus an append-only log of [`TrackingEntry`] values.

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Errors raised while building an [`Order`] from upstream data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    /// Quantity is not a finite number of at least one after truncation.
    #[error("Invalid quantity for {food_item}: {value}")]
    InvalidQuantity {
        /// Item the quantity was given for.
        food_item: String,
        /// Raw value as received.
        value: f64,
    },

    /// Food item name is empty or whitespace only.
    #[error("Food item name cannot be empty")]
    EmptyFoodItem,
}

/// Identifier of a persisted order.
///
/// Minted by the store as `max(existing ids) + 1`, starting at [`OrderId::FIRST`].
///
/// # Examples
///
/// ```
/// use food_order_core::OrderId;
///
/// let id = OrderId::new(5);
/// assert_eq!(id.checked_next(), Some(OrderId::new(6)));
/// assert_eq!(OrderId::new(i64::MAX).checked_next(), None);
/// assert_eq!(id.to_string(), "5");
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    /// Id handed out when no orders exist yet.
    pub const FIRST: Self = Self(1);

    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw id value, as stored in the backend.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// The id following this one, or `None` once the id space is used up.
    #[must_use]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Next id after the current maximum, or [`OrderId::FIRST`] for an empty table.
    ///
    /// Returns `None` when the maximum is already `i64::MAX`.
    #[must_use]
    pub fn after(max_existing: Option<i64>) -> Option<Self> {
        max_existing.map_or(Some(Self::FIRST), |max| Self(max).checked_next())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A positive whole quantity of one food item.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    /// Create a quantity, returning `None` unless `value >= 1`.
    #[must_use]
    pub const fn new(value: i32) -> Option<Self> {
        if value >= 1 { Some(Self(value)) } else { None }
    }

    /// Coerce an upstream number into a quantity.
    ///
    /// Fractional values are truncated toward zero, so `2.9` becomes `2`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidQuantity`] if the value is not finite,
    /// truncates below one, or does not fit in an `i32`.
    pub fn from_raw(food_item: &str, value: f64) -> Result<Self, OrderError> {
        let invalid = || OrderError::InvalidQuantity {
            food_item: food_item.to_string(),
            value,
        };

        if !value.is_finite() {
            return Err(invalid());
        }

        let truncated = value.trunc();
        if truncated < 1.0 || truncated > f64::from(i32::MAX) {
            return Err(invalid());
        }

        #[allow(clippy::cast_possible_truncation)] // Range checked above
        Ok(Self(truncated as i32))
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        Self::new(value)
            .ok_or_else(|| de::Error::custom(format!("quantity must be positive, got {value}")))
    }
}

/// One `(food item, quantity)` pair of an [`Order`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    /// Menu name of the food item.
    pub food_item: String,
    /// How many were ordered.
    pub quantity: Quantity,
}

/// A customer's order before it is persisted.
///
/// Behaves like a mapping that remembers insertion order: inserting an item
/// that is already present replaces its quantity in place.
///
/// # Examples
///
/// ```
/// use food_order_core::{Order, Quantity};
///
/// let mut order = Order::new();
/// order.insert_raw("pizza", 2.0).unwrap();
/// order.insert_raw("samosa", 1.0).unwrap();
/// order.insert_raw("pizza", 3.0).unwrap();
///
/// let names: Vec<_> = order.iter().map(|line| line.food_item.as_str()).collect();
/// assert_eq!(names, ["pizza", "samosa"]);
/// assert_eq!(order.quantity_of("pizza"), Quantity::new(3));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Order {
    lines: Vec<OrderLine>,
}

impl Order {
    /// Create an empty order.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build an order from raw upstream pairs, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns the first [`OrderError`] hit by any pair.
    pub fn from_raw<I, S>(pairs: I) -> Result<Self, OrderError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut order = Self::new();
        for (food_item, value) in pairs {
            order.insert_raw(food_item, value)?;
        }
        Ok(order)
    }

    /// Insert an item, returning the quantity it replaced (if any).
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::EmptyFoodItem`] for a blank item name.
    pub fn insert(
        &mut self,
        food_item: impl Into<String>,
        quantity: Quantity,
    ) -> Result<Option<Quantity>, OrderError> {
        let food_item = food_item.into();
        if food_item.trim().is_empty() {
            return Err(OrderError::EmptyFoodItem);
        }

        if let Some(line) = self.lines.iter_mut().find(|line| line.food_item == food_item) {
            return Ok(Some(std::mem::replace(&mut line.quantity, quantity)));
        }

        self.lines.push(OrderLine {
            food_item,
            quantity,
        });
        Ok(None)
    }

    /// Insert an item with an upstream number as its quantity.
    ///
    /// # Errors
    ///
    /// See [`Quantity::from_raw`] and [`Order::insert`].
    pub fn insert_raw(
        &mut self,
        food_item: impl Into<String>,
        value: f64,
    ) -> Result<Option<Quantity>, OrderError> {
        let food_item = food_item.into();
        let quantity = Quantity::from_raw(&food_item, value)?;
        self.insert(food_item, quantity)
    }

    /// Quantity ordered for an item, if present.
    #[must_use]
    pub fn quantity_of(&self, food_item: &str) -> Option<Quantity> {
        self.lines
            .iter()
            .find(|line| line.food_item == food_item)
            .map(|line| line.quantity)
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Iterate over lines in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, OrderLine> {
        self.lines.iter()
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the order has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl<'a> IntoIterator for &'a Order {
    type Item = &'a OrderLine;
    type IntoIter = std::slice::Iter<'a, OrderLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Encodes as a map in insertion order, the same shape [`Deserialize`] reads.
impl Serialize for Order {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.lines.len()))?;
        for line in &self.lines {
            map.serialize_entry(&line.food_item, &line.quantity)?;
        }
        map.end()
    }
}

/// Decodes a JSON object such as `{"pizza": 2, "mango lassi": 1.0}`.
///
/// Key order of the source object is kept; numeric values go through
/// [`Quantity::from_raw`].
impl<'de> Deserialize<'de> for Order {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderVisitor;

        impl<'de> Visitor<'de> for OrderVisitor {
            type Value = Order;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of food item to quantity")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Order, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut order = Order::new();
                while let Some((food_item, value)) = map.next_entry::<String, f64>()? {
                    order.insert_raw(food_item, value).map_err(de::Error::custom)?;
                }
                Ok(order)
            }
        }

        deserializer.deserialize_map(OrderVisitor)
    }
}

/// A persisted line item as read back from the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Order the row belongs to.
    pub order_id: OrderId,
    /// Menu name of the food item.
    pub food_item: String,
    /// Quantity recorded.
    pub quantity: Quantity,
    /// Unit price times quantity, as computed by the backend.
    pub total_price: f64,
}

/// One append-only status record for an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    /// Order the status applies to.
    pub order_id: OrderId,
    /// Free-form status, e.g. `"in progress"` or `"delivered"`.
    pub status: String,
    /// When the backend recorded the entry.
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn order_id_after_empty_table_is_first() {
        assert_eq!(OrderId::after(None), Some(OrderId::new(1)));
    }

    #[test]
    fn order_id_after_existing_max() {
        assert_eq!(OrderId::after(Some(5)), Some(OrderId::new(6)));
    }

    #[test]
    fn order_id_after_largest_id_is_exhausted() {
        assert_eq!(OrderId::after(Some(i64::MAX)), None);
        assert_eq!(OrderId::after(Some(i64::MAX - 1)), Some(OrderId::new(i64::MAX)));
    }

    #[test]
    fn quantity_truncates_toward_zero() {
        assert_eq!(Quantity::from_raw("pizza", 2.9).unwrap().get(), 2);
        assert_eq!(Quantity::from_raw("pizza", 1.0).unwrap().get(), 1);
    }

    #[test]
    fn quantity_rejects_values_below_one() {
        assert!(Quantity::from_raw("pizza", 0.99).is_err());
        assert!(Quantity::from_raw("pizza", -3.0).is_err());
        assert!(Quantity::from_raw("pizza", f64::NAN).is_err());
        assert!(Quantity::from_raw("pizza", f64::INFINITY).is_err());
        assert!(Quantity::new(0).is_none());
    }

    #[test]
    fn insert_replaces_quantity_in_place() {
        let mut order = Order::new();
        order.insert_raw("pizza", 1.0).unwrap();
        order.insert_raw("samosa", 2.0).unwrap();

        let previous = order.insert_raw("pizza", 4.0).unwrap();

        assert_eq!(previous, Quantity::new(1));
        assert_eq!(order.len(), 2);
        assert_eq!(order.lines()[0].food_item, "pizza");
        assert_eq!(order.lines()[0].quantity.get(), 4);
    }

    #[test]
    fn insert_rejects_blank_item() {
        let mut order = Order::new();
        let err = order.insert_raw("  ", 1.0).unwrap_err();
        assert_eq!(err, OrderError::EmptyFoodItem);
    }

    #[test]
    fn deserialize_keeps_source_key_order() {
        let order: Order =
            serde_json::from_str(r#"{"vada pav": 3, "chole bhature": 1.0, "lassi": 2.5}"#).unwrap();

        let lines: Vec<_> = order
            .iter()
            .map(|line| (line.food_item.as_str(), line.quantity.get()))
            .collect();
        assert_eq!(lines, [("vada pav", 3), ("chole bhature", 1), ("lassi", 2)]);
    }

    #[test]
    fn deserialize_rejects_zero_quantity() {
        let result: Result<Order, _> = serde_json::from_str(r#"{"pizza": 0}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid quantity for pizza"));
    }

    #[test]
    fn serialize_as_map_in_insertion_order() {
        let order = Order::from_raw([("samosa", 2.0), ("pizza", 1.0)]).unwrap();
        let json = serde_json::to_string(&order).unwrap();
        assert_eq!(json, r#"{"samosa":2,"pizza":1}"#);
    }
}
