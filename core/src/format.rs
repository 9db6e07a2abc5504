//! Human-readable order summaries.
//!
//! Renders `(item, quantity)` pairs as `"2 pizza, 1 mango lassi"`, the form
//! the conversational front end reads back to the customer.

use crate::order::{Order, Quantity};
use std::fmt;

/// A quantity that can be shown as a whole number.
///
/// Floating point values are truncated toward zero.
pub trait WholeQuantity {
    /// Whole-number value used for display.
    fn whole(&self) -> i64;
}

macro_rules! whole_quantity_for_ints {
    ($($ty:ty),*) => {
        $(
            impl WholeQuantity for $ty {
                fn whole(&self) -> i64 {
                    i64::from(*self)
                }
            }
        )*
    };
}

whole_quantity_for_ints!(i8, i16, i32, i64, u8, u16, u32);

impl WholeQuantity for f64 {
    #[allow(clippy::cast_possible_truncation)] // Truncation is the documented behaviour
    fn whole(&self) -> i64 {
        self.trunc() as i64
    }
}

impl WholeQuantity for f32 {
    fn whole(&self) -> i64 {
        f64::from(*self).whole()
    }
}

impl WholeQuantity for Quantity {
    fn whole(&self) -> i64 {
        i64::from(self.get())
    }
}

impl<T: WholeQuantity + ?Sized> WholeQuantity for &T {
    fn whole(&self) -> i64 {
        (**self).whole()
    }
}

/// Join `"<quantity> <item>"` pairs with `", "`, in iteration order.
///
/// An empty input yields an empty string.
///
/// # Examples
///
/// ```
/// use food_order_core::format_order_items;
///
/// assert_eq!(format_order_items([("rice", 2.0), ("beans", 3.7)]), "2 rice, 3 beans");
/// assert_eq!(format_order_items(Vec::<(&str, u32)>::new()), "");
/// ```
pub fn format_order_items<I, K, Q>(items: I) -> String
where
    I: IntoIterator<Item = (K, Q)>,
    K: fmt::Display,
    Q: WholeQuantity,
{
    items
        .into_iter()
        .map(|(item, quantity)| format!("{} {item}", quantity.whole()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary =
            format_order_items(self.iter().map(|line| (&line.food_item, line.quantity)));
        f.write_str(&summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_mapping_is_empty_string() {
        assert_eq!(format_order_items(Vec::<(&str, i32)>::new()), "");
        assert_eq!(Order::new().to_string(), "");
    }

    #[test]
    fn single_item() {
        assert_eq!(format_order_items([("rice", 1)]), "1 rice");
    }

    #[test]
    fn items_keep_mapping_order() {
        assert_eq!(format_order_items([("rice", 2), ("beans", 3)]), "2 rice, 3 beans");
    }

    #[test]
    fn fractional_quantities_truncate_toward_zero() {
        assert_eq!(format_order_items([("rice", 2.99_f64)]), "2 rice");
        assert_eq!(format_order_items([("rice", -1.5_f64)]), "-1 rice");
        assert_eq!(format_order_items([("rice", 4.5_f32)]), "4 rice");
    }

    #[test]
    fn order_display_matches_formatter() {
        let order = Order::from_raw([("pav bhaji", 2.0), ("mango lassi", 1.0)]).unwrap();
        assert_eq!(order.to_string(), "2 pav bhaji, 1 mango lassi");
    }

    proptest! {
        #[test]
        fn one_pair_per_item_in_order(items in prop::collection::vec(("[a-z]{1,8}", 1u32..100), 0..8)) {
            let rendered = format_order_items(items.iter().map(|(name, qty)| (name, *qty)));

            if items.is_empty() {
                prop_assert_eq!(rendered, "");
            } else {
                let parts: Vec<&str> = rendered.split(", ").collect();
                prop_assert_eq!(parts.len(), items.len());
                for (part, (name, qty)) in parts.iter().zip(&items) {
                    prop_assert_eq!(*part, format!("{qty} {name}"));
                }
            }
        }
    }
}
