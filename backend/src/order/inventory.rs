//! Variant inventory reservation
//!
//! Stock is tracked per (size, color) on the product. Reservation happens
//! once per line item at order creation and floors at zero; products without
//! variant tracking are not quantity-limited.

use serde::{Deserialize, Serialize};

use super::model::OrderItem;

/// Stock for one (size, color) variant of a product
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VariantStock {
    pub size: String,
    pub color: String,
    pub quantity: i32,
}

/// Outcome of reserving one line item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Decremented { previous: i32, remaining: i32 },
    /// Item names a size and color the product does not stock
    NoMatchingVariant,
    /// Product has no variant tracking or the item names no variant
    Untracked,
}

/// Apply a line item's quantity to the matching variant in place.
pub fn reserve(variants: Option<&mut Vec<VariantStock>>, item: &OrderItem) -> Reservation {
    let (Some(size), Some(color)) = (item.selected_size.as_deref(), item.selected_color.as_deref())
    else {
        return Reservation::Untracked;
    };
    let Some(variants) = variants else {
        return Reservation::Untracked;
    };

    match variants
        .iter_mut()
        .find(|v| v.size == size && v.color == color)
    {
        Some(variant) => {
            let previous = variant.quantity;
            variant.quantity = previous.saturating_sub(item.quantity).max(0);
            Reservation::Decremented {
                previous,
                remaining: variant.quantity,
            }
        }
        None => Reservation::NoMatchingVariant,
    }
}
