use crate::models::{CartItemRecord, CartRecord};
use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

/// Largest magnitude still written as an integer literal.
const MAX_INTEGRAL_QUANTITY: f64 = 1e15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub product: String,
    #[serde(serialize_with = "serialize_quantity")]
    pub quantity: f64,
}

/// Body of `POST /carts/:cart_id/items`.
///
/// Absent fields decode to their zero value and are then rejected by validation.
/// Capitalised and upper-case field names are accepted too; other casings are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewItemRequest {
    #[serde(default, alias = "Product", alias = "PRODUCT")]
    #[validate(length(min = 1))]
    pub product: String,
    #[serde(default, alias = "Quantity", alias = "QUANTITY")]
    #[validate(range(exclusive_min = 0.0))]
    pub quantity: f64,
}

impl From<CartRecord> for Cart {
    fn from(record: CartRecord) -> Self {
        Self {
            id: record.id.to_hex(),
            items: record.items.into_iter().map(CartItem::from).collect(),
        }
    }
}

impl From<CartItemRecord> for CartItem {
    fn from(record: CartItemRecord) -> Self {
        Self {
            id: record.id.to_hex(),
            cart_id: record.cart_id.to_hex(),
            product: record.product,
            quantity: record.quantity,
        }
    }
}

// Whole quantities below 1e15 go out as integers (`10`, not `10.0`).
// Anything larger keeps serde_json's float form (`1e16`).
fn serialize_quantity<S>(quantity: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if quantity.fract() == 0.0 && quantity.abs() < MAX_INTEGRAL_QUANTITY {
        serializer.serialize_i64(*quantity as i64)
    } else {
        serializer.serialize_f64(*quantity)
    }
}
