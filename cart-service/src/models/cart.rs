//! Store-side shapes of a cart document.
//!
//! These carry native `ObjectId`s; the wire shapes in `dtos` carry hex strings.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize};

/// A cart document as read back from the `carts` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<CartItemRecord>,
}

/// Insert shape of a cart; the store assigns `_id`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCartRecord {
    pub items: Vec<CartItemRecord>,
}

/// An item embedded in a cart's `items` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItemRecord {
    pub id: ObjectId,
    pub cart_id: ObjectId,
    pub product: String,
    pub quantity: f64,
}

impl CartItemRecord {
    pub fn new(cart_id: ObjectId, product: impl Into<String>, quantity: f64) -> Self {
        Self {
            id: ObjectId::new(),
            cart_id,
            product: product.into(),
            quantity,
        }
    }
}

// A cart written with a null array still reads back with an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CartItemRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CartItemRecord>>::deserialize(deserializer)?.unwrap_or_default())
}
