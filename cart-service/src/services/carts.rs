//! Cart persistence.
//!
//! Carts live in a single collection; their items are embedded in the
//! `items` array of the cart document. Mutations are single-document
//! `$addToSet` / `$pull` updates, so concurrent writers to the same cart
//! never lose each other's changes.

use crate::dtos::{Cart, CartItem};
use crate::models::{CartItemRecord, CartRecord, NewCartRecord};
use crate::services::MongoDb;
use async_trait::async_trait;
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::Collection;
use thiserror::Error;

pub const NO_CARTS: &str = "no carts";
pub const NO_ITEMS: &str = "no items";
pub const NO_CARTS_OR_ITEMS: &str = "no carts or items";

#[derive(Debug, Error)]
pub enum CartError {
    #[error("could not convert {id} to ObjectID: {source}")]
    InvalidIdentifier {
        id: String,
        source: bson::oid::Error,
    },

    #[error("{0}: not found")]
    NotFound(&'static str),

    #[error("{context}: {cause}")]
    Store {
        context: &'static str,
        cause: anyhow::Error,
    },
}

impl CartError {
    pub fn store(context: &'static str, cause: impl Into<anyhow::Error>) -> Self {
        CartError::Store {
            context,
            cause: cause.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CartError::NotFound(_))
    }
}

/// The cart operations the HTTP layer depends on.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Creates an empty cart with a store-assigned id.
    async fn create_cart(&self) -> Result<Cart, CartError>;

    async fn cart(&self, id: &str) -> Result<Cart, CartError>;

    /// Appends a new item and returns it as written, without re-reading the cart.
    async fn add_item_to_cart(
        &self,
        cart_id: &str,
        product: &str,
        quantity: f64,
    ) -> Result<CartItem, CartError>;

    async fn remove_item_from_cart(&self, cart_id: &str, item_id: &str) -> Result<(), CartError>;
}

pub fn parse_id(id: &str) -> Result<ObjectId, CartError> {
    ObjectId::parse_str(id).map_err(|source| CartError::InvalidIdentifier {
        id: id.to_string(),
        source,
    })
}

#[derive(Clone)]
pub struct MongoCartStore {
    carts: Collection<CartRecord>,
}

impl MongoCartStore {
    pub fn new(db: &MongoDb, collection: &str) -> Self {
        Self {
            carts: db.database().collection(collection),
        }
    }

    /// Looks up one item of a cart.
    pub async fn item_from_cart(&self, cart_id: &str, item_id: &str) -> Result<CartItem, CartError> {
        let cart_oid = parse_id(cart_id)?;
        let item_oid = parse_id(item_id)?;

        let filter = doc! {
            "_id": cart_oid,
            "items": { "$elemMatch": { "id": item_oid } },
        };
        let cart = self
            .carts
            .find_one(filter, None)
            .await
            .map_err(|e| CartError::store("could not decode document", e))?
            .ok_or(CartError::NotFound(NO_CARTS_OR_ITEMS))?;

        cart.items
            .into_iter()
            .find(|item| item.id == item_oid)
            .map(CartItem::from)
            .ok_or(CartError::NotFound(NO_CARTS_OR_ITEMS))
    }

    /// Drops the whole collection.
    pub async fn drop_collection(&self) -> Result<(), CartError> {
        self.carts
            .drop(None)
            .await
            .map_err(|e| CartError::store("could not drop carts collection", e))
    }
}

#[async_trait]
impl CartService for MongoCartStore {
    async fn create_cart(&self) -> Result<Cart, CartError> {
        let result = self
            .carts
            .clone_with_type::<NewCartRecord>()
            .insert_one(NewCartRecord::default(), None)
            .await
            .map_err(|e| CartError::store("could not insert cart", e))?;

        let id = result.inserted_id.as_object_id().ok_or_else(|| {
            CartError::store(
                "could not insert cart",
                anyhow::anyhow!("could not convert {} to ObjectID", result.inserted_id),
            )
        })?;

        tracing::debug!(cart_id = %id, "Cart created");

        Ok(Cart {
            id: id.to_hex(),
            items: Vec::new(),
        })
    }

    async fn cart(&self, id: &str) -> Result<Cart, CartError> {
        let cart_oid = parse_id(id)?;

        let cart = self
            .carts
            .find_one(doc! { "_id": cart_oid }, None)
            .await
            .map_err(|e| CartError::store("could not decode document", e))?
            .ok_or(CartError::NotFound(NO_CARTS))?;

        Ok(Cart::from(cart))
    }

    async fn add_item_to_cart(
        &self,
        cart_id: &str,
        product: &str,
        quantity: f64,
    ) -> Result<CartItem, CartError> {
        let cart_oid = parse_id(cart_id)?;
        let item = CartItemRecord::new(cart_oid, product, quantity);

        let item_bson =
            bson::to_bson(&item).map_err(|e| CartError::store("could not add item to cart", e))?;
        let result = self
            .carts
            .update_one(
                doc! { "_id": cart_oid },
                doc! { "$addToSet": { "items": item_bson } },
                None,
            )
            .await
            .map_err(|e| CartError::store("could not add item to cart", e))?;

        if result.matched_count == 0 {
            return Err(CartError::NotFound(NO_CARTS));
        }
        // Item ids are fresh, so $addToSet always grows a matched cart.
        if result.modified_count == 0 {
            return Err(CartError::store(
                "could not add item",
                anyhow::anyhow!("cart {} was matched but not modified", cart_id),
            ));
        }

        tracing::debug!(cart_id = %cart_oid, item_id = %item.id, "Item added to cart");

        Ok(CartItem::from(item))
    }

    async fn remove_item_from_cart(&self, cart_id: &str, item_id: &str) -> Result<(), CartError> {
        let cart_oid = parse_id(cart_id)?;
        let item_oid = parse_id(item_id)?;

        let result = self
            .carts
            .update_one(
                doc! { "_id": cart_oid },
                doc! { "$pull": { "items": { "id": item_oid } } },
                None,
            )
            .await
            .map_err(|e| CartError::store("could not delete item from cart", e))?;

        if result.matched_count == 0 {
            return Err(CartError::NotFound(NO_CARTS));
        }
        if result.modified_count == 0 {
            return Err(CartError::NotFound(NO_ITEMS));
        }

        tracing::debug!(cart_id = %cart_oid, item_id = %item_oid, "Item removed from cart");

        Ok(())
    }
}
