#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use cart_service::dtos::{Cart, CartItem};
use cart_service::models::{CartItemRecord, CartRecord};
use cart_service::services::carts::{parse_id, NO_CARTS, NO_ITEMS};
use cart_service::services::{CartError, CartService};
use cart_service::{build_router, AppState};
use mongodb::bson::oid::ObjectId;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

pub const TEST_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Keeps carts in memory with the same not-found and id rules as the MongoDB store.
#[derive(Default)]
pub struct InMemoryCartStore {
    carts: Mutex<Vec<CartRecord>>,
}

impl InMemoryCartStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn cart_count(&self) -> usize {
        self.carts.lock().unwrap().len()
    }
}

#[async_trait]
impl CartService for InMemoryCartStore {
    async fn create_cart(&self) -> Result<Cart, CartError> {
        let record = CartRecord {
            id: ObjectId::new(),
            items: Vec::new(),
        };
        self.carts.lock().unwrap().push(record.clone());
        Ok(Cart::from(record))
    }

    async fn cart(&self, id: &str) -> Result<Cart, CartError> {
        let id = parse_id(id)?;
        self.carts
            .lock()
            .unwrap()
            .iter()
            .find(|cart| cart.id == id)
            .cloned()
            .map(Cart::from)
            .ok_or(CartError::NotFound(NO_CARTS))
    }

    async fn add_item_to_cart(
        &self,
        cart_id: &str,
        product: &str,
        quantity: f64,
    ) -> Result<CartItem, CartError> {
        let cart_id = parse_id(cart_id)?;
        let mut carts = self.carts.lock().unwrap();
        let cart = carts
            .iter_mut()
            .find(|cart| cart.id == cart_id)
            .ok_or(CartError::NotFound(NO_CARTS))?;

        let item = CartItemRecord::new(cart_id, product, quantity);
        cart.items.push(item.clone());
        Ok(CartItem::from(item))
    }

    async fn remove_item_from_cart(&self, cart_id: &str, item_id: &str) -> Result<(), CartError> {
        let cart_id = parse_id(cart_id)?;
        let item_id = parse_id(item_id)?;
        let mut carts = self.carts.lock().unwrap();
        let cart = carts
            .iter_mut()
            .find(|cart| cart.id == cart_id)
            .ok_or(CartError::NotFound(NO_CARTS))?;

        let before = cart.items.len();
        cart.items.retain(|item| item.id != item_id);
        if cart.items.len() == before {
            return Err(CartError::NotFound(NO_ITEMS));
        }
        Ok(())
    }
}

/// Fails every call with the same error, whatever the input.
pub struct FailingCartStore {
    pub not_found: bool,
}

impl FailingCartStore {
    fn error(&self) -> CartError {
        if self.not_found {
            CartError::NotFound(NO_CARTS)
        } else {
            CartError::store("could not insert cart", anyhow::anyhow!("connection refused"))
        }
    }
}

#[async_trait]
impl CartService for FailingCartStore {
    async fn create_cart(&self) -> Result<Cart, CartError> {
        Err(self.error())
    }

    async fn cart(&self, _id: &str) -> Result<Cart, CartError> {
        Err(self.error())
    }

    async fn add_item_to_cart(
        &self,
        _cart_id: &str,
        _product: &str,
        _quantity: f64,
    ) -> Result<CartItem, CartError> {
        Err(self.error())
    }

    async fn remove_item_from_cart(&self, _cart_id: &str, _item_id: &str) -> Result<(), CartError> {
        Err(self.error())
    }
}

pub fn router_with(carts: Arc<dyn CartService>) -> Router {
    build_router(AppState::new(carts), TEST_REQUEST_TIMEOUT)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
    pub request_id: Option<String>,
}

impl TestResponse {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_str(&self.body).expect("Failed to parse JSON body")
    }
}

pub async fn send(router: &Router, method: &str, uri: &str, body: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .expect("Failed to build request");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request");

    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    TestResponse {
        status,
        body: String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8"),
        request_id,
    }
}
