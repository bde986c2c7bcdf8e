//! Cart endpoints.
//!
//! Bodies are decoded by hand so malformed JSON gets the same plain-text
//! diagnostic as every other failure, whatever the `Content-Type`.

use crate::dtos::{Cart, CartItem, NewItemRequest};
use crate::handlers::ApiError;
use crate::services::{record_operation, CartError};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::collections::HashMap;
use validator::Validate;

type PathParams = Path<HashMap<String, String>>;

fn path_param<'a>(
    params: &'a HashMap<String, String>,
    name: &'static str,
) -> Result<&'a str, ApiError> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingPathParam(name))
}

fn observe<T>(operation: &'static str, result: Result<T, CartError>) -> Result<T, CartError> {
    record_operation(operation, if result.is_ok() { "ok" } else { "error" });
    result
}

pub async fn create_cart(State(state): State<AppState>) -> Result<Json<Cart>, ApiError> {
    let cart = observe("create_cart", state.carts.create_cart().await)
        .map_err(ApiError::store("could not add cart"))?;

    tracing::info!(cart_id = %cart.id, "Created cart");

    Ok(Json(cart))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(params): PathParams,
    body: Bytes,
) -> Result<Json<CartItem>, ApiError> {
    let item: NewItemRequest = serde_json::from_slice(&body).map_err(ApiError::MalformedBody)?;
    let cart_id = path_param(&params, "cart_id")?;
    item.validate().map_err(ApiError::Validation)?;

    let cart_item = observe(
        "add_item",
        state
            .carts
            .add_item_to_cart(cart_id, &item.product, item.quantity)
            .await,
    )
    .map_err(ApiError::store("could not add item to cart"))?;

    tracing::info!(
        cart_id = %cart_item.cart_id,
        item_id = %cart_item.id,
        product = %cart_item.product,
        quantity = cart_item.quantity,
        "Added item to cart"
    );

    Ok(Json(cart_item))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Path(params): PathParams,
) -> Result<StatusCode, ApiError> {
    let cart_id = path_param(&params, "cart_id")?;
    let item_id = path_param(&params, "item_id")?;

    observe(
        "remove_item",
        state.carts.remove_item_from_cart(cart_id, item_id).await,
    )
    .map_err(ApiError::store("could not remove item from cart"))?;

    tracing::info!(cart_id = %cart_id, item_id = %item_id, "Removed item from cart");

    Ok(StatusCode::OK)
}

pub async fn view_cart(
    State(state): State<AppState>,
    Path(params): PathParams,
) -> Result<Json<Cart>, ApiError> {
    let cart_id = path_param(&params, "cart_id")?;

    let cart = observe("view_cart", state.carts.cart(cart_id).await)
        .map_err(ApiError::store("could not get cart"))?;

    Ok(Json(cart))
}
