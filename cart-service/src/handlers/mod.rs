pub mod carts;
pub mod error;
pub mod health;

pub use carts::{add_to_cart, create_cart, remove_from_cart, view_cart};
pub use error::ApiError;
pub use health::{health_check, metrics_endpoint};
