pub mod carts;
pub mod database;
pub mod metrics;

pub use carts::{CartError, CartService, MongoCartStore};
pub use database::MongoDb;
pub use metrics::{get_metrics, init_metrics, record_operation};
