pub mod cart;

pub use cart::{CartItemRecord, CartRecord, NewCartRecord};
