pub mod carts;

pub use carts::{Cart, CartItem, NewItemRequest};
