pub mod auth;
pub mod geo;
pub mod pagination;

pub use auth::{create_token, hash_code, verify_code, verify_token};
