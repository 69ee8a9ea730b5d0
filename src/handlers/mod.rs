pub mod admin;
pub mod auth;
pub mod customers;
pub mod delivery;
pub mod merchants;
pub mod orders;
pub mod stores;
