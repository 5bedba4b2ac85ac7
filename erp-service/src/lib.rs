pub mod api;
pub mod auth;
pub mod chat_hub;
pub mod config;
pub mod error;
pub mod models;
pub mod schema;
pub mod sefaz;
pub mod store;
pub mod sweeper;
