pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rest_handlers;
pub mod utils;
