//! Wat2Do events and clubs discovery API.

pub mod config;
pub mod export;
pub mod handlers;
pub mod index;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
