pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod store;
