// Tenant Query Agent - Library root for testing

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod intent;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
