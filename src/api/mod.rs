//! API Module
//!
//! HTTP handlers and routing for the session cache REST API.
//!
//! # Endpoints
//! - `PUT /cache` - Store a value with a TTL
//! - `GET /cache/:key` - Retrieve a value by key
//! - `DELETE /cache/:key` - Delete a key
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
