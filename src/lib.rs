//! # Contacts Service
//!
//! REST API for per-user contact management with token-based authentication.
//!
//! ## Architecture
//!
//! - **auth**: password hashing, JWT access/refresh tokens, request authentication
//! - **infrastructure**: external concerns (database connection, entities, migrations)
//! - **api**: REST API with Swagger documentation
//! - **config**: application configuration loaded from TOML

pub mod api;
pub mod auth;
pub mod config;
pub mod infrastructure;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig};

// Re-export API router
pub use api::create_api_router;
