//! REST API module
//!
//! Provides HTTP endpoints for user registration, token-based login and
//! owner-scoped contact management.

pub mod dto;
pub mod handlers;
pub mod metrics;
pub mod router;

pub use router::create_api_router;
