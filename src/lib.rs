// Photo sharing backend - users, photos, comments, likes and friends over a
// JSON API

// Core types and primitives
pub mod core;

// Storage, auth, caching and other infrastructure components
pub mod infrastructure;

// Records, request bodies and response views
pub mod models;

// Business logic
pub mod services;

// HTTP routers and handlers
pub mod api;

pub mod app_state;
pub mod config;
pub mod data_seeder;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
