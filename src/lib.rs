// Content graph - personalized, paginated views and idempotent relationship
// toggles over a document store

// Infrastructure - store, ids, viewer context
pub mod infrastructure;

// Typed records
pub mod entities;

// Read side and write side
pub mod pipeline;
pub mod toggle;
pub mod services;

// HTTP surface and wiring
pub mod content_interface;
pub mod app_state;

// Common utilities
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
