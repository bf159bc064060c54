//! Business logic handlers
//!
//! These handlers contain the core session logic used by the HTTP API and
//! the background scheduler.

pub mod sessions;

// Re-export commonly used types
pub use sessions::*;
