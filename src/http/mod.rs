//! HTTP relay endpoint
//!
//! This module provides the passthrough route browser and CLI clients use:
//! - POST /api/translate - Forward an audio upload to the speech service
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, API_KEY_ENV};
pub use routes::create_router;
pub use state::AppState;
