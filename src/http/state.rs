use crate::translate::GroqClient;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Upstream client, shared across requests for connection reuse
    pub groq: GroqClient,
}

impl AppState {
    pub fn new(groq: GroqClient) -> Self {
        Self { groq }
    }
}
