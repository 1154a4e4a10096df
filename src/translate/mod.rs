//! Upload contract for finalized recordings.
//!
//! Two deployment modes implement the same contract: [`GroqClient`] posts
//! straight to the hosted speech service with a local credential, while
//! [`RelayClient`] goes through the relay endpoint, which holds the
//! credential server-side.

mod groq;
mod relay;

pub use groq::GroqClient;
pub use relay::RelayClient;

use serde::Deserialize;

use crate::audio::AudioClip;

/// Error message used when an upstream failure carries no detail.
pub const FALLBACK_ERROR: &str = "Translation failed";

/// A completed translation: the extracted text plus the upstream response
/// body exactly as received (the relay passes `body` through untouched).
#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub body: String,
}

/// Success payload from either mode. Extra upstream fields survive in
/// [`Translation::body`].
#[derive(Debug, Deserialize)]
pub(crate) struct TranslationResponse {
    pub(crate) text: String,
}

/// Errors surfaced by either translation mode.
#[derive(Debug)]
pub enum TranslateError {
    /// No API credential available; detected before any network call
    MissingApiKey,
    /// The speech service (or the relay) rejected the request
    Upstream { status: u16, message: String },
    /// The request never completed
    Network(String),
    /// The service answered with something we could not decode
    InvalidResponse(String),
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::MissingApiKey => {
                write!(
                    f,
                    "Groq API key not configured. Set the GROQ_API_KEY environment variable."
                )
            }
            TranslateError::Upstream { status, message } => {
                write!(f, "Speech service error ({}): {}", status, message)
            }
            TranslateError::Network(e) => write!(f, "Network error: {}", e),
            TranslateError::InvalidResponse(e) => {
                write!(f, "Failed to parse service response: {}", e)
            }
        }
    }
}

impl std::error::Error for TranslateError {}

/// The seam the recorder uploads through.
#[async_trait::async_trait]
pub trait Translate: Send + Sync {
    /// Submit one finalized clip and wait for the translated text.
    async fn translate(&self, clip: AudioClip) -> Result<Translation, TranslateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_names_the_env_var() {
        let err = TranslateError::MissingApiKey;
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn upstream_error_keeps_status_and_message() {
        let err = TranslateError::Upstream {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid API key"));
    }
}
