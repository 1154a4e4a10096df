//! Client for the hosted speech-translation service (Groq's
//! OpenAI-compatible audio API).

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use super::{Translate, TranslateError, Translation, TranslationResponse, FALLBACK_ERROR};
use crate::audio::AudioClip;

/// Upstream error payload: `{ "error": { "message": ... } }`
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Direct client for the speech service. The relay handler reuses it with a
/// per-request credential; the `--direct` client mode attaches one up front.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl GroqClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            // Client defaults only: no retries, no explicit timeout
            client: Client::new(),
            url: url.into(),
            model: model.into(),
            api_key: None,
        }
    }

    /// Attach a credential for direct-mode use. Blank keys are ignored, so
    /// the missing-key check still fires before any network call.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        if !api_key.trim().is_empty() {
            self.api_key = Some(api_key);
        }
        self
    }

    /// POST the clip with an explicit credential.
    pub async fn translate_with_key(
        &self,
        api_key: &str,
        clip: AudioClip,
    ) -> Result<Translation, TranslateError> {
        let file_name = clip.file_name().to_string();
        let mime_type = clip.mime_type().to_string();

        info!(
            "Submitting {} ({} bytes) to speech service",
            file_name,
            clip.len()
        );

        let part = Part::bytes(clip.into_bytes())
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        if status.is_success() {
            let parsed: TranslationResponse = serde_json::from_str(&body)
                .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

            info!("Translation succeeded: {} chars", parsed.text.len());

            Ok(Translation {
                text: parsed.text,
                body,
            })
        } else {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| FALLBACK_ERROR.to_string());

            error!("Speech service error ({}): {}", status.as_u16(), message);

            Err(TranslateError::Upstream {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait::async_trait]
impl Translate for GroqClient {
    async fn translate(&self, clip: AudioClip) -> Result<Translation, TranslateError> {
        // Checked before any network I/O
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(TranslateError::MissingApiKey)?;

        self.translate_with_key(api_key, clip).await
    }
}
