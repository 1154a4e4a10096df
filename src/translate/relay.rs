//! Client for the relay endpoint: same contract as the direct client, but
//! the credential stays on the server.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{Translate, TranslateError, Translation, TranslationResponse, FALLBACK_ERROR};
use crate::audio::AudioClip;

/// Relay failure payload: `{ "error": ... }`
#[derive(Debug, Deserialize)]
struct RelayErrorResponse {
    error: String,
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    url: String,
}

impl RelayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Translate for RelayClient {
    async fn translate(&self, clip: AudioClip) -> Result<Translation, TranslateError> {
        let file_name = clip.file_name().to_string();
        let mime_type = clip.mime_type().to_string();

        info!("Submitting {} ({} bytes) to relay", file_name, clip.len());

        let part = Part::bytes(clip.into_bytes())
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(&self.url)
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

            Ok(Translation {
                text: parsed.text,
                body,
            })
        } else {
            let message = serde_json::from_str::<RelayErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| FALLBACK_ERROR.to_string());

            Err(TranslateError::Upstream {
                status: status.as_u16(),
                message,
            })
        }
    }
}
