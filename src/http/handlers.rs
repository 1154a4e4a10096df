use super::state::AppState;
use crate::audio::AudioClip;
use crate::translate::TranslateError;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info};

/// Environment variable holding the upstream credential
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// POST /api/translate
/// Forward an uploaded audio blob to the speech service and relay its answer
pub async fn translate(State(state): State<AppState>, multipart: Multipart) -> Response {
    // The credential is resolved per request, so fixing the environment does
    // not require a restart.
    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            error!("{} is not set; rejecting relay request", API_KEY_ENV);
            return error_response("API key not configured");
        }
    };

    let clip = match read_audio_field(multipart).await {
        Ok(clip) => clip,
        Err(e) => {
            error!("Invalid translate request: {}", e);
            return error_response(format!("Invalid request: {}", e));
        }
    };

    info!("Relaying {} byte upload to speech service", clip.len());

    match state.groq.translate_with_key(&api_key, clip).await {
        // The upstream body goes back verbatim
        Ok(translation) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            translation.body,
        )
            .into_response(),
        Err(TranslateError::Upstream { status, message }) => {
            error!("Speech service rejected relay request ({})", status);
            error_response(message)
        }
        Err(e) => {
            error!("Relay request failed: {}", e);
            error_response(e.to_string())
        }
    }
}

/// Pull the `audio` field out of the multipart body
async fn read_audio_field(mut multipart: Multipart) -> anyhow::Result<AudioClip> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("audio") {
            let file_name = field.file_name().unwrap_or("recording.wav").to_string();
            let mime_type = field.content_type().unwrap_or("audio/wav").to_string();
            let bytes = field.bytes().await?;

            return Ok(AudioClip::from_bytes(bytes.to_vec(), file_name, mime_type));
        }
    }

    anyhow::bail!("multipart field `audio` is missing")
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
