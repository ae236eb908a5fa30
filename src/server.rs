//! HTTP front end.
//!
//! A single upload endpoint, `POST /add_subtitles`, takes a multipart body
//! with a `video` file part and an `srt` file part and responds with the
//! captioned MP4 as an attachment. Failures are reported as
//! `{"error": "..."}` JSON bodies.
//!
//! Rendering is CPU bound and runs on the blocking thread pool. Every request
//! owns its uploads and temporary files, so requests never share state beyond
//! the read-only [`ServerConfig`].
//!
//! # Example
//!
//! ```no_run
//! use hardsub::{HardsubError, ServerConfig};
//!
//! # async fn run() -> Result<(), HardsubError> {
//! hardsub::server::serve(ServerConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::{config::ServerConfig, error::HardsubError, pipeline};

/// Name of the file returned to the client.
pub const OUTPUT_FILE_NAME: &str = "subtitled_video.mp4";

/// An error response: a status code plus a JSON `error` message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<HardsubError> for ApiError {
    fn from(error: HardsubError) -> Self {
        let status = match error {
            HardsubError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self {
            status: error.status(),
            message: error.body_text(),
        }
    }
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Build the application router.
///
/// Separate from [`serve`] so that tests can drive it without a socket.
pub fn router(config: ServerConfig) -> Router {
    let body_limit = config.max_upload_bytes;
    Router::new()
        .route("/add_subtitles", post(add_subtitles))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(config))
}

/// Bind to `config.address` and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), HardsubError> {
    let address = config.address;
    let listener = tokio::net::TcpListener::bind(address).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to install Ctrl-C handler: {error}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested, draining connections");
}

async fn health() -> &'static str {
    "ok"
}

async fn add_subtitles(
    State(config): State<Arc<ServerConfig>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut video = None;
    let mut srt = None;

    while let Some(field) = multipart.next_field().await? {
        let slot = match field.name() {
            Some("video") => &mut video,
            Some("srt") => &mut srt,
            _ => continue,
        };
        // Parts without a filename are plain form values, not files.
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field.bytes().await?.to_vec();
        *slot = Some(Upload { file_name, bytes });
    }

    let (Some(video), Some(srt)) = (video, srt) else {
        return Err(ApiError::bad_request("No video or SRT file part"));
    };
    if video.file_name.is_empty() || srt.file_name.is_empty() {
        return Err(ApiError::bad_request("No selected file"));
    }
    let srt_text = String::from_utf8(srt.bytes)
        .map_err(|_| ApiError::bad_request("SRT file is not valid UTF-8"))?;

    log::info!(
        "Burning '{}' ({} bytes) into '{}' ({} bytes)",
        srt.file_name,
        srt_text.len(),
        video.file_name,
        video.bytes.len()
    );

    let output = tokio::task::spawn_blocking(move || {
        pipeline::burn_subtitles(&video.bytes, &srt_text, &config.style, &config.render)
    })
    .await
    .map_err(|error| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("Render task failed: {error}"),
    })?
    .inspect_err(|error| log::error!("Burn-in failed: {error}"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{OUTPUT_FILE_NAME}\""),
            ),
        ],
        output,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_maps_to_service_unavailable() {
        let error = ApiError::from(HardsubError::Cancelled);
        assert_eq!(error.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.message(), "Operation cancelled");
    }

    #[test]
    fn media_errors_map_to_internal_error() {
        let error = ApiError::from(HardsubError::NoVideoStream);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
