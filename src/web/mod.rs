//! Synchronous scan web service: `POST /scan` with a multipart `malware` file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing::Instrument;

use crate::config::Config;
use crate::error::{Result, WindefError};
use crate::result::PluginResults;
use crate::scanner::Scanner;

/// Multipart field holding the upload.
pub const UPLOAD_FIELD: &str = "malware";

pub struct AppState {
    pub scanner: Scanner,
    pub work_dir: PathBuf,
    pub scan_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scanner: Scanner::new(&config.scanner),
            work_dir: config.web.work_dir.clone(),
            scan_timeout: config.web.scan_timeout(),
        }
    }
}

/// Uploads stream to disk, so the body is unbounded unless a cap is given.
pub fn router(state: Arc<AppState>, max_upload_bytes: Option<usize>) -> Router {
    let body_limit = match max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };
    Router::new()
        .route("/scan", post(scan_upload))
        .layer(body_limit)
        .with_state(state)
}

/// Bind `addr` and serve until the listener fails.
pub async fn serve(config: &Config) -> Result<()> {
    let listener = TcpListener::bind(config.web.listen).await?;
    let bound: SocketAddr = listener.local_addr()?;
    let state = Arc::new(AppState::from_config(config));
    tracing::info!(
        addr = %bound,
        scanner = %state.scanner.binary().display(),
        "web service listening"
    );

    axum::serve(listener, router(state, config.web.max_upload_bytes)).await?;
    Ok(())
}

/// Request failures, each mapped to a status code.
#[derive(Debug)]
pub enum ApiError {
    MissingFile,
    /// Malformed or oversized multipart body; keeps axum's status (400/413).
    BadUpload(MultipartError),
    Internal(WindefError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingFile => (
                StatusCode::BAD_REQUEST,
                "Please supply a valid file to scan.\n",
            )
                .into_response(),
            Self::BadUpload(e) => {
                tracing::warn!(status = %e.status(), error = %e.body_text(), "rejected upload");
                e.into_response()
            }
            Self::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

impl From<WindefError> for ApiError {
    fn from(e: WindefError) -> Self {
        Self::Internal(e)
    }
}

async fn scan_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> std::result::Result<Json<PluginResults>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("scan_request", %request_id);
    handle_upload(state, multipart).instrument(span).await
}

async fn handle_upload(
    state: Arc<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<Json<PluginResults>, ApiError> {
    // Removed on drop, whatever the outcome.
    let staged = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(ApiError::BadUpload)?;
        let Some(mut field) = field else {
            tracing::warn!("upload without a {UPLOAD_FIELD} field");
            return Err(ApiError::MissingFile);
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        tracing::debug!(file_name = field.file_name().unwrap_or("-"), "receiving upload");
        let staged = tempfile::Builder::new()
            .prefix("web_")
            .tempfile_in(&state.work_dir)
            .map_err(WindefError::from)?;
        let mut writer = tokio::fs::File::from_std(staged.reopen().map_err(WindefError::from)?);
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(ApiError::BadUpload)?
        {
            writer.write_all(&chunk).await.map_err(WindefError::from)?;
        }
        writer.flush().await.map_err(WindefError::from)?;
        break staged;
    };

    tracing::debug!(path = %staged.path().display(), "upload staged");
    let result = state
        .scanner
        .scan(staged.path(), state.scan_timeout)
        .await
        .map_err(|e| {
            tracing::error!(
                plugin = crate::result::PLUGIN_NAME,
                category = crate::result::PLUGIN_CATEGORY,
                path = %staged.path().display(),
                error = %e,
                "scan failed"
            );
            e
        })?;

    tracing::info!(infected = result.is_infected(), "scan complete");
    Ok(Json(PluginResults::from(result)))
}
