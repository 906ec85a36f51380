//! Streams payloads held by the local media backend.

use crate::{errors::AppError, handlers::AppState, services::media_service::MediaError};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// GET `/media/{*path}` — stream a locally stored payload.
///
/// The route is unauthenticated: payload URLs are capability-style links.
/// Deployments on a remote media backend serve payloads from the backend's
/// own URLs, so this route answers 404 there.
pub async fn serve_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (size, file) = match state.drive.media.open_payload(&path).await {
        Ok(found) => found,
        Err(MediaError::NotFound(_)) | Err(MediaError::InvalidPath) => {
            return Err(AppError::not_found("media not found"));
        }
        Err(err) => {
            tracing::error!("failed to open media {}: {}", path, err);
            return Err(AppError::internal("failed to read media"));
        }
    };

    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&size.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    Ok(response)
}
