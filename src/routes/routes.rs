//! Defines routes for all drive operations.
//!
//! ## Structure
//! - **Entry endpoints**
//!   - `GET    /files`                 — list entries (supports userId, parentId)
//!   - `POST   /files/upload`          — upload a file into a folder
//!   - `PATCH  /files/{file_id}/star`  — toggle the starred flag
//!   - `PATCH  /files/{file_id}/trash` — toggle the trashed flag
//!   - `PATCH  /files/{file_id}/move`  — re-parent an entry
//!   - `DELETE /files/{file_id}`       — permanently delete a trashed entry
//!
//! - **Folder endpoints**
//!   - `POST   /folders/create`        — create a folder
//!
//! - **Media endpoints**
//!   - `GET    /media/{*path}`         — stream a locally stored payload
//!
//! The wildcard `*path` allows the nested storage paths the media backend
//! produces, like `drive/user_a/folder/{id}/{name}`.

use crate::handlers::{
    AppState,
    file_handlers::{
        delete_entry, list_entries, move_entry, toggle_star, toggle_trash, upload_file,
    },
    folder_handlers::create_folder,
    health_handlers::{healthz, readyz},
    media_handlers::serve_media,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};

/// Uploads are buffered in memory before they reach the media backend, so
/// request bodies are capped.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build and return the router for all drive routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Entry routes
        .route("/files", get(list_entries))
        .route("/files/upload", post(upload_file))
        .route("/files/{file_id}/star", patch(toggle_star))
        .route("/files/{file_id}/trash", patch(toggle_trash))
        .route("/files/{file_id}/move", patch(move_entry))
        .route("/files/{file_id}", delete(delete_entry))
        // Folder routes
        .route("/folders/create", post(create_folder))
        // Media routes
        .route("/media/{*path}", get(serve_media))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
