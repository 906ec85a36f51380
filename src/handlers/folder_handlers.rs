//! HTTP handler for folder creation.

use crate::{auth::Identity, errors::AppError, handlers::AppState, models::entry::Entry};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JSON body for folder creation. `userId`, when present, must match the
/// caller; the owner recorded on the folder always comes from the token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Response body for folder creation.
#[derive(Serialize)]
pub struct CreateFolderResponse {
    pub success: bool,
    pub message: String,
    pub folder: Entry,
}

/// POST `/folders/create` — create a folder at the root or inside an
/// existing parent folder.
pub async fn create_folder(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateFolderRequest>,
) -> Result<Json<CreateFolderResponse>, AppError> {
    identity.ensure_owner(body.user_id.as_deref())?;
    let name = body.name.unwrap_or_default();
    let folder = state
        .drive
        .create_folder(&identity.user_id, &name, body.parent_id)
        .await?;

    Ok(Json(CreateFolderResponse {
        success: true,
        message: "Folder created successfully".to_string(),
        folder,
    }))
}
