//! HTTP handlers for file-tree operations: listing, upload, flag toggles,
//! moves and permanent deletion. Handlers stay thin and delegate the tree
//! rules to `DriveService`.

use crate::{
    auth::Identity,
    errors::AppError,
    handlers::AppState,
    models::entry::Entry,
    services::drive_service::FileUpload,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::Field},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Query params accepted by the listing endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Body accepted by the move endpoint. A missing or null parent moves the
/// entry to the root.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub parent_id: Option<Uuid>,
}

/// Trash toggles answer with the updated entry plus a human-readable
/// message describing which way the flag flipped.
#[derive(Serialize)]
pub struct TrashResponse {
    #[serde(flatten)]
    pub entry: Entry,
    pub message: String,
}

/// GET `/files?userId=&parentId=` — list entries under a parent, or the
/// caller's root entries when no parent is given.
pub async fn list_entries(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Entry>>, AppError> {
    identity.ensure_owner(query.user_id.as_deref())?;
    let entries = state
        .drive
        .list_entries(&identity.user_id, query.parent_id)
        .await?;
    Ok(Json(entries))
}

/// POST `/files/upload` — multipart upload of a single file into a folder.
///
/// Accepted fields: `file` (required), `parentId` (required), `userId`
/// (optional, must match the caller when present). Unknown fields are
/// ignored.
pub async fn upload_file(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<Entry>, AppError> {
    let mut file: Option<FileUpload> = None;
    let mut declared_owner: Option<String> = None;
    let mut parent_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart payload: {}", err)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read file payload: {}", err))
                })?;
                file = Some(FileUpload {
                    name,
                    content_type,
                    data,
                });
            }
            "userId" => {
                declared_owner = Some(read_text_field(field).await?);
            }
            "parentId" => {
                let raw = read_text_field(field).await?;
                let parsed = raw
                    .parse::<Uuid>()
                    .map_err(|_| AppError::bad_request("parentId must be a valid id"))?;
                parent_id = Some(parsed);
            }
            _ => {}
        }
    }

    identity.ensure_owner(declared_owner.as_deref())?;
    let upload = file.ok_or_else(|| AppError::bad_request("a file payload is required"))?;
    let parent_id = parent_id.ok_or_else(|| AppError::bad_request("parentId is required"))?;

    let entry = state
        .drive
        .upload_file(&identity.user_id, parent_id, upload)
        .await?;
    Ok(Json(entry))
}

/// PATCH `/files/{file_id}/star` — flip the starred flag.
pub async fn toggle_star(
    State(state): State<AppState>,
    identity: Identity,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Entry>, AppError> {
    let entry = state
        .drive
        .toggle_starred(&identity.user_id, file_id)
        .await?;
    Ok(Json(entry))
}

/// PATCH `/files/{file_id}/trash` — flip the trashed flag.
pub async fn toggle_trash(
    State(state): State<AppState>,
    identity: Identity,
    Path(file_id): Path<Uuid>,
) -> Result<Json<TrashResponse>, AppError> {
    let entry = state
        .drive
        .toggle_trashed(&identity.user_id, file_id)
        .await?;
    let action = if entry.is_trashed {
        "moved to trash"
    } else {
        "restored"
    };
    Ok(Json(TrashResponse {
        message: format!("File {} successfully", action),
        entry,
    }))
}

/// PATCH `/files/{file_id}/move` — re-parent an entry.
pub async fn move_entry(
    State(state): State<AppState>,
    identity: Identity,
    Path(file_id): Path<Uuid>,
    Json(body): Json<MoveRequest>,
) -> Result<Json<Entry>, AppError> {
    let entry = state
        .drive
        .move_entry(&identity.user_id, file_id, body.parent_id)
        .await?;
    Ok(Json(entry))
}

/// DELETE `/files/{file_id}` — permanently delete a trashed entry, its
/// subtree and the stored payloads of contained files.
pub async fn delete_entry(
    State(state): State<AppState>,
    identity: Identity,
    Path(file_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let outcome = state
        .drive
        .delete_entry(&identity.user_id, file_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "File deleted successfully",
        "deleted": outcome.removed,
    })))
}

async fn read_text_field(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("failed to read form field: {}", err)))
}
