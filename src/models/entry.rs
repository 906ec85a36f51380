//! Represents a single node in a user's file tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The `type` value carried by folder entries.
pub const FOLDER_TYPE: &str = "folder";

/// A file or folder record in the storage tree.
///
/// Files and folders share one shape. Folders carry `type = "folder"`, zero
/// size and an empty `fileUrl`; files point at a payload held by the media
/// backend. The struct stores metadata only, never payload bytes.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique identifier, assigned at creation.
    pub id: Uuid,

    /// Display name. Non-empty after trimming.
    pub name: String,

    /// Storage location: a synthetic logical path for folders, the path
    /// reported by the media backend for files.
    pub path: String,

    /// Payload size in bytes. Always 0 for folders.
    pub size: i64,

    /// MIME type for files, the literal `"folder"` for folders.
    #[serde(rename = "type")]
    pub entry_type: String,

    /// Retrieval URL for files. Empty string for folders.
    pub file_url: String,

    /// Optional preview URL. Only present for image files.
    pub thumbnail_url: Option<String>,

    /// Identifier of the owning user. Set at creation, never changed.
    pub owner_id: String,

    /// Parent folder id. Absent for entries at the user's root.
    pub parent_id: Option<Uuid>,

    /// Distinguishes folder entries from file entries. Immutable.
    pub is_folder: bool,

    /// User-toggleable favourite flag.
    pub is_starred: bool,

    /// Soft-delete flag. Trashed entries stay in place until permanently
    /// deleted.
    pub is_trashed: bool,

    /// Timestamp when the entry was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}
