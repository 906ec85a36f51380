//! src/services/drive_service.rs
//!
//! DriveService — file/folder tree operations backed by SQLite for entry
//! metadata, with payload bytes handed to a `MediaStore` backend. Every
//! operation takes the resolved owner id and scopes each statement by it;
//! a row that exists under another owner behaves exactly like a row that
//! does not exist.

use crate::models::entry::{Entry, FOLDER_TYPE};
use crate::services::media_service::{MediaError, MediaStore};
use bytes::Bytes;
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Upper bound on parent-chain walks. A chain deeper than this is treated
/// as cyclic.
const MAX_ANCESTRY_HOPS: usize = 256;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("a non-empty name is required")]
    NameRequired,
    #[error("file payload is missing or empty")]
    EmptyPayload,
    #[error("content type `{0}` is not allowed")]
    UnsupportedMediaType(String),
    #[error("parent folder not found")]
    ParentNotFound,
    #[error("entry not found")]
    EntryNotFound,
    #[error("cannot move a folder into its own subtree")]
    FolderCycle,
    #[error("entry must be trashed before permanent deletion")]
    NotTrashed,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Media(#[from] MediaError),
}

pub type DriveResult<T> = Result<T, DriveError>;

/// An incoming file payload, read fully from the multipart request.
#[derive(Debug)]
pub struct FileUpload {
    /// Display name, usually the client-side filename.
    pub name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// The payload bytes.
    pub data: Bytes,
}

/// Summary of a permanent deletion.
#[derive(Debug)]
pub struct DeleteOutcome {
    /// The entry the caller asked to delete.
    pub entry: Entry,
    /// Number of rows removed (the entry plus its subtree).
    pub removed: u64,
}

/// DriveService provides the tree operations of the drive:
/// - Create a folder (validating the parent reference)
/// - Upload a file (payload to the media backend, metadata into SQLite)
/// - List entries by owner and parent
/// - Toggle the starred/trashed flags atomically
/// - Move an entry to a new parent, rejecting cycles
/// - Permanently delete a trashed entry and its subtree
#[derive(Clone)]
pub struct DriveService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Backend holding payload bytes.
    pub media: MediaStore,
}

impl DriveService {
    /// Create a new DriveService over the provided pool and media backend.
    pub fn new(db: Arc<SqlitePool>, media: MediaStore) -> Self {
        Self { db, media }
    }

    /// Fetch an entry by id, scoped to its owner.
    ///
    /// Returns EntryNotFound when the row is absent or owned by someone
    /// else.
    async fn fetch_entry(&self, owner: &str, id: Uuid) -> DriveResult<Entry> {
        sqlx::query_as::<_, Entry>(
            "SELECT id, name, path, size, entry_type, file_url, thumbnail_url,
                    owner_id, parent_id, is_folder, is_starred, is_trashed,
                    created_at, updated_at
             FROM entries WHERE id = ? AND owner_id = ?",
        )
        .bind(id)
        .bind(owner)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => DriveError::EntryNotFound,
            other => DriveError::Sqlx(other),
        })
    }

    /// Fetch a folder the caller intends to use as a parent.
    ///
    /// Returns ParentNotFound when the row is absent, foreign-owned, or not
    /// a folder.
    async fn fetch_folder(&self, owner: &str, id: Uuid) -> DriveResult<Entry> {
        sqlx::query_as::<_, Entry>(
            "SELECT id, name, path, size, entry_type, file_url, thumbnail_url,
                    owner_id, parent_id, is_folder, is_starred, is_trashed,
                    created_at, updated_at
             FROM entries WHERE id = ? AND owner_id = ? AND is_folder = 1",
        )
        .bind(id)
        .bind(owner)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => DriveError::ParentNotFound,
            other => DriveError::Sqlx(other),
        })
    }

    /// Create a folder at the root or inside an existing parent folder.
    ///
    /// The parent, when given, must exist, belong to the same owner and be
    /// a folder. The folder's `path` is synthetic and never resolved
    /// against the media backend.
    pub async fn create_folder(
        &self,
        owner: &str,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> DriveResult<Entry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DriveError::NameRequired);
        }
        if let Some(parent) = parent_id {
            self.fetch_folder(owner, parent).await?;
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let entry = sqlx::query_as::<_, Entry>(
            r#"
            INSERT INTO entries (
                id, name, path, size, entry_type, file_url, thumbnail_url,
                owner_id, parent_id, is_folder, is_starred, is_trashed,
                created_at, updated_at
            ) VALUES (?, ?, ?, 0, ?, '', NULL, ?, ?, 1, 0, 0, ?, ?)
            RETURNING id, name, path, size, entry_type, file_url, thumbnail_url,
                      owner_id, parent_id, is_folder, is_starred, is_trashed,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(format!("/folders/{}/{}", owner, id))
        .bind(FOLDER_TYPE)
        .bind(owner)
        .bind(parent_id)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        Ok(entry)
    }

    /// Store a payload with the media backend and persist its metadata.
    ///
    /// The parent folder is mandatory; files cannot live at the root. Only
    /// `image/*` and `application/pdf` payloads are accepted, and only
    /// image uploads keep a thumbnail URL. When the metadata insert fails
    /// after the payload was stored, the payload is removed best-effort
    /// before the failure is surfaced.
    pub async fn upload_file(
        &self,
        owner: &str,
        parent_id: Uuid,
        upload: FileUpload,
    ) -> DriveResult<Entry> {
        let name = upload.name.trim().to_string();
        if name.is_empty() {
            return Err(DriveError::NameRequired);
        }
        if upload.data.is_empty() {
            return Err(DriveError::EmptyPayload);
        }
        if !is_allowed_content_type(&upload.content_type) {
            return Err(DriveError::UnsupportedMediaType(upload.content_type));
        }
        self.fetch_folder(owner, parent_id).await?;

        let storage_name = unique_storage_name(&name);
        let folder_path = format!("drive/{}/folder/{}", owner, parent_id);
        let size = upload.data.len() as i64;
        let stored = self
            .media
            .upload(&folder_path, &storage_name, upload.data)
            .await?;

        let thumbnail_url = if upload.content_type.starts_with("image/") {
            stored.thumbnail_url.clone()
        } else {
            None
        };

        let now = Utc::now();
        let insert_result = sqlx::query_as::<_, Entry>(
            r#"
            INSERT INTO entries (
                id, name, path, size, entry_type, file_url, thumbnail_url,
                owner_id, parent_id, is_folder, is_starred, is_trashed,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?)
            RETURNING id, name, path, size, entry_type, file_url, thumbnail_url,
                      owner_id, parent_id, is_folder, is_starred, is_trashed,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&stored.path)
        .bind(size)
        .bind(&upload.content_type)
        .bind(&stored.url)
        .bind(thumbnail_url)
        .bind(owner)
        .bind(parent_id)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(entry) => Ok(entry),
            Err(err) => {
                if let Err(media_err) = self.media.delete(&stored.path).await {
                    warn!(
                        "failed to remove payload {} after insert error: {}",
                        stored.path, media_err
                    );
                }
                Err(DriveError::Sqlx(err))
            }
        }
    }

    /// List entries owned by `owner` under the given parent, or at the
    /// root when no parent is given.
    ///
    /// The parent itself is not checked for existence; an unknown parent id
    /// simply yields an empty list. No ordering or trash filtering is
    /// applied.
    pub async fn list_entries(
        &self,
        owner: &str,
        parent_id: Option<Uuid>,
    ) -> DriveResult<Vec<Entry>> {
        let entries = match parent_id {
            Some(parent) => {
                sqlx::query_as::<_, Entry>(
                    "SELECT id, name, path, size, entry_type, file_url, thumbnail_url,
                            owner_id, parent_id, is_folder, is_starred, is_trashed,
                            created_at, updated_at
                     FROM entries WHERE owner_id = ? AND parent_id = ?",
                )
                .bind(owner)
                .bind(parent)
                .fetch_all(&*self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Entry>(
                    "SELECT id, name, path, size, entry_type, file_url, thumbnail_url,
                            owner_id, parent_id, is_folder, is_starred, is_trashed,
                            created_at, updated_at
                     FROM entries WHERE owner_id = ? AND parent_id IS NULL",
                )
                .bind(owner)
                .fetch_all(&*self.db)
                .await?
            }
        };
        Ok(entries)
    }

    /// Flip the starred flag with a single conditional update.
    ///
    /// Absent and foreign-owned ids are indistinguishable: both leave the
    /// update without a row and map to EntryNotFound.
    pub async fn toggle_starred(&self, owner: &str, id: Uuid) -> DriveResult<Entry> {
        sqlx::query_as::<_, Entry>(
            "UPDATE entries SET is_starred = NOT is_starred, updated_at = ?
             WHERE id = ? AND owner_id = ?
             RETURNING id, name, path, size, entry_type, file_url, thumbnail_url,
                       owner_id, parent_id, is_folder, is_starred, is_trashed,
                       created_at, updated_at",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(DriveError::EntryNotFound)
    }

    /// Flip the trashed flag with a single conditional update.
    pub async fn toggle_trashed(&self, owner: &str, id: Uuid) -> DriveResult<Entry> {
        sqlx::query_as::<_, Entry>(
            "UPDATE entries SET is_trashed = NOT is_trashed, updated_at = ?
             WHERE id = ? AND owner_id = ?
             RETURNING id, name, path, size, entry_type, file_url, thumbnail_url,
                       owner_id, parent_id, is_folder, is_starred, is_trashed,
                       created_at, updated_at",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(DriveError::EntryNotFound)
    }

    /// Re-parent an entry, or move it to the root when `new_parent` is
    /// None.
    ///
    /// The new parent must be an existing folder of the same owner. Moving
    /// a folder beneath itself or any of its descendants is rejected before
    /// anything changes.
    pub async fn move_entry(
        &self,
        owner: &str,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> DriveResult<Entry> {
        let entry = self.fetch_entry(owner, id).await?;
        if let Some(parent) = new_parent {
            self.fetch_folder(owner, parent).await?;
            if entry.is_folder && self.is_ancestor(owner, entry.id, parent).await? {
                return Err(DriveError::FolderCycle);
            }
        }

        sqlx::query_as::<_, Entry>(
            "UPDATE entries SET parent_id = ?, updated_at = ?
             WHERE id = ? AND owner_id = ?
             RETURNING id, name, path, size, entry_type, file_url, thumbnail_url,
                       owner_id, parent_id, is_folder, is_starred, is_trashed,
                       created_at, updated_at",
        )
        .bind(new_parent)
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(DriveError::EntryNotFound)
    }

    /// Permanently delete a trashed entry together with its subtree.
    ///
    /// Payloads of contained files are removed from the media backend
    /// best-effort; a failed payload delete is logged and never blocks the
    /// row delete. Returns how many rows were removed.
    pub async fn delete_entry(&self, owner: &str, id: Uuid) -> DriveResult<DeleteOutcome> {
        let entry = self.fetch_entry(owner, id).await?;
        if !entry.is_trashed {
            return Err(DriveError::NotTrashed);
        }

        let subtree = self.collect_subtree(owner, id).await?;

        for item in &subtree {
            if !item.is_folder {
                if let Err(err) = self.media.delete(&item.path).await {
                    warn!("failed to remove payload {}: {}", item.path, err);
                }
            }
        }

        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM entries WHERE owner_id = ");
        builder.push_bind(owner);
        builder.push(" AND id IN (");
        let mut ids = builder.separated(", ");
        for item in &subtree {
            ids.push_bind(item.id);
        }
        ids.push_unseparated(")");
        let result = builder.build().execute(&*self.db).await?;

        Ok(DeleteOutcome {
            entry,
            removed: result.rows_affected(),
        })
    }

    /// Walk the parent chain upward from `start`, reporting whether
    /// `target` appears in it. Capped at MAX_ANCESTRY_HOPS; a deeper chain
    /// is treated as already cyclic.
    async fn is_ancestor(&self, owner: &str, target: Uuid, start: Uuid) -> DriveResult<bool> {
        let mut current = Some(start);
        let mut hops = 0;
        while let Some(cursor) = current {
            if cursor == target {
                return Ok(true);
            }
            hops += 1;
            if hops > MAX_ANCESTRY_HOPS {
                return Err(DriveError::FolderCycle);
            }
            current = sqlx::query_scalar::<_, Option<Uuid>>(
                "SELECT parent_id FROM entries WHERE id = ? AND owner_id = ?",
            )
            .bind(cursor)
            .bind(owner)
            .fetch_optional(&*self.db)
            .await?
            .flatten();
        }
        Ok(false)
    }

    /// Collect an entry and all of its descendants.
    ///
    /// Uses a recursive CTE with UNION (not UNION ALL) so that a corrupted
    /// parent chain terminates instead of spinning.
    async fn collect_subtree(&self, owner: &str, root: Uuid) -> DriveResult<Vec<Entry>> {
        let entries = sqlx::query_as::<_, Entry>(
            r#"
            WITH RECURSIVE subtree(id) AS (
                SELECT id FROM entries WHERE id = ? AND owner_id = ?
                UNION
                SELECT e.id FROM entries e JOIN subtree s ON e.parent_id = s.id
            )
            SELECT e.id, e.name, e.path, e.size, e.entry_type, e.file_url,
                   e.thumbnail_url, e.owner_id, e.parent_id, e.is_folder,
                   e.is_starred, e.is_trashed, e.created_at, e.updated_at
            FROM entries e JOIN subtree s ON e.id = s.id
            "#,
        )
        .bind(root)
        .bind(owner)
        .fetch_all(&*self.db)
        .await?;
        Ok(entries)
    }
}

/// Only images and PDFs may be uploaded.
fn is_allowed_content_type(content_type: &str) -> bool {
    content_type.starts_with("image/") || content_type == "application/pdf"
}

/// Derive a collision-resistant storage name, keeping a usable extension.
fn unique_storage_name(original: &str) -> String {
    match file_extension(original) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

/// Extract a lowercase extension from a display name.
///
/// Extensions that are empty, longer than 10 characters, or that contain
/// spaces or slashes are discarded.
fn file_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 10 || ext.contains(' ') || ext.contains('/') {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(file_extension("report.pdf"), Some("pdf".into()));
        assert_eq!(file_extension("photo.JPG"), Some("jpg".into()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".into()));
        assert_eq!(file_extension("no-extension"), None);
        assert_eq!(file_extension("bad. name"), None);
        assert_eq!(file_extension("trailing."), None);
        assert_eq!(file_extension("x.superlongext"), None);
    }

    #[test]
    fn storage_names_keep_extension_and_never_collide() {
        let a = unique_storage_name("photo.PNG");
        let b = unique_storage_name("photo.PNG");
        assert!(a.ends_with(".png"));
        assert!(b.ends_with(".png"));
        assert_ne!(a, b);
        assert!(!unique_storage_name("noext").contains('.'));
    }

    #[test]
    fn content_type_allowlist() {
        assert!(is_allowed_content_type("image/png"));
        assert!(is_allowed_content_type("image/jpeg"));
        assert!(is_allowed_content_type("application/pdf"));
        assert!(!is_allowed_content_type("text/plain"));
        assert!(!is_allowed_content_type("application/zip"));
        assert!(!is_allowed_content_type("video/mp4"));
    }
}
