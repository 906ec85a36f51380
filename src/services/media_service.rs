//! src/services/media_service.rs
//!
//! MediaStore — payload storage behind the drive. Entry metadata lives in
//! SQLite; the bytes themselves live either on local disk (sharded beneath
//! `base_path/{shard}/{shard}/{path}`) or behind a remote media API that
//! hands back retrieval and thumbnail URLs. The drive service only ever
//! talks to the `MediaStore` front, never to a concrete backend.

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde::Deserialize;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_MEDIA_PATH_LEN: usize = 1024;
const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid media path")]
    InvalidPath,
    #[error("media `{0}` not found")]
    NotFound(String),
    #[error("media backend answered {status}: {message}")]
    Backend { status: u16, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// What the backend reports after storing a payload.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    /// Public retrieval URL for the payload.
    pub url: String,

    /// Preview URL, when the backend produces one.
    pub thumbnail_url: Option<String>,

    /// Backend-side storage path, used later for deletion.
    pub path: String,
}

/// Payload storage with two interchangeable backends.
#[derive(Clone)]
pub enum MediaStore {
    Local(LocalMediaStore),
    Remote(RemoteMediaStore),
}

impl MediaStore {
    /// Build a disk-backed store rooted at `base_path`. Retrieval URLs are
    /// formed against `public_base_url` and answered by the `/media` route.
    pub fn local(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        MediaStore::Local(LocalMediaStore::new(base_path, public_base_url))
    }

    /// Build a client for a remote media API.
    pub fn remote(endpoint: impl Into<String>, api_key: impl Into<String>) -> MediaResult<Self> {
        Ok(MediaStore::Remote(RemoteMediaStore::new(endpoint, api_key)?))
    }

    /// Store a payload as `file_name` beneath `folder` and report where it
    /// ended up.
    pub async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        data: Bytes,
    ) -> MediaResult<StoredMedia> {
        match self {
            MediaStore::Local(local) => local.upload(folder, file_name, data).await,
            MediaStore::Remote(remote) => remote.upload(folder, file_name, data).await,
        }
    }

    /// Remove a stored payload. A payload that is already gone counts as
    /// removed.
    pub async fn delete(&self, path: &str) -> MediaResult<()> {
        match self {
            MediaStore::Local(local) => local.delete(path).await,
            MediaStore::Remote(remote) => remote.delete(path).await,
        }
    }

    /// Open a locally stored payload for streaming, returning its size and
    /// an opened file handle. Remote backends never serve payloads
    /// themselves, so they answer NotFound.
    pub async fn open_payload(&self, path: &str) -> MediaResult<(u64, File)> {
        match self {
            MediaStore::Local(local) => local.open_payload(path).await,
            MediaStore::Remote(_) => Err(MediaError::NotFound(path.to_string())),
        }
    }

    /// Backend probe used by the readiness endpoint. Local stores run a
    /// write/read/delete roundtrip beneath their base path; remote stores
    /// are exercised per-request and report ready.
    pub async fn probe(&self) -> MediaResult<()> {
        match self {
            MediaStore::Local(local) => local.probe().await,
            MediaStore::Remote(_) => Ok(()),
        }
    }
}

/// Basic path validation to avoid trivial traversal vectors.
///
/// Rejects paths that are empty, oversized, absolute, or that contain `..`,
/// control characters or backslashes.
fn ensure_media_path_safe(path: &str) -> MediaResult<()> {
    if path.is_empty() || path.len() > MAX_MEDIA_PATH_LEN {
        return Err(MediaError::InvalidPath);
    }
    if path.starts_with('/') || path.contains("..") {
        return Err(MediaError::InvalidPath);
    }
    if path
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return Err(MediaError::InvalidPath);
    }
    Ok(())
}

/// Disk-backed payload storage.
///
/// Payloads are sharded two directory levels deep to keep per-directory
/// file counts small, written to a temp file and renamed into place after
/// an fsync, and pruned back up to the root when deletes empty a shard.
#[derive(Clone)]
pub struct LocalMediaStore {
    /// Root directory for payloads.
    pub base_path: PathBuf,

    /// Base URL prepended to `/media/{path}` when building retrieval URLs.
    public_base_url: String,
}

impl LocalMediaStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Generate two-level shard identifiers for a storage path.
    ///
    /// Uses MD5(path) and returns the first two bytes as lowercase
    /// hexadecimal strings (00–ff).
    fn payload_shards(path: &str) -> (String, String) {
        let digest = md5::compute(path);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct the on-disk location for a storage path:
    /// `base_path/{shard}/{shard}/{path}`. Parent directories may not exist
    /// yet.
    fn payload_path(&self, path: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::payload_shards(path);
        let mut disk_path = self.base_path.clone();
        disk_path.push(shard_a);
        disk_path.push(shard_b);
        disk_path.push(path);
        disk_path
    }

    /// Write a payload durably and report its storage location.
    ///
    /// Writes to a temporary sibling first, fsyncs, then renames into the
    /// final location. Temp files are cleaned up on every failure path.
    async fn upload(&self, folder: &str, file_name: &str, data: Bytes) -> MediaResult<StoredMedia> {
        let rel = format!("{}/{}", folder.trim_matches('/'), file_name);
        ensure_media_path_safe(&rel)?;

        let disk_path = self.payload_path(&rel);
        let parent = disk_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            MediaError::Io(io::Error::new(
                ErrorKind::Other,
                "payload path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = file.write_all(&data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        if let Err(err) = fs::rename(&tmp_path, &disk_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }

        Ok(StoredMedia {
            url: format!("{}/media/{}", self.public_base_url, rel),
            thumbnail_url: None,
            path: rel,
        })
    }

    /// Open a stored payload for reading.
    async fn open_payload(&self, path: &str) -> MediaResult<(u64, File)> {
        ensure_media_path_safe(path)?;
        let disk_path = self.payload_path(path);
        let file = File::open(&disk_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                MediaError::NotFound(path.to_string())
            } else {
                MediaError::Io(err)
            }
        })?;
        let size = file.metadata().await?.len();
        Ok((size, file))
    }

    /// Remove a stored payload and prune shard directories it leaves empty.
    async fn delete(&self, path: &str) -> MediaResult<()> {
        ensure_media_path_safe(path)?;
        let disk_path = self.payload_path(path);
        match fs::remove_file(&disk_path).await {
            Ok(_) => debug!("removed payload {}", disk_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload {} already missing", disk_path.display());
            }
            Err(err) => return Err(err.into()),
        }

        if let Some(parent) = disk_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    /// Write/read/delete roundtrip beneath the base path.
    async fn probe(&self) -> MediaResult<()> {
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;
        let bytes = match fs::read(&tmp_path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
                return Err(err.into());
            }
        };
        let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
        if bytes != b"readyz" {
            return Err(MediaError::Io(io::Error::new(
                ErrorKind::InvalidData,
                "probe file content mismatch",
            )));
        }
        Ok(())
    }

    /// Recursively remove empty directories up to the media root.
    ///
    /// Stops when a directory is not empty, not found, is the root, or an
    /// unexpected I/O error occurs.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

/// Client for a remote media API.
///
/// Uploads go to `POST {endpoint}/files/upload` as a multipart form with
/// the payload base64-encoded in the `file` field, authenticated by HTTP
/// basic auth with the API key as username. Deletion is
/// `DELETE {endpoint}/files?path=`; a backend 404 counts as done.
#[derive(Clone)]
pub struct RemoteMediaStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// Backend response to a successful upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteUploadResponse {
    url: String,
    thumbnail_url: Option<String>,
    file_path: String,
}

impl RemoteMediaStore {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("drive-store/", env!("CARGO_PKG_VERSION")))
            .timeout(REMOTE_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn upload(&self, folder: &str, file_name: &str, data: Bytes) -> MediaResult<StoredMedia> {
        let form = reqwest::multipart::Form::new()
            .text("file", general_purpose::STANDARD.encode(&data))
            .text("fileName", file_name.to_string())
            .text("folder", format!("/{}", folder.trim_matches('/')))
            .text("useUniqueFileName", "false");

        let response = self
            .client
            .post(format!("{}/files/upload", self.endpoint))
            .basic_auth(&self.api_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let body: RemoteUploadResponse = response.json().await?;
        Ok(StoredMedia {
            url: body.url,
            thumbnail_url: body.thumbnail_url,
            path: body.file_path,
        })
    }

    async fn delete(&self, path: &str) -> MediaResult<()> {
        let response = self
            .client
            .delete(format!("{}/files", self.endpoint))
            .query(&[("path", path)])
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?;

        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(backend_error(response).await)
    }
}

/// Turn an unsuccessful backend response into a MediaError, keeping a
/// bounded slice of the body for the log.
async fn backend_error(response: reqwest::Response) -> MediaError {
    let status = response.status().as_u16();
    let message = match response.text().await {
        Ok(text) if !text.is_empty() => text.chars().take(200).collect(),
        _ => "no response body".to_string(),
    };
    MediaError::Backend { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn path_safety_rejects_traversal_vectors() {
        assert!(ensure_media_path_safe("drive/user_a/folder/x/img.png").is_ok());
        assert!(ensure_media_path_safe("").is_err());
        assert!(ensure_media_path_safe("/absolute/path.png").is_err());
        assert!(ensure_media_path_safe("drive/../etc/passwd").is_err());
        assert!(ensure_media_path_safe("drive\\user\\img.png").is_err());
        assert!(ensure_media_path_safe("drive/user/\u{7}.png").is_err());
        assert!(ensure_media_path_safe(&"a".repeat(MAX_MEDIA_PATH_LEN + 1)).is_err());
    }

    #[test]
    fn shards_are_two_hex_bytes() {
        let (a, b) = LocalMediaStore::payload_shards("drive/user_a/folder/x/img.png");
        for shard in [a.as_str(), b.as_str()] {
            assert_eq!(shard.len(), 2);
            assert!(shard.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(shard, shard.to_lowercase());
        }
    }

    #[tokio::test]
    async fn local_roundtrip_and_prune() {
        let root = tempfile::TempDir::new().unwrap();
        let store = LocalMediaStore::new(root.path(), "http://localhost:3000/");

        let stored = store
            .upload(
                "drive/user_a/folder/f1",
                "img.png",
                Bytes::from_static(b"payload-bytes"),
            )
            .await
            .unwrap();
        assert_eq!(stored.path, "drive/user_a/folder/f1/img.png");
        assert_eq!(
            stored.url,
            "http://localhost:3000/media/drive/user_a/folder/f1/img.png"
        );
        assert!(stored.thumbnail_url.is_none());

        let (size, mut file) = store.open_payload(&stored.path).await.unwrap();
        assert_eq!(size, 13);
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"payload-bytes");

        store.delete(&stored.path).await.unwrap();
        assert!(matches!(
            store.open_payload(&stored.path).await,
            Err(MediaError::NotFound(_))
        ));

        // pruning leaves the base path itself empty again
        let mut dir = fs::read_dir(root.path()).await.unwrap();
        assert!(dir.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_missing_payload_is_fine() {
        let root = tempfile::TempDir::new().unwrap();
        let store = LocalMediaStore::new(root.path(), "http://localhost:3000");
        store.delete("drive/user_a/folder/f1/gone.png").await.unwrap();
    }

    #[tokio::test]
    async fn probe_roundtrips_under_base_path() {
        let root = tempfile::TempDir::new().unwrap();
        let store = LocalMediaStore::new(root.path(), "http://localhost:3000");
        store.probe().await.unwrap();

        let mut dir = fs::read_dir(root.path()).await.unwrap();
        assert!(dir.next_entry().await.unwrap().is_none());
    }
}
