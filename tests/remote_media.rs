//! Remote Media Backend Tests
//!
//! Runs the remote media client against a stub HTTP backend and checks the
//! wire format: base64 payload field, basic auth, and delete-by-path.

use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, post};
use axum::{Json, Router};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use drive_store::services::media_service::{MediaError, MediaStore};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One upload as seen by the stub backend.
#[derive(Debug, Clone)]
struct RecordedUpload {
    file_name: String,
    folder: String,
    use_unique: String,
    data: Vec<u8>,
    authorization: String,
}

/// Shared recorder for everything the stub backend receives.
#[derive(Clone, Default)]
struct Recorder {
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    deletes: Arc<Mutex<Vec<String>>>,
}

async fn record_upload(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Json<Value> {
    let mut file_b64 = String::new();
    let mut file_name = String::new();
    let mut folder = String::new();
    let mut use_unique = String::new();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let text = field.text().await.unwrap();
        match name.as_str() {
            "file" => file_b64 = text,
            "fileName" => file_name = text,
            "folder" => folder = text,
            "useUniqueFileName" => use_unique = text,
            _ => {}
        }
    }

    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let data = general_purpose::STANDARD.decode(&file_b64).unwrap();
    let response = json!({
        "url": format!("https://media.example{}/{}", folder, file_name),
        "thumbnailUrl": format!("https://media.example/tr:n-thumb{}/{}", folder, file_name),
        "filePath": format!("{}/{}", folder, file_name),
    });

    recorder.uploads.lock().unwrap().push(RecordedUpload {
        file_name,
        folder,
        use_unique,
        data,
        authorization,
    });

    Json(response)
}

async fn record_delete(
    State(recorder): State<Recorder>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    let path = params.get("path").cloned().unwrap_or_default();
    let missing = path.ends_with("gone.png");
    recorder.deletes.lock().unwrap().push(path);

    if missing {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

/// Spawn the stub backend on an ephemeral port.
async fn spawn_backend() -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/files/upload", post(record_upload))
        .route("/files", delete(record_delete))
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub backend");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorder)
}

/// Spawn a backend that fails every upload.
async fn spawn_failing_backend() -> String {
    async fn fail() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "media backend exploded")
    }

    let app = Router::new().route("/files/upload", post(fail));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub backend");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn upload_sends_base64_payload_with_basic_auth() {
    let (endpoint, recorder) = spawn_backend().await;
    let store = MediaStore::remote(endpoint, "key-123").unwrap();

    let stored = store
        .upload(
            "drive/user_a/folder/f1",
            "img.png",
            Bytes::from_static(b"payload-bytes"),
        )
        .await
        .unwrap();

    let uploads = recorder.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);

    let seen = &uploads[0];
    assert_eq!(seen.file_name, "img.png");
    assert_eq!(seen.folder, "/drive/user_a/folder/f1");
    assert_eq!(seen.use_unique, "false");
    assert_eq!(seen.data, b"payload-bytes");
    assert_eq!(
        seen.authorization,
        format!("Basic {}", general_purpose::STANDARD.encode("key-123:"))
    );

    assert_eq!(
        stored.url,
        "https://media.example/drive/user_a/folder/f1/img.png"
    );
    assert_eq!(
        stored.thumbnail_url.as_deref(),
        Some("https://media.example/tr:n-thumb/drive/user_a/folder/f1/img.png")
    );
    assert_eq!(stored.path, "/drive/user_a/folder/f1/img.png");
}

#[tokio::test]
async fn delete_passes_the_path_as_query() {
    let (endpoint, recorder) = spawn_backend().await;
    let store = MediaStore::remote(endpoint, "key-123").unwrap();

    store
        .delete("/drive/user_a/folder/f1/img.png")
        .await
        .unwrap();

    let deletes = recorder.deletes.lock().unwrap();
    assert_eq!(deletes.as_slice(), ["/drive/user_a/folder/f1/img.png"]);
}

#[tokio::test]
async fn delete_tolerates_a_missing_remote_file() {
    let (endpoint, _recorder) = spawn_backend().await;
    let store = MediaStore::remote(endpoint, "key-123").unwrap();

    store
        .delete("/drive/user_a/folder/f1/gone.png")
        .await
        .unwrap();
}

#[tokio::test]
async fn upload_failure_surfaces_status_and_body() {
    let endpoint = spawn_failing_backend().await;
    let store = MediaStore::remote(endpoint, "key-123").unwrap();

    let err = store
        .upload(
            "drive/user_a/folder/f1",
            "img.png",
            Bytes::from_static(b"payload-bytes"),
        )
        .await
        .unwrap_err();

    match err {
        MediaError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("exploded"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
