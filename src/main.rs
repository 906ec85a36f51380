use anyhow::Result;
use axum::Router;
use drive_store::auth::TokenVerifier;
use drive_store::config::AppConfig;
use drive_store::handlers::AppState;
use drive_store::routes::routes::routes;
use drive_store::services::drive_service::DriveService;
use drive_store::services::media_service::MediaStore;
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting drive-store with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;

    // Extract the local file path SQLx will use
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    // Create parent directory if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // SQLite will not create the database file on its own
    match fs::OpenOptions::new().create(true).write(true).open(db_path) {
        Ok(_) => tracing::debug!("Database file is present at {}", db_path),
        Err(e) => tracing::warn!("Failed to pre-create database file: {}", e),
    }

    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?,
    );

    // --- Handle migration mode ---
    if migrate {
        run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Pick the media backend ---
    let media = match (&cfg.media_endpoint, &cfg.media_api_key) {
        (Some(endpoint), Some(api_key)) => {
            tracing::info!("Using remote media backend at {}", endpoint);
            MediaStore::remote(endpoint.clone(), api_key.clone())?
        }
        (Some(_), None) => {
            anyhow::bail!("DRIVE_STORE_MEDIA_API_KEY must be set when a media endpoint is configured");
        }
        (None, _) => {
            if !Path::new(&cfg.media_dir).exists() {
                fs::create_dir_all(&cfg.media_dir)?;
                tracing::info!("Created media directory at {}", cfg.media_dir);
            }
            MediaStore::local(&cfg.media_dir, cfg.public_base_url.clone())
        }
    };

    // --- Initialize core service ---
    let drive = DriveService::new(db.clone(), media);
    let state = AppState {
        drive,
        verifier: TokenVerifier::new(&cfg.jwt_secret),
    };

    // --- Build router ---
    let app: Router = routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run SQLite migrations manually from the embedded SQL file.
async fn run_migrations(db: &Arc<sqlx::Pool<sqlx::Sqlite>>) -> Result<()> {
    let path = "migrations/0001_init.sql";

    if !Path::new(path).exists() {
        anyhow::bail!("Migration file not found: {}", path);
    }

    let sql = fs::read_to_string(path)?;
    let statements = sql
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(&**db).await?;
    }

    Ok(())
}
