use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub media_dir: String,
    pub database_url: String,
    pub public_base_url: String,
    pub media_endpoint: Option<String>,
    pub media_api_key: Option<String>,
    pub jwt_secret: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Authenticated file-storage API")]
pub struct Args {
    /// Host to bind to (overrides DRIVE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DRIVE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where the local media backend keeps payloads (overrides DRIVE_STORE_MEDIA_DIR)
    #[arg(long)]
    pub media_dir: Option<String>,

    /// Database URL (overrides DRIVE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public base URL used in local media links (overrides DRIVE_STORE_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Remote media API endpoint; the local disk backend is used when unset
    /// (overrides DRIVE_STORE_MEDIA_ENDPOINT)
    #[arg(long)]
    pub media_endpoint: Option<String>,

    /// API key for the remote media API (overrides DRIVE_STORE_MEDIA_API_KEY)
    #[arg(long)]
    pub media_api_key: Option<String>,

    /// Secret used to verify bearer tokens (overrides DRIVE_STORE_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("DRIVE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("DRIVE_STORE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing DRIVE_STORE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading DRIVE_STORE_PORT"),
        };
        let env_media_dir =
            env::var("DRIVE_STORE_MEDIA_DIR").unwrap_or_else(|_| "./data/media".into());
        let env_db = env::var("DRIVE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/drive_store.db".into());
        let env_public_base = env::var("DRIVE_STORE_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            media_dir: args.media_dir.unwrap_or(env_media_dir),
            database_url: args.database_url.unwrap_or(env_db),
            public_base_url: args.public_base_url.unwrap_or(env_public_base),
            media_endpoint: args
                .media_endpoint
                .or_else(|| env::var("DRIVE_STORE_MEDIA_ENDPOINT").ok()),
            media_api_key: args
                .media_api_key
                .or_else(|| env::var("DRIVE_STORE_MEDIA_API_KEY").ok()),
            jwt_secret: args
                .jwt_secret
                .or_else(|| env::var("DRIVE_STORE_JWT_SECRET").ok())
                .context("DRIVE_STORE_JWT_SECRET is not set")?,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The config is logged at startup, so secrets are kept out of the Debug
/// output.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("media_dir", &self.media_dir)
            .field("database_url", &self.database_url)
            .field("public_base_url", &self.public_base_url)
            .field("media_endpoint", &self.media_endpoint)
            .field(
                "media_api_key",
                &self.media_api_key.as_deref().map(|_| "<redacted>"),
            )
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}
