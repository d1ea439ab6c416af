//! Configuration module
//!
//! Server and client settings are read from environment variables (a `.env`
//! file is loaded first when present) and checked by `validate()` before use.

use std::env;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 3000;
const UPLOAD_URL_TTL_SECS: u64 = 15 * 60;
const MAX_UPLOAD_SIZE_MB: u64 = 25;
const CLIENT_TIMEOUT_SECS: u64 = 30;
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;
const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Configuration for the `vitrine-api` server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible providers (MinIO, R2, ...)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload gateway
    pub upload_url_ttl_secs: u64,
    pub max_upload_bytes: u64,
    pub allowed_content_types: Vec<String>,
    /// Shared secret for the completion webhook signature
    pub webhook_signing_secret: String,
    /// JSON file mapping entity types to their ordered ids, loaded at boot
    pub position_seed_path: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .parse::<StorageBackend>()?;

        Ok(Self {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .unwrap_or(SERVER_PORT),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            upload_url_ttl_secs: env::var("UPLOAD_URL_TTL_SECS")
                .unwrap_or_else(|_| UPLOAD_URL_TTL_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_URL_TTL_SECS),
            max_upload_bytes: env::var("MAX_UPLOAD_SIZE_MB")
                .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
                .parse::<u64>()
                .unwrap_or(MAX_UPLOAD_SIZE_MB)
                * 1024
                * 1024,
            allowed_content_types: env::var("ALLOWED_CONTENT_TYPES")
                .unwrap_or_else(|_| {
                    "image/jpeg,image/png,image/webp,image/gif,image/svg+xml".to_string()
                })
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            webhook_signing_secret: env::var("WEBHOOK_SIGNING_SECRET").unwrap_or_default(),
            position_seed_path: env::var("POSITION_SEED_PATH").ok(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Path component of `LOCAL_STORAGE_BASE_URL` without a trailing slash.
    ///
    /// The API accepts signed local uploads and serves local objects under it.
    pub fn local_media_path(&self) -> Option<String> {
        let url = self.local_storage_base_url.as_deref()?;
        let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
        let path = rest.find('/').map_or("", |i| &rest[i..]);
        let path = path
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        (!path.is_empty()).then(|| path.to_string())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.webhook_signing_secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "WEBHOOK_SIGNING_SECRET must be at least {} characters long",
                MIN_SIGNING_SECRET_LEN
            ));
        }

        if self.upload_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("UPLOAD_URL_TTL_SECS must be greater than 0"));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
                if self.local_media_path().is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL needs a path (e.g. http://localhost:3000/media) to serve uploads from"
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Configuration for the dashboard-side HTTP client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub upload_chunk_bytes: usize,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Self {
            api_url: env::var("VITRINE_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: env::var("VITRINE_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs: env::var("VITRINE_TIMEOUT_SECS")
                .unwrap_or_else(|_| CLIENT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CLIENT_TIMEOUT_SECS),
            upload_chunk_bytes: env::var("VITRINE_UPLOAD_CHUNK_BYTES")
                .unwrap_or_else(|_| UPLOAD_CHUNK_BYTES.to_string())
                .parse()
                .unwrap_or(UPLOAD_CHUNK_BYTES),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "VITRINE_API_URL must start with http:// or https://"
            ));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow::anyhow!("VITRINE_TIMEOUT_SECS must be greater than 0"));
        }
        if self.upload_chunk_bytes == 0 {
            return Err(anyhow::anyhow!(
                "VITRINE_UPLOAD_CHUNK_BYTES must be greater than 0"
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            api_key: None,
            timeout_secs: CLIENT_TIMEOUT_SECS,
            upload_chunk_bytes: UPLOAD_CHUNK_BYTES,
        }
    }
}
