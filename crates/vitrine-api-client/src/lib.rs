//! Shared HTTP client for the Vitrine admin API.
//!
//! Provides a minimal client with configurable auth (Bearer token or X-API-Key),
//! JSON request helpers, and implementations of the upload pipeline's
//! collaborator traits. [`transport::HttpUploadTransport`] sends file bytes
//! straight to presigned storage URLs.

pub mod api;
pub mod transport;

use anyhow::{Context, Result};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use vitrine_core::{AppError, ClientConfig};

pub use transport::HttpUploadTransport;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// No credentials (local development)
    None,
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

/// API version prefix (e.g. "/api/v1"). Set VITRINE_API_VERSION to match the server.
pub fn api_prefix() -> String {
    let version = std::env::var("VITRINE_API_VERSION").unwrap_or_else(|_| "v1".to_string());
    format!("/api/{}", version)
}

/// HTTP client for the Vitrine API with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Build from a validated client config. A configured key is sent as X-API-Key.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let auth = match &config.api_key {
            Some(key) => Auth::XApiKey(key.clone()),
            None => Auth::None,
        };
        Self::new(
            config.api_url.clone(),
            auth,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create client from environment: VITRINE_API_URL, VITRINE_API_KEY.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env().context("Invalid client configuration")?;
        Self::from_config(&config)
    }

    /// Create client from environment using Bearer token: VITRINE_API_KEY or JWT_TOKEN.
    pub fn from_env_bearer() -> Result<Self> {
        let config = ClientConfig::from_env().context("Invalid client configuration")?;
        let token = config
            .api_key
            .clone()
            .or_else(|| std::env::var("JWT_TOKEN").ok())
            .context("Missing token. Set VITRINE_API_KEY or JWT_TOKEN")?;
        Self::new(
            config.api_url,
            Auth::Bearer(token),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
        }
    }

    /// Send a request with an optional JSON body and deserialize the JSON response.
    pub async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, AppError> {
        let url = self.build_url(path);
        let mut request = self.apply_auth(self.client.request(method.clone(), &url));
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(method = %method, url = %url, "Sending API request");
        let response = request.send().await.map_err(transport_error)?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse response as JSON: {}", e)))
    }

    /// GET request with optional query parameters.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = self.build_url(path);
        let mut request = self.apply_auth(self.client.get(&url));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse response as JSON: {}", e)))
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.send_json(Method::POST, path, Some(body)).await
    }

    /// Raw client for custom requests. Caller must apply auth via build_url and headers.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Transport(format!("request timed out: {}", err))
    } else {
        AppError::Transport(err.to_string())
    }
}

/// Turn a non-2xx response into `AppError::Upstream`, keeping the server's
/// error message when the body is a JSON error response.
pub(crate) async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(AppError::Upstream {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(auth: Auth) -> ApiClient {
        ApiClient::new(
            "http://localhost:3000/".to_string(),
            auth,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let c = client(Auth::None);
        assert_eq!(c.base_url(), "http://localhost:3000");
        assert_eq!(
            c.build_url("/api/v1/brands"),
            "http://localhost:3000/api/v1/brands"
        );
    }

    #[test]
    fn test_auth_headers() {
        let c = client(Auth::XApiKey("secret".to_string()));
        let request = c
            .apply_auth(c.client().get(c.build_url("/health")))
            .build()
            .unwrap();
        assert_eq!(request.headers()["X-API-Key"], "secret");

        let c = client(Auth::Bearer("token".to_string()));
        let request = c
            .apply_auth(c.client().get(c.build_url("/health")))
            .build()
            .unwrap();
        assert_eq!(request.headers()["Authorization"], "Bearer token");

        let c = client(Auth::None);
        let request = c
            .apply_auth(c.client().get(c.build_url("/health")))
            .build()
            .unwrap();
        assert!(request.headers().get("Authorization").is_none());
    }

    #[test]
    fn test_from_config_uses_api_key() {
        let config = ClientConfig {
            api_key: Some("k".to_string()),
            ..ClientConfig::default()
        };
        let c = ApiClient::from_config(&config).unwrap();
        assert!(matches!(c.auth, Auth::XApiKey(ref k) if k == "k"));
    }
}
