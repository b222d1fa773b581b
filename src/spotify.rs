use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;

/// Token endpoint payload, shared by code exchange and refresh.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub expires_in: u64,
    /// Only present on code exchange, or when the upstream rotates on refresh.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpotifyError {
    Network(String),
    Status { status: u16, body: String },
    Parse(String),
}

impl std::fmt::Display for SpotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpotifyError::Network(msg) => write!(f, "Network error: {}", msg),
            SpotifyError::Status { status, body } => write!(f, "API error: {} - {}", status, body),
            SpotifyError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for SpotifyError {}

impl SpotifyError {
    /// An upstream 401 means the access token expired.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SpotifyError::Status { status: 401, .. })
    }
}

/// Outbound calls to the catalog API and the token endpoint.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SpotifyError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SpotifyError>;
    /// GET `path` (relative to the catalog base URL, including any query string).
    async fn get(&self, path: &str, access_token: &str) -> Result<Value, SpotifyError>;
}

pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    api_base_url: String,
    client: reqwest::Client,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            token_url: config.token_url(),
            api_base_url: config.api_base_url.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn basic_auth(&self) -> String {
        let auth = BASE64_STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        format!("Basic {}", auth)
    }

    async fn post_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse, SpotifyError> {
        let response = self
            .client
            .post(&self.token_url)
            .header("Authorization", self.basic_auth())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(params)
            .send()
            .await
            .map_err(|e| SpotifyError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token request failed: {} - {}", status, body);
            return Err(SpotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| SpotifyError::Parse(format!("Token response: {}", e)))
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SpotifyError> {
        self.post_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SpotifyError> {
        self.post_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn get(&self, path: &str, access_token: &str) -> Result<Value, SpotifyError> {
        let url = format!("{}{}", self.api_base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| SpotifyError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SpotifyError::Parse(format!("{}: {}", path, e)))
    }
}
