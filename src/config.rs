use std::time::Duration;

/// Page size for compact lists (home rows, "more by" shelves).
pub const LOWER_LIMIT: u32 = 12;
/// Page size for full list pages.
pub const DEFAULT_LIMIT: u32 = 28;

/// Fixed lifetime of the refresh cookie, independent of what the upstream grants.
pub const REFRESH_TOKEN_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const DEFAULT_SCOPES: &str = "user-read-private user-read-email user-read-recently-played \
user-top-read user-follow-read streaming user-read-playback-state user-modify-playback-state";

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: String,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub market: String,
    pub lyrics_base_url: String,
    pub port: u16,
    pub public_dir: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set in .env file", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has invalid value: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let or_default = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = or_default("PORT", "5000");
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid("PORT", port))?;

        Ok(Self {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            redirect_uri: or_default(
                "SPOTIFY_REDIRECT_URI",
                "http://127.0.0.1:5000/auth/callback",
            ),
            scopes: or_default("SPOTIFY_SCOPES", DEFAULT_SCOPES),
            api_base_url: trim_slash(or_default(
                "SPOTIFY_API_BASE_URL",
                "https://api.spotify.com/v1",
            )),
            accounts_base_url: trim_slash(or_default(
                "SPOTIFY_ACCOUNTS_BASE_URL",
                "https://accounts.spotify.com",
            )),
            market: or_default("SPOTIFY_MARKET", "US"),
            lyrics_base_url: trim_slash(or_default("LYRICS_BASE_URL", "https://lrclib.net/api")),
            port,
            public_dir: or_default("PUBLIC_DIR", "public"),
        })
    }

    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_base_url)
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_base_url)
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://127.0.0.1:5000/auth/callback".to_string(),
            scopes: "user-read-private streaming".to_string(),
            api_base_url: "http://api.test/v1".to_string(),
            accounts_base_url: "http://accounts.test".to_string(),
            market: "US".to_string(),
            lyrics_base_url: "http://lyrics.test/api".to_string(),
            port: 5000,
            public_dir: "public".to_string(),
        }
    }
}
