//! Backend endpoint configuration, read once at process start.

use std::fmt;

/// Environment variable holding the backend base URL.
pub const URL_VAR: &str = "EKRAF_BACKEND_URL";
/// Environment variable holding the anonymous API key.
pub const ANON_KEY_VAR: &str = "EKRAF_ANON_KEY";
/// Environment variable holding an optional user access token.
pub const ACCESS_TOKEN_VAR: &str = "EKRAF_ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingUrl,
    InvalidUrl(String),
    MissingAnonKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUrl => write!(f, "backend URL is not set ({})", URL_VAR),
            Self::InvalidUrl(url) => write!(f, "backend URL must start with http:// or https://, got {:?}", url),
            Self::MissingAnonKey => write!(f, "anonymous API key is not set ({})", ANON_KEY_VAR),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where the hosted backend lives and how to authenticate against it.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL without trailing slash, e.g. `https://xyz.example.co`.
    pub url: String,
    pub anon_key: String,
    /// Signed-in user's token; requests fall back to the anon key without it.
    pub access_token: Option<String>,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BackendConfig {
    pub fn new(url: &str, anon_key: &str) -> Result<Self, ConfigError> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }
        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(ConfigError::MissingAnonKey);
        }
        Ok(Self {
            url: url.to_string(),
            anon_key: anon_key.to_string(),
            access_token: None,
        })
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Configuration baked in at compile time, for the browser build where
    /// no process environment exists. `None` when either value is absent.
    pub fn from_build_env() -> Option<Self> {
        let url = option_env!("EKRAF_BACKEND_URL")?;
        let key = option_env!("EKRAF_ANON_KEY")?;
        match Self::new(url, key) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("[EKRAF] config: ignoring build-time backend config: {}", e);
                None
            }
        }
    }

    /// Token sent as the bearer credential.
    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}
