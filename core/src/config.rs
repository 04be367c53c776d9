//! Client configuration and credentials.
//!
//! Credentials are taken from the caller or, failing that, from the
//! `TRELLO_API_KEY` / `TRELLO_API_TOKEN` environment variables. Environment
//! reads go through an injectable lookup so tests never touch the process
//! environment.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1";
pub const API_KEY_ENV: &str = "TRELLO_API_KEY";
pub const API_TOKEN_ENV: &str = "TRELLO_API_TOKEN";
pub const API_URL_ENV: &str = "TRELLO_API_URL";

/// Requests allowed per window; Trello's published limit per token.
pub const DEFAULT_MAX_REQUESTS: usize = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// The application key and token pair sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_token: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_token: api_token.into(),
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read both secrets through `lookup`; empty values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let key = read(API_KEY_ENV);
        let token = read(API_TOKEN_ENV);

        match (key, token) {
            (Some(api_key), Some(api_token)) => Ok(Self { api_key, api_token }),
            (key, token) => {
                let missing: Vec<&str> = [(key.is_none(), API_KEY_ENV), (token.is_none(), API_TOKEN_ENV)]
                    .into_iter()
                    .filter_map(|(absent, name)| absent.then_some(name))
                    .collect();
                Err(ApiError::Authentication(format!(
                    "missing credentials: set {} or pass them to ClientConfig::new",
                    missing.join(" and ")
                )))
            }
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_token.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Everything a `TrelloClient` needs to start issuing requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub credentials: Credentials,
    /// At most this many requests start within any sliding `window`.
    pub max_requests: usize,
    pub window: Duration,
    /// At most this many requests are in flight at once.
    pub max_concurrent: usize,
    pub cache_enabled: bool,
    /// Cached GET responses older than this are ignored. `None` keeps them
    /// until explicitly cleared.
    pub cache_ttl: Option<Duration>,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            cache_enabled: true,
            cache_ttl: None,
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let credentials = Credentials::from_lookup(&lookup)?;
        let mut config = Self::new(credentials);
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rate_limit(mut self, max_requests: usize, window: Duration) -> Self {
        self.max_requests = max_requests;
        self.window = window;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.credentials.is_complete() {
            return Err(ApiError::Authentication(
                "api key and token must both be non-empty".to_string(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.max_requests == 0 || self.window.is_zero() {
            return Err(ApiError::Config(
                "rate limit needs a positive request count and window".to_string(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(ApiError::Config("max_concurrent must be at least 1".to_string()));
        }
        Ok(())
    }
}
