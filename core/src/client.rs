//! The transport client: request building, status handling, throttling and
//! response caching.
//!
//! # Design
//! `Endpoints` is stateless beyond its `base_url`: `build` turns an
//! `ApiRequest` into an `HttpRequest` and `parse_response` turns an
//! `HttpResponse` back into JSON, so both halves are testable without I/O.
//! `TrelloClient` wires them to a `Transport`, a `RateLimiter` and a
//! `ResponseCache`. It knows nothing about the object model; clone it to
//! share one limiter and cache between sessions.

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::bridge::blocking_twins;
use crate::cache::ResponseCache;
use crate::config::{ClientConfig, Credentials};
use crate::error::ApiError;
use crate::http::{ApiRequest, CachePolicy, HttpMethod, HttpRequest, HttpResponse};
use crate::rate_limit::RateLimiter;
use crate::transport::{ReqwestTransport, Transport};

/// Builds `HttpRequest`s for, and parses `HttpResponse`s from, the API at
/// `base_url`.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build(&self, request: &ApiRequest, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, request.endpoint))
            .map_err(|e| ApiError::Config(format!("invalid request URL: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(request.params.iter())
            .append_pair("key", credentials.api_key())
            .append_pair("token", credentials.api_token());

        let (headers, body) = match &request.body {
            Some(body) => {
                let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
                (
                    vec![("content-type".to_string(), "application/json".to_string())],
                    Some(body),
                )
            }
            None => (Vec::new(), None),
        };

        Ok(HttpRequest {
            method: request.method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Interpret `response` to a call against `endpoint`. An empty 2xx body
    /// parses as `null`.
    pub fn parse_response(&self, endpoint: &str, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(endpoint, &response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(endpoint: &str, response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        401 | 403 => Err(ApiError::Authentication(response.body.clone())),
        404 => Err(ApiError::NotFound {
            endpoint: endpoint.to_string(),
        }),
        400 if response.body.to_lowercase().contains("invalid id") => Err(ApiError::NotFound {
            endpoint: endpoint.to_string(),
        }),
        status => Err(ApiError::Remote {
            status,
            body: response.body.clone(),
        }),
    }
}

/// Authenticated, rate-limited access to the Trello REST API.
#[derive(Clone)]
pub struct TrelloClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    endpoints: Endpoints,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    cache: Option<ResponseCache>,
}

impl TrelloClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()?))
    }

    /// Build a client from `TRELLO_API_KEY` / `TRELLO_API_TOKEN`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        config.validate()?;
        let cache = config.cache_enabled.then(|| ResponseCache::new(config.cache_ttl));
        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoints: Endpoints::new(&config.base_url),
                credentials: config.credentials,
                transport,
                limiter: RateLimiter::new(config.max_requests, config.window, config.max_concurrent),
                cache,
            }),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// Issue `request` and return the parsed JSON body.
    #[instrument(skip(self, request), fields(method = %request.method, endpoint = %request.endpoint))]
    pub async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let inner = &self.inner;
        let signature = request.signature();
        let cache = inner.cache.as_ref();

        if request.method == HttpMethod::Get && request.cache == CachePolicy::Use {
            if let Some(hit) = cache.and_then(|c| c.get(&signature)) {
                debug!("cache hit");
                return Ok(hit);
            }
        }

        let http = inner.endpoints.build(&request, &inner.credentials)?;
        let response = {
            let _slot = inner.limiter.acquire().await?;
            debug!("sending request");
            inner.transport.execute(http).await?
        };

        if response.status == 429 {
            warn!("rate limited by Trello");
        }
        let value = inner.endpoints.parse_response(&request.endpoint, response)?;

        if let Some(cache) = cache {
            if request.method == HttpMethod::Get {
                cache.insert(signature, value.clone());
            } else {
                cache.evict_endpoint(&request.endpoint);
            }
        }
        Ok(value)
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(ApiRequest::get(endpoint)).await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> Result<Value, ApiError> {
        self.request(ApiRequest::put(endpoint, body)).await
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> Result<Value, ApiError> {
        self.request(ApiRequest::post(endpoint, body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(ApiRequest::delete(endpoint)).await
    }

    blocking_twins! {
        /// Blocking twin of [`TrelloClient::request`].
        pub fn request_blocking = request(request: ApiRequest) -> Result<Value, ApiError>;
        pub fn get_blocking = get(endpoint: &str) -> Result<Value, ApiError>;
        pub fn put_blocking = put(endpoint: &str, body: Value) -> Result<Value, ApiError>;
        pub fn post_blocking = post(endpoint: &str, body: Value) -> Result<Value, ApiError>;
        pub fn delete_blocking = delete(endpoint: &str) -> Result<Value, ApiError>;
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.clear();
        }
    }

    /// Forget cached responses for one endpoint; returns how many were dropped.
    pub fn evict_cached(&self, endpoint: &str) -> usize {
        self.inner.cache.as_ref().map_or(0, |c| c.evict_endpoint(endpoint))
    }

    pub fn vacuum_cache(&self) -> usize {
        self.inner.cache.as_ref().map_or(0, ResponseCache::vacuum)
    }

    pub fn cached_responses(&self) -> usize {
        self.inner.cache.as_ref().map_or(0, ResponseCache::len)
    }

    /// Requests started within the current rate-limit window.
    pub fn recent_requests(&self) -> usize {
        self.inner.limiter.recent_requests()
    }
}

impl fmt::Debug for TrelloClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrelloClient")
            .field("base_url", &self.inner.endpoints.base_url)
            .field("cache", &self.inner.cache.is_some())
            .finish_non_exhaustive()
    }
}
