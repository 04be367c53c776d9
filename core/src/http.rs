//! HTTP types for the host-does-IO pattern.
//!
//! # Design
//! `HttpRequest` and `HttpResponse` describe one round trip as plain data.
//! `Endpoints` builds the former and parses the latter without touching the
//! network; a `Transport` executes the actual I/O. `ApiRequest` is the
//! caller-facing description of a call (endpoint relative to the API base,
//! params, optional JSON body) before credentials and the base URL are
//! applied.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and already carries the query string, credentials
/// included.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Whether a GET may be answered from the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    Use,
    /// Always hit the network; the fresh response still refreshes the cache.
    Bypass,
}

/// A call against the Trello API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path below the API base, e.g. `cards/5a1b...`. Leading and trailing
    /// slashes are ignored.
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub cache: CachePolicy,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into().trim_matches('/').to_string(),
            params: BTreeMap::new(),
            body: None,
            cache: CachePolicy::Use,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, endpoint).with_body(body)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, endpoint).with_body(body)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.cache = CachePolicy::Bypass;
        self
    }

    /// Cache key for this request. Credentials are never part of it since
    /// they are only added when the `HttpRequest` is built.
    pub fn signature(&self) -> RequestSignature {
        RequestSignature {
            method: self.method,
            endpoint: self.endpoint.clone(),
            params: self
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Identifies a request exactly: method, endpoint and sorted params.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature {
    pub method: HttpMethod,
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}
