//! In-memory cache of raw GET responses keyed by exact request signature.
//!
//! Entries never expire on their own unless a TTL is configured; callers
//! clear them explicitly. Writes to an endpoint drop its cached reads.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::http::RequestSignature;

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Option<Duration>,
    entries: Mutex<HashMap<RequestSignature, (Instant, Value)>>,
}

impl ResponseCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, signature: &RequestSignature) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (stored_at, value) = entries.get(signature)?;
        if self.is_expired(*stored_at) {
            entries.remove(signature);
            return None;
        }
        Some(value.clone())
    }

    pub fn insert(&self, signature: RequestSignature, value: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(signature, (Instant::now(), value));
    }

    /// Drop every cached response for `endpoint`, whatever its params.
    pub fn evict_endpoint(&self, endpoint: &str) -> usize {
        let endpoint = endpoint.trim_matches('/');
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|signature, _| signature.endpoint != endpoint);
        before - entries.len()
    }

    /// Drop expired entries. A no-op without a TTL.
    pub fn vacuum(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, (stored_at, _)| !self.is_expired(*stored_at));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, stored_at: Instant) -> bool {
        self.ttl.is_some_and(|ttl| stored_at.elapsed() > ttl)
    }
}
