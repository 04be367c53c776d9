//! Registry of canonical objects, one per (kind, resolved id).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::object::{ObjectRef, TrelloObject};
use crate::transform::{self, Transformed};
use crate::types::{ObjectKey, ResourceId, ResourceKind};

/// Owns every object a `Session` has seen. Entries are only removed by
/// `evict` or `clear`.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: Mutex<HashMap<ObjectKey, ObjectRef>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ObjectKey, ObjectRef>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The canonical instance for `(kind, id)`, registering an empty shell if
    /// none exists yet. The check and the insert happen under one lock, so
    /// concurrent discoveries of the same id converge on one instance.
    pub fn get_or_create(&self, kind: ResourceKind, id: &ResourceId) -> (ObjectRef, bool) {
        let mut entries = self.entries();
        if let Some(existing) = entries.get(&(kind, id.clone())) {
            return (existing.clone(), false);
        }
        let object = TrelloObject::shell(kind, id.clone());
        entries.insert(object.key(), object.clone());
        debug!(%kind, %id, "registered new object");
        (object, true)
    }

    pub fn get(&self, kind: ResourceKind, id: &ResourceId) -> Option<ObjectRef> {
        self.entries().get(&(kind, id.clone())).cloned()
    }

    pub fn contains(&self, kind: ResourceKind, id: &ResourceId) -> bool {
        self.entries().contains_key(&(kind, id.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// All registered objects of `kind`, in no particular order.
    pub fn objects_of(&self, kind: ResourceKind) -> Vec<ObjectRef> {
        self.entries()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, object)| object.clone())
            .collect()
    }

    /// Forget one object; the next lookup creates a new shell. Callers still
    /// holding the old instance keep it, detached from the map. Cached
    /// responses are untouched, see `Session::evict`.
    pub fn evict(&self, kind: ResourceKind, id: &ResourceId) -> Option<ObjectRef> {
        let evicted = self.entries().remove(&(kind, id.clone()));
        if evicted.is_some() {
            debug!(%kind, %id, "evicted object");
        }
        evicted
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Merge a transformed payload into `object` in place.
    ///
    /// Returns `ApiError::Conflict` listing the dirty fields the payload
    /// disagreed with; every other field has still been applied.
    pub fn merge_attributes(&self, object: &TrelloObject, transformed: &Transformed) -> Result<(), ApiError> {
        let conflicts = object.merge(&transformed.attributes);
        if conflicts.is_empty() {
            return Ok(());
        }
        warn!(
            kind = %object.kind(),
            id = %object.id(),
            fields = ?conflicts.iter().map(|c| c.field.as_str()).collect::<Vec<_>>(),
            "remote values conflict with unsaved edits"
        );
        Err(ApiError::Conflict(conflicts))
    }

    /// Build or update the canonical object from an already-fetched payload.
    /// The object counts as loaded afterwards, even if a conflict is reported.
    pub fn absorb(&self, kind: ResourceKind, raw: Value) -> Result<ObjectRef, ApiError> {
        let transformed = transform::to_attributes(kind, raw)?;
        let (object, _) = self.get_or_create(kind, &transformed.id);
        let merged = self.merge_attributes(&object, &transformed);
        object.mark_loaded();
        merged.map(|()| object)
    }
}
