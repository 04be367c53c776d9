//! The canonical in-memory representation of one remote resource.
//!
//! # Design
//! A `TrelloObject` is always handled through an `ObjectRef` (`Arc`), and
//! the identity map hands out at most one per (kind, resolved id), so every
//! holder observes the same mutations. State sits behind a `std::sync::Mutex`
//! that is never held across an `.await`.
//!
//! Relation links are `Weak`: the identity map owns objects, links only
//! point at them, so cyclic graphs (board -> card -> board) do not leak.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::{ApiError, FieldConflict};
use crate::schema::{schema, FieldType};
use crate::transform::{self, Attributes};
use crate::types::{ObjectKey, ResourceId, ResourceKind};

pub type ObjectRef = Arc<TrelloObject>;

#[derive(Debug, Clone)]
pub(crate) enum Link {
    One(Weak<TrelloObject>),
    Many(Vec<Weak<TrelloObject>>),
}

#[derive(Debug, Default)]
pub(crate) struct ObjectState {
    pub(crate) attributes: Attributes,
    pub(crate) dirty: BTreeSet<String>,
    pub(crate) links: HashMap<&'static str, Link>,
    pub(crate) refreshed_at: Option<DateTime<Utc>>,
}

pub struct TrelloObject {
    kind: ResourceKind,
    id: ResourceId,
    state: Mutex<ObjectState>,
    /// Set once the object holds a full remote payload. Concurrent loaders
    /// of a shell wait on the same initialization.
    pub(crate) loaded: OnceCell<()>,
}

impl TrelloObject {
    /// An empty shell; attributes arrive with the first merge.
    pub(crate) fn shell(kind: ResourceKind, id: ResourceId) -> ObjectRef {
        let mut state = ObjectState::default();
        state.attributes.insert("id".to_string(), Value::from(id.as_str()));
        Arc::new(Self {
            kind,
            id,
            state: Mutex::new(state),
            loaded: OnceCell::new(),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn key(&self) -> ObjectKey {
        (self.kind, self.id.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    pub(crate) fn mark_loaded(&self) {
        // Already set, or a loader is mid-flight and will set it.
        let _ = self.loaded.set(());
    }

    /// When the last remote payload was merged.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.lock().refreshed_at
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ObjectState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.lock().attributes.get(field).cloned()
    }

    pub fn get_str(&self, field: &str) -> Option<String> {
        self.lock().attributes.get(field).and_then(Value::as_str).map(str::to_string)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.lock().attributes.get(field).and_then(Value::as_bool)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.lock().attributes.get(field).and_then(Value::as_f64)
    }

    pub fn get_date(&self, field: &str) -> Option<DateTime<Utc>> {
        self.lock().attributes.get(field).and_then(transform::parse_date)
    }

    /// Snapshot of every attribute, known and unknown.
    pub fn attributes(&self) -> Attributes {
        self.lock().attributes.clone()
    }

    /// Assign `field` locally and mark it dirty. No I/O happens until save.
    ///
    /// Known fields are type-checked. Assigning a relation id field drops the
    /// live link for it; the next inflation resolves the new target.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<(), ApiError> {
        let value = value.into();
        if field == "id" {
            return Err(ApiError::InvalidValue {
                field: field.to_string(),
                reason: "ids are immutable".to_string(),
            });
        }
        transform::check_field(self.kind, field, &value)?;

        let mut state = self.lock();
        if let Some(attribute) = link_attribute(self.kind, field) {
            state.links.remove(attribute);
        }
        state.attributes.insert(field.to_string(), value);
        state.dirty.insert(field.to_string());
        Ok(())
    }

    /// Remove `field` locally; the next save sends it as `null`.
    pub fn remove(&self, field: &str) -> Option<Value> {
        let mut state = self.lock();
        if let Some(attribute) = link_attribute(self.kind, field) {
            state.links.remove(attribute);
        }
        state.dirty.insert(field.to_string());
        state.attributes.remove(field)
    }

    pub fn dirty_fields(&self) -> BTreeSet<String> {
        self.lock().dirty.clone()
    }

    pub fn is_dirty(&self) -> bool {
        !self.lock().dirty.is_empty()
    }

    /// The live single-valued link under `attribute`, e.g. a card's `list`.
    pub fn relation_one(&self, attribute: &str) -> Option<ObjectRef> {
        match self.lock().links.get(attribute)? {
            Link::One(target) => target.upgrade(),
            Link::Many(_) => None,
        }
    }

    /// The live multi-valued link under `attribute`, in payload order.
    pub fn relation_many(&self, attribute: &str) -> Vec<ObjectRef> {
        match self.lock().links.get(attribute) {
            Some(Link::Many(targets)) => targets.iter().filter_map(Weak::upgrade).collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_relation(&self, attribute: &str) -> bool {
        self.lock().links.contains_key(attribute)
    }

    /// Point relation `attribute` at `target` (appending, for many-valued
    /// relations), updating the backing id field and marking it dirty.
    pub fn set_relation(&self, attribute: &str, target: &ObjectRef) -> Result<(), ApiError> {
        let table = schema(self.kind);
        let (field, relation) = table
            .id_field_for(attribute)
            .and_then(|field| field.relation.map(|relation| (field, relation)))
            .ok_or_else(|| ApiError::InvalidValue {
                field: attribute.to_string(),
                reason: format!("{} has no relation named {attribute}", self.kind),
            })?;
        if relation.target != target.kind {
            return Err(ApiError::InvalidValue {
                field: attribute.to_string(),
                reason: format!("expected a {}, got a {}", relation.target, target.kind),
            });
        }

        let mut state = self.lock();
        let value = match field.ty {
            FieldType::IdList => {
                let mut ids = match state.attributes.get(field.name) {
                    Some(Value::Array(ids)) => ids.clone(),
                    _ => Vec::new(),
                };
                let id = Value::from(target.id.as_str());
                if !ids.contains(&id) {
                    ids.push(id);
                }
                let mut links = match state.links.remove(relation.attribute) {
                    Some(Link::Many(links)) => links,
                    _ => Vec::new(),
                };
                if !links.iter().any(|l| l.ptr_eq(&Arc::downgrade(target))) {
                    links.push(Arc::downgrade(target));
                }
                state.links.insert(relation.attribute, Link::Many(links));
                Value::Array(ids)
            }
            _ => {
                state.links.insert(relation.attribute, Link::One(Arc::downgrade(target)));
                Value::from(target.id.as_str())
            }
        };
        state.attributes.insert(field.name.to_string(), value);
        state.dirty.insert(field.name.to_string());
        Ok(())
    }

    pub(crate) fn link_one(&self, attribute: &'static str, target: &ObjectRef) {
        self.lock().links.insert(attribute, Link::One(Arc::downgrade(target)));
    }

    pub(crate) fn link_many(&self, attribute: &'static str, targets: &[ObjectRef]) {
        let links = targets.iter().map(Arc::downgrade).collect();
        self.lock().links.insert(attribute, Link::Many(links));
    }

    pub(crate) fn unlink(&self, attribute: &str) {
        self.lock().links.remove(attribute);
    }

    /// Apply a remote attribute set. Clean fields take the remote value;
    /// dirty fields that differ are left alone and returned as conflicts.
    /// Fields the payload does not mention are untouched.
    pub(crate) fn merge(&self, remote: &Attributes) -> Vec<FieldConflict> {
        let mut conflicts = Vec::new();
        let mut state = self.lock();
        for (field, value) in remote {
            let local = state.attributes.get(field);
            if state.dirty.contains(field) {
                let local = local.cloned().unwrap_or(Value::Null);
                if local != *value {
                    conflicts.push(FieldConflict {
                        kind: self.kind,
                        id: self.id.clone(),
                        field: field.clone(),
                        local,
                        remote: value.clone(),
                    });
                }
                continue;
            }
            if local == Some(value) {
                continue;
            }
            if let Some(attribute) = link_attribute(self.kind, field) {
                state.links.remove(attribute);
            }
            state.attributes.insert(field.clone(), value.clone());
        }
        state.refreshed_at = Some(Utc::now());
        conflicts
    }

    /// The update payload for the current dirty set.
    pub(crate) fn pending_changes(&self) -> Attributes {
        let state = self.lock();
        transform::to_payload(&state.attributes, &state.dirty)
    }

    /// Clear the dirty flag of every sent field whose local value is still
    /// the one that was sent. Fields edited again in the meantime stay dirty.
    pub(crate) fn mark_saved(&self, sent: &Attributes) {
        let mut state = self.lock();
        for (field, value) in sent {
            let unchanged = state.attributes.get(field).unwrap_or(&Value::Null) == value;
            if unchanged {
                state.dirty.remove(field);
            }
        }
    }
}

/// The link attribute backed by the id field `field`, if it is one.
fn link_attribute(kind: ResourceKind, field: &str) -> Option<&'static str> {
    schema(kind)
        .field(field)
        .and_then(|spec| spec.relation)
        .map(|relation| relation.attribute)
}

impl fmt::Debug for TrelloObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TrelloObject")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("loaded", &self.is_loaded())
            .field("dirty", &state.dirty)
            .field("links", &state.links.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
