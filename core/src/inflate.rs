//! Recursive relation inflation.
//!
//! # Design
//! Inflation of one object has two phases. Embedded collections (a
//! checklist's `checkItems`, a card's `labels`) are registered straight from
//! their inline payloads. Then every id reference is resolved concurrently
//! through the identity map: loaded targets are reused, shells are fetched.
//!
//! Loading a node (fetch + merge) never waits on the inflation of another
//! node. The operation-wide visited set records the shallowest depth each
//! node was reached at. A branch that reaches a node at the same or a greater
//! depth links it and stops, which is what terminates cycles such as
//! board -> card -> board. A branch that arrives shallower inflates the node
//! again from there, so under `max_depth` a node's relations are followed as
//! if it had been reached along its shortest path, whatever the poll order.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;

use crate::error::ApiError;
use crate::object::ObjectRef;
use crate::schema::{schema, Cardinality};
use crate::session::Session;
use crate::transform::{self, Reference, ReferenceValue};
use crate::types::{ObjectKey, ResourceId, ResourceKind};

/// Controls how far a fetch follows relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// When false, relation fields stay raw ids and nothing beyond the
    /// requested objects is fetched.
    pub inflate_children: bool,
    /// Relations further than this many hops from the requested object are
    /// linked only if their target is already loaded.
    pub max_depth: Option<usize>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            inflate_children: true,
            max_depth: None,
        }
    }
}

impl FetchOptions {
    /// Fetch only the requested objects.
    pub fn shallow() -> Self {
        Self {
            inflate_children: false,
            max_depth: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    fn may_fetch_at(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }
}

/// One top-level inflation: the options plus the visited set shared by every
/// branch it spawns.
pub(crate) struct Inflation<'a> {
    session: &'a Session,
    options: FetchOptions,
    visited: Mutex<HashMap<ObjectKey, usize>>,
}

impl<'a> Inflation<'a> {
    pub(crate) fn new(session: &'a Session, options: FetchOptions) -> Self {
        Self {
            session,
            options,
            visited: Mutex::new(HashMap::new()),
        }
    }

    /// True when `key` has not yet been reached at `depth` or shallower in
    /// this operation.
    fn claim(&self, key: ObjectKey, depth: usize) -> bool {
        let mut visited = self.visited.lock().unwrap_or_else(PoisonError::into_inner);
        match visited.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(depth);
                true
            }
            Entry::Occupied(mut entry) if depth < *entry.get() => {
                entry.insert(depth);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Inflate a requested (already loaded) object.
    pub(crate) async fn run(&self, object: &ObjectRef) -> Result<(), ApiError> {
        if !self.options.inflate_children || !self.claim(object.key(), 0) {
            return Ok(());
        }
        self.inflate(object.clone(), 0).await
    }

    /// Inflate several requested objects concurrently, reporting the first
    /// failure in input order once all have settled.
    pub(crate) async fn run_all(&self, objects: &[ObjectRef]) -> Result<(), ApiError> {
        let results = join_all(objects.iter().map(|object| self.run(object))).await;
        results.into_iter().collect()
    }

    fn inflate(&self, object: ObjectRef, depth: usize) -> BoxFuture<'_, Result<(), ApiError>> {
        async move {
            let references = transform::references(object.kind(), &object.attributes());

            let mut embedded_children = Vec::new();
            for reference in &references {
                if let ReferenceValue::Embedded(items) = &reference.value {
                    let children = self.register_embedded(&object, reference, items)?;
                    object.link_many(reference.relation.attribute, &children);
                    embedded_children.extend(children);
                }
            }

            let child_depth = depth + 1;
            let fetch = self.options.may_fetch_at(child_depth);
            let links = references
                .iter()
                .filter(|r| !matches!(r.value, ReferenceValue::Embedded(_)))
                .map(|r| self.follow(&object, r, child_depth, fetch));
            let nested = embedded_children
                .into_iter()
                .filter(|_| fetch)
                .filter(|child| self.claim(child.key(), child_depth))
                .map(|child| self.inflate(child, child_depth));

            let (links, nested) = futures::join!(join_all(links), join_all(nested));
            links.into_iter().chain(nested).collect::<Result<(), ApiError>>()
        }
        .boxed()
    }

    /// Resolve one id reference of `object` and link the result.
    async fn follow(&self, object: &ObjectRef, reference: &Reference, depth: usize, fetch: bool) -> Result<(), ApiError> {
        let attribute = reference.relation.attribute;
        let target = reference.relation.target;
        match &reference.value {
            ReferenceValue::Cleared => object.unlink(attribute),
            ReferenceValue::One(id) if fetch => {
                let related = self.resolve(target, id.clone(), depth).await?;
                object.link_one(attribute, &related);
            }
            ReferenceValue::Many(ids) if fetch => {
                let resolved = join_all(ids.iter().map(|id| self.resolve(target, id.clone(), depth))).await;
                let related = resolved.into_iter().collect::<Result<Vec<_>, _>>()?;
                object.link_many(attribute, &related);
            }
            ReferenceValue::One(id) => {
                if let Some(related) = self.loaded(target, id) {
                    object.link_one(attribute, &related);
                }
            }
            ReferenceValue::Many(ids) => {
                let related: Vec<_> = ids.iter().filter_map(|id| self.loaded(target, id)).collect();
                if related.len() == ids.len() {
                    object.link_many(attribute, &related);
                }
            }
            ReferenceValue::Embedded(_) => {}
        }
        Ok(())
    }

    /// The canonical object for `(kind, id)`, loaded, and inflated unless
    /// another branch of this operation already reached it at `depth` or
    /// shallower.
    fn resolve(&self, kind: ResourceKind, id: ResourceId, depth: usize) -> BoxFuture<'_, Result<ObjectRef, ApiError>> {
        async move {
            let (object, _) = self.session.identity().get_or_create(kind, &id);
            self.session.ensure_loaded(&object).await?;
            if self.claim(object.key(), depth) {
                self.inflate(object.clone(), depth).await?;
            }
            Ok::<_, ApiError>(object)
        }
        .boxed()
    }

    fn loaded(&self, kind: ResourceKind, id: &ResourceId) -> Option<ObjectRef> {
        self.session
            .identity()
            .get(kind, id)
            .filter(|object| object.is_loaded())
    }

    fn register_embedded(&self, parent: &ObjectRef, reference: &Reference, items: &[Value]) -> Result<Vec<ObjectRef>, ApiError> {
        let kind = reference.relation.target;
        items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                fill_parent(kind, &mut item, parent.kind(), parent.id());
                self.session.identity().absorb(kind, item)
            })
            .collect()
    }
}

/// Set the back-reference of a child payload to its parent when the payload
/// omits it, e.g. `idChecklist` on check items listed under a checklist.
pub(crate) fn fill_parent(kind: ResourceKind, raw: &mut Value, parent_kind: ResourceKind, parent_id: &ResourceId) {
    let Some(map) = raw.as_object_mut() else {
        return;
    };
    let back_reference = schema(kind).relations().find(|(field, relation)| {
        relation.target == parent_kind
            && relation.cardinality == Cardinality::One
            && !map.contains_key(field.name)
    });
    if let Some((field, _)) = back_reference {
        map.insert(field.name.to_string(), Value::from(parent_id.as_str()));
    }
}
