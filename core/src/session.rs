//! The caller-owned context tying a `TrelloClient` to an `IdentityMap`.
//!
//! # Overview
//! Every object-level operation goes through a `Session`: fetch by id, fetch
//! many, list a scope, save, refresh, create, delete. Objects fetched through
//! one session are canonical within it; two sessions never share instances,
//! which keeps independent caches isolated (tests create one per case).
//!
//! Each async operation has a `*_blocking` twin generated from it.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::bridge::blocking_twins;
use crate::client::TrelloClient;
use crate::error::ApiError;
use crate::http::{ApiRequest, CachePolicy};
use crate::identity::IdentityMap;
use crate::inflate::{fill_parent, FetchOptions, Inflation};
use crate::models::{CheckItem, Resource};
use crate::object::{ObjectRef, TrelloObject};
use crate::schema::schema;
use crate::transform::{self, Attributes};
use crate::types::{ResourceId, ResourceKind};

/// Where `get_all` looks for objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The boards (open ones only) and organizations of the token's member.
    /// Lists, cards, checklists and labels are gathered across those boards.
    Member,
    Board(ResourceId),
    List(ResourceId),
    Organization(ResourceId),
    Checklist(ResourceId),
}

#[derive(Debug, Clone)]
pub struct Session {
    client: TrelloClient,
    identity: Arc<IdentityMap>,
}

impl Session {
    pub fn new(client: TrelloClient) -> Self {
        Self {
            client,
            identity: Arc::new(IdentityMap::new()),
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::new(TrelloClient::from_env()?))
    }

    pub fn client(&self) -> &TrelloClient {
        &self.client
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    /// Fetch one object by resolved or short id.
    ///
    /// A loaded object already in the identity map is returned without a
    /// request; use `refresh` to force one.
    #[instrument(skip(self), fields(kind = %R::KIND))]
    pub async fn get<R: Resource>(&self, id: &str, options: FetchOptions) -> Result<R, ApiError> {
        let object = self.fetch_object(R::KIND, ResourceId::from(id)).await?;
        Inflation::new(self, options).run(&object).await?;
        Ok(R::from_object(object))
    }

    /// Fetch several objects concurrently. The result follows the order of
    /// `ids`; on failure the first error in that order is returned.
    #[instrument(skip(self), fields(kind = %R::KIND))]
    pub async fn get_many<R: Resource>(&self, ids: &[&str], options: FetchOptions) -> Result<Vec<R>, ApiError> {
        let fetched = join_all(ids.iter().map(|id| self.fetch_object(R::KIND, ResourceId::from(*id)))).await;
        let objects = fetched.into_iter().collect::<Result<Vec<_>, _>>()?;
        Inflation::new(self, options).run_all(&objects).await?;
        Ok(objects.into_iter().map(R::from_object).collect())
    }

    /// Fetch every object of `R`'s kind within `scope`.
    #[instrument(skip(self), fields(kind = %R::KIND))]
    pub async fn get_all<R: Resource>(&self, scope: Scope, options: FetchOptions) -> Result<Vec<R>, ApiError> {
        let objects = self.list_scope(R::KIND, &scope).await?;
        debug!(count = objects.len(), "listed scope");
        Inflation::new(self, options).run_all(&objects).await?;
        Ok(objects.into_iter().map(R::from_object).collect())
    }

    /// Re-fetch `resource`, bypassing the response cache, and merge the
    /// result. Unsaved edits are kept and reported as `ApiError::Conflict`.
    #[instrument(skip(self, resource), fields(kind = %R::KIND, id = %resource.id()))]
    pub async fn refresh<R: Resource>(&self, resource: &R, options: FetchOptions) -> Result<(), ApiError> {
        let object = resource.object();
        let loaded = self.load(object, CachePolicy::Bypass).await;
        if loaded.as_ref().is_err_and(|err| !matches!(err, ApiError::Conflict(_))) {
            return loaded;
        }
        object.mark_loaded();
        Inflation::new(self, options).run(object).await?;
        loaded
    }

    /// Write the dirty fields of `resource` back with one `PUT` and merge
    /// the echoed representation. Nothing is sent when nothing is dirty.
    #[instrument(skip(self, resource), fields(kind = %R::KIND, id = %resource.id()))]
    pub async fn save<R: Resource>(&self, resource: &R) -> Result<(), ApiError> {
        let object = resource.object();
        let payload = object.pending_changes();
        if payload.is_empty() {
            debug!("nothing to save");
            return Ok(());
        }
        R::check(&payload)?;

        let endpoint = self.save_endpoint(object)?;
        debug!(fields = ?payload.keys().collect::<Vec<_>>(), "saving");
        let echoed = self.client.put(&endpoint, Value::Object(payload.clone())).await?;
        object.mark_saved(&payload);
        self.forget_responses(object);

        if echoed.is_object() {
            let transformed = transform::to_attributes(R::KIND, echoed)?;
            self.identity.merge_attributes(object, &transformed)?;
        }
        Ok(())
    }

    /// Save several objects concurrently; the first failure in input order
    /// is returned after all have settled.
    #[instrument(skip_all, fields(kind = %R::KIND, count = resources.len()))]
    pub async fn save_all<R: Resource>(&self, resources: &[R]) -> Result<(), ApiError> {
        let results = join_all(resources.iter().map(|resource| self.save(resource))).await;
        results.into_iter().collect()
    }

    /// Create a new remote object from `attributes` and register it.
    #[instrument(skip_all, fields(kind = %R::KIND))]
    pub async fn create<R: Resource>(&self, attributes: Attributes) -> Result<R, ApiError> {
        let kind = R::KIND;
        for field in schema(kind).create_required {
            if attributes.get(*field).map_or(true, Value::is_null) {
                return Err(ApiError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("required to create a {kind}"),
                });
            }
        }
        for (field, value) in &attributes {
            transform::check_field(kind, field, value)?;
        }
        R::check(&attributes)?;

        let endpoint = match kind {
            ResourceKind::CheckItem => {
                let checklist = attributes.get("idChecklist").and_then(Value::as_str).unwrap_or_default();
                format!("checklists/{checklist}/checkItems")
            }
            _ => kind.collection().to_string(),
        };
        let raw = self.client.post(&endpoint, Value::Object(attributes)).await?;
        let object = self.identity.absorb(kind, raw)?;
        debug!(id = %object.id(), "created");
        Ok(R::from_object(object))
    }

    /// Delete `resource` remotely and evict it from the identity map.
    #[instrument(skip(self, resource), fields(kind = %R::KIND, id = %resource.id()))]
    pub async fn delete<R: Resource>(&self, resource: &R) -> Result<(), ApiError> {
        let object = resource.object();
        if !schema(R::KIND).deletable {
            return Err(ApiError::Unsupported {
                kind: R::KIND,
                operation: "delete",
            });
        }
        let endpoint = self.read_endpoint(object)?;
        self.client.delete(&endpoint).await?;
        self.forget_responses(object);
        self.identity.evict(R::KIND, object.id());
        Ok(())
    }

    /// Build (or update) the canonical object from a payload fetched
    /// elsewhere, then inflate it.
    #[instrument(skip(self, raw), fields(kind = %R::KIND))]
    pub async fn register<R: Resource>(&self, raw: Value, options: FetchOptions) -> Result<R, ApiError> {
        let object = self.identity.absorb(R::KIND, raw)?;
        Inflation::new(self, options).run(&object).await?;
        Ok(R::from_object(object))
    }

    /// Fetch a check item through its checklist; Trello has no top-level
    /// endpoint for check items.
    #[instrument(skip(self))]
    pub async fn get_check_item(&self, checklist: &str, id: &str, options: FetchOptions) -> Result<CheckItem, ApiError> {
        let cached = self
            .identity
            .get(ResourceKind::CheckItem, &ResourceId::from(id))
            .filter(|object| object.is_loaded());
        let object = match cached {
            Some(object) => object,
            None => {
                let mut raw = self.client.get(&format!("checklists/{checklist}/checkItems/{id}")).await?;
                fill_parent(ResourceKind::CheckItem, &mut raw, ResourceKind::Checklist, &ResourceId::from(checklist));
                self.identity.absorb(ResourceKind::CheckItem, raw)?
            }
        };
        Inflation::new(self, options).run(&object).await?;
        Ok(CheckItem::from_object(object))
    }

    /// Forget the cached instance of `R` with `id` along with any cached
    /// responses it was read from, so the next lookup fetches it again.
    /// Returns whether an instance was registered.
    pub fn evict<R: Resource>(&self, id: &str) -> bool {
        let id = ResourceId::from(id);
        match self.identity.evict(R::KIND, &id) {
            Some(object) => {
                self.forget_responses(&object);
                true
            }
            None => {
                if R::KIND != ResourceKind::CheckItem {
                    self.client.evict_cached(&format!("{}/{id}", R::KIND.collection()));
                }
                false
            }
        }
    }

    /// Drop every cached GET that carries a representation of `object`.
    pub(crate) fn forget_responses(&self, object: &TrelloObject) {
        let endpoints = match object.kind() {
            ResourceKind::CheckItem => match object.get_str("idChecklist") {
                Some(checklist) => vec![
                    format!("checklists/{checklist}/checkItems/{}", object.id()),
                    format!("checklists/{checklist}/checkItems"),
                    format!("checklists/{checklist}"),
                ],
                None => Vec::new(),
            },
            kind => {
                let mut endpoints = vec![format!("{}/{}", kind.collection(), object.id())];
                if let Some(short) = object.get_str("shortLink") {
                    endpoints.push(format!("{}/{short}", kind.collection()));
                }
                endpoints
            }
        };
        let dropped: usize = endpoints.iter().map(|endpoint| self.client.evict_cached(endpoint)).sum();
        if dropped > 0 {
            debug!(kind = %object.kind(), id = %object.id(), dropped, "dropped cached responses");
        }
    }

    blocking_twins! {
        pub fn get_blocking<R: Resource> = get(id: &str, options: FetchOptions) -> Result<R, ApiError>;
        pub fn get_many_blocking<R: Resource> = get_many(ids: &[&str], options: FetchOptions) -> Result<Vec<R>, ApiError>;
        pub fn get_all_blocking<R: Resource> = get_all(scope: Scope, options: FetchOptions) -> Result<Vec<R>, ApiError>;
        pub fn refresh_blocking<R: Resource> = refresh(resource: &R, options: FetchOptions) -> Result<(), ApiError>;
        pub fn save_blocking<R: Resource> = save(resource: &R) -> Result<(), ApiError>;
        pub fn save_all_blocking<R: Resource> = save_all(resources: &[R]) -> Result<(), ApiError>;
        pub fn create_blocking<R: Resource> = create(attributes: Attributes) -> Result<R, ApiError>;
        pub fn delete_blocking<R: Resource> = delete(resource: &R) -> Result<(), ApiError>;
        pub fn register_blocking<R: Resource> = register(raw: Value, options: FetchOptions) -> Result<R, ApiError>;
        pub fn get_check_item_blocking = get_check_item(checklist: &str, id: &str, options: FetchOptions) -> Result<CheckItem, ApiError>;
    }

    /// Load a shell once. Concurrent callers share the one fetch; a failed
    /// fetch leaves the shell unloaded for the next caller to retry.
    pub(crate) async fn ensure_loaded(&self, object: &ObjectRef) -> Result<(), ApiError> {
        object
            .loaded
            .get_or_try_init(|| self.load(object, CachePolicy::Use))
            .await?;
        Ok(())
    }

    /// The endpoint that reads (and deletes) one object by id.
    fn read_endpoint(&self, object: &TrelloObject) -> Result<String, ApiError> {
        Ok(match object.kind() {
            ResourceKind::CheckItem => {
                let checklist = self.parent_id(object, "idChecklist", "checklist")?;
                format!("checklists/{checklist}/checkItems/{}", object.id())
            }
            kind => format!("{}/{}", kind.collection(), object.id()),
        })
    }

    async fn load(&self, object: &TrelloObject, cache: CachePolicy) -> Result<(), ApiError> {
        let endpoint = self.read_endpoint(object)?;
        let mut request = ApiRequest::get(&endpoint);
        if cache == CachePolicy::Bypass {
            request = request.bypass_cache();
        }
        let raw = self.client.request(request).await?;
        let transformed = transform::to_attributes(object.kind(), raw)?;
        if transformed.id != *object.id() {
            return Err(ApiError::Deserialization(format!(
                "{endpoint} returned {} {}",
                object.kind(),
                transformed.id
            )));
        }
        self.identity.merge_attributes(object, &transformed)
    }

    /// Resolve `id` to its canonical, loaded object. Ids the map does not
    /// know and that are not in resolved form are fetched first and keyed by
    /// the `id` the server returns; if that object is already loaded the
    /// cached instance wins.
    async fn fetch_object(&self, kind: ResourceKind, id: ResourceId) -> Result<ObjectRef, ApiError> {
        if id.is_resolved() || self.identity.contains(kind, &id) {
            let (object, _) = self.identity.get_or_create(kind, &id);
            self.ensure_loaded(&object).await?;
            return Ok(object);
        }
        if kind == ResourceKind::CheckItem {
            return Err(ApiError::MissingParent {
                kind,
                id,
                parent: "checklist",
            });
        }

        let raw = self.client.get(&format!("{}/{id}", kind.collection())).await?;
        let transformed = transform::to_attributes(kind, raw)?;
        let (object, _) = self.identity.get_or_create(kind, &transformed.id);
        if object.is_loaded() {
            debug!(short = %id, id = %transformed.id, "short id resolved to cached object");
            return Ok(object);
        }
        let merged = self.identity.merge_attributes(&object, &transformed);
        object.mark_loaded();
        merged.map(|()| object)
    }

    async fn list_scope(&self, kind: ResourceKind, scope: &Scope) -> Result<Vec<ObjectRef>, ApiError> {
        use ResourceKind as K;

        match (kind, scope) {
            (K::Board, Scope::Member) => self.member_boards().await,
            (K::Organization, Scope::Member) => {
                self.list(ApiRequest::get("members/me/organizations"), kind, None)
                    .await
            }
            (K::List | K::Card | K::Checklist | K::Label, Scope::Member) => {
                let boards = self.member_boards().await?;
                let per_board = join_all(boards.iter().map(|board| {
                    let request = ApiRequest::get(&format!("boards/{}/{}", board.id(), kind.collection()));
                    self.list(request, kind, Some((K::Board, board.id())))
                }))
                .await;
                let mut objects = Vec::new();
                for listed in per_board {
                    objects.extend(listed?);
                }
                Ok(objects)
            }
            (K::List | K::Card | K::Checklist | K::Label, Scope::Board(board)) => {
                let request = ApiRequest::get(&format!("boards/{board}/{}", kind.collection()));
                self.list(request, kind, Some((K::Board, board))).await
            }
            (K::Card, Scope::List(list)) => {
                let request = ApiRequest::get(&format!("lists/{list}/cards"));
                self.list(request, kind, Some((K::List, list))).await
            }
            (K::Board, Scope::Organization(organization)) => {
                let request = ApiRequest::get(&format!("organizations/{organization}/boards"));
                self.list(request, kind, Some((K::Organization, organization)))
                    .await
            }
            (K::CheckItem, Scope::Checklist(checklist)) => {
                let request = ApiRequest::get(&format!("checklists/{checklist}/checkItems"));
                self.list(request, kind, Some((K::Checklist, checklist))).await
            }
            _ => Err(ApiError::Unsupported {
                kind,
                operation: "get_all for this scope",
            }),
        }
    }

    async fn member_boards(&self) -> Result<Vec<ObjectRef>, ApiError> {
        let request = ApiRequest::get("members/me/boards").param("filter", "open");
        self.list(request, ResourceKind::Board, None).await
    }

    async fn list(
        &self,
        request: ApiRequest,
        kind: ResourceKind,
        parent: Option<(ResourceKind, &ResourceId)>,
    ) -> Result<Vec<ObjectRef>, ApiError> {
        let endpoint = request.endpoint.clone();
        let items = match self.client.request(request).await? {
            Value::Array(items) => items,
            _ => {
                return Err(ApiError::Deserialization(format!(
                    "{endpoint} did not return an array"
                )))
            }
        };
        items
            .into_iter()
            .map(|mut item| {
                if let Some((parent_kind, parent_id)) = parent {
                    fill_parent(kind, &mut item, parent_kind, parent_id);
                }
                self.identity.absorb(kind, item)
            })
            .collect()
    }

    /// The id stored in `field` of `object`, or `MissingParent`.
    fn parent_id(&self, object: &TrelloObject, field: &str, parent: &'static str) -> Result<String, ApiError> {
        object.get_str(field).ok_or_else(|| ApiError::MissingParent {
            kind: object.kind(),
            id: object.id().clone(),
            parent,
        })
    }

    fn save_endpoint(&self, object: &TrelloObject) -> Result<String, ApiError> {
        match object.kind() {
            ResourceKind::CheckItem => {
                // Check items are updated through their card.
                let missing_card = || ApiError::MissingParent {
                    kind: object.kind(),
                    id: object.id().clone(),
                    parent: "card",
                };
                let checklist = self.parent_id(object, "idChecklist", "checklist")?;
                let card = self
                    .identity
                    .get(ResourceKind::Checklist, &ResourceId::from(checklist))
                    .and_then(|checklist| checklist.get_str("idCard"))
                    .ok_or_else(missing_card)?;
                Ok(format!("cards/{card}/checkItem/{}", object.id()))
            }
            kind => Ok(format!("{}/{}", kind.collection(), object.id())),
        }
    }
}
