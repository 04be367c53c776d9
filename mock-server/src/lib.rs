//! In-memory imitation of the parts of the Trello REST API the client uses.
//!
//! Resources are stored as raw JSON objects per collection. Check items live
//! embedded in their checklist, and a card's `labels` are rendered from its
//! `idLabels` on every read, as Trello does.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub mod fixture;

pub type Object = Map<String, Value>;
pub type Params = HashMap<String, String>;

const COLLECTIONS: [&str; 6] = ["organizations", "boards", "lists", "cards", "checklists", "labels"];

#[derive(Debug, Default, Clone)]
pub struct Store {
    collections: HashMap<&'static str, BTreeMap<String, Object>>,
}

pub type Db = Arc<RwLock<Store>>;

/// Failure responses, with the plain-text bodies Trello sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFailure {
    Unauthorized,
    InvalidId,
    NotFound,
    BadRequest(String),
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        match self {
            ApiFailure::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid key".to_string()),
            ApiFailure::InvalidId => (StatusCode::BAD_REQUEST, "invalid id".to_string()),
            ApiFailure::NotFound => (StatusCode::NOT_FOUND, "The requested resource was not found.".to_string()),
            ApiFailure::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
        }
        .into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiFailure>;

pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..24].to_string()
}

fn short_link() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn is_resolved(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

fn collection_name(collection: &str) -> Option<&'static str> {
    COLLECTIONS.into_iter().find(|c| *c == collection)
}

impl Store {
    pub fn insert(&mut self, collection: &'static str, object: Value) {
        if let Value::Object(object) = object {
            let id = object.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            self.collections.entry(collection).or_default().insert(id, object);
        }
    }

    fn table(&self, collection: &str) -> impl Iterator<Item = &Object> {
        self.collections.get(collection).into_iter().flat_map(BTreeMap::values)
    }

    /// Resolve a path id (resolved or a card/board short link) to a stored id.
    fn resolve(&self, collection: &str, id: &str) -> Result<String, ApiFailure> {
        let table = self.collections.get(collection);
        if table.is_some_and(|t| t.contains_key(id)) {
            return Ok(id.to_string());
        }
        if matches!(collection, "cards" | "boards") {
            let by_link = self
                .table(collection)
                .find(|o| o.get("shortLink").and_then(Value::as_str) == Some(id));
            if let Some(object) = by_link {
                return Ok(str_field(object, "id").to_string());
            }
        }
        if is_resolved(id) {
            Err(ApiFailure::NotFound)
        } else {
            Err(ApiFailure::InvalidId)
        }
    }

    fn object(&self, collection: &str, id: &str) -> Result<&Object, ApiFailure> {
        let id = self.resolve(collection, id)?;
        self.collections
            .get(collection)
            .and_then(|t| t.get(&id))
            .ok_or(ApiFailure::NotFound)
    }

    fn object_mut(&mut self, collection: &str, id: &str) -> Result<&mut Object, ApiFailure> {
        let id = self.resolve(collection, id)?;
        self.collections
            .get_mut(collection)
            .and_then(|t| t.get_mut(&id))
            .ok_or(ApiFailure::NotFound)
    }

    /// The representation returned to clients.
    fn render(&self, collection: &str, object: &Object) -> Value {
        let mut rendered = object.clone();
        if collection == "cards" {
            let labels: Vec<Value> = ids(object, "idLabels")
                .iter()
                .filter_map(|id| self.collections.get("labels")?.get(id))
                .map(|label| Value::Object(label.clone()))
                .collect();
            rendered.insert("labels".to_string(), Value::Array(labels));
        }
        Value::Object(rendered)
    }

    fn children(&self, collection: &str, field: &str, parent: &str) -> Value {
        Value::Array(
            self.table(collection)
                .filter(|o| o.get(field).and_then(Value::as_str) == Some(parent))
                .map(|o| self.render(collection, o))
                .collect(),
        )
    }

    fn has_check_item(&self, checklist: &str, item: &str) -> bool {
        self.object("checklists", checklist)
            .ok()
            .and_then(|c| c.get("checkItems"))
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|i| i.get("id").and_then(Value::as_str) == Some(item)))
    }

    fn check_item_mut(&mut self, checklist: &str, item: &str) -> Result<&mut Object, ApiFailure> {
        let checklist = self.object_mut("checklists", checklist)?;
        checklist
            .get_mut("checkItems")
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
            .find(|i| str_field(i, "id") == item)
            .ok_or(ApiFailure::NotFound)
    }
}

fn str_field<'a>(object: &'a Object, field: &str) -> &'a str {
    object.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn ids(object: &Object, field: &str) -> Vec<String> {
    object
        .get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

fn required(body: &Object, field: &str) -> Result<String, ApiFailure> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiFailure::BadRequest(format!("invalid value for {field}")))
}

/// A router over the seeded fixture data.
pub fn app() -> Router {
    app_with(fixture::store())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/1/{collection}", post(create_resource))
        .route(
            "/1/{collection}/{id}",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route("/1/{collection}/{id}/{nested}", get(list_nested).post(post_nested))
        .route(
            "/1/{collection}/{id}/{nested}/{item}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .layer(middleware::from_fn(require_credentials))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_credentials(request: Request, next: Next) -> Response {
    let params: Params = Query::try_from_uri(request.uri())
        .map(|Query(params)| params)
        .unwrap_or_default();
    let present = |name: &str| params.get(name).is_some_and(|v| !v.is_empty());
    if !present("key") || !present("token") {
        return ApiFailure::Unauthorized.into_response();
    }
    debug!(method = %request.method(), path = %request.uri().path(), "request");
    next.run(request).await
}

async fn get_resource(State(db): State<Db>, Path((collection, id)): Path<(String, String)>) -> ApiResult {
    let collection = collection_name(&collection).ok_or(ApiFailure::NotFound)?;
    let store = db.read().await;
    let object = store.object(collection, &id)?;
    Ok(Json(store.render(collection, object)))
}

async fn update_resource(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Object>,
) -> ApiResult {
    let collection = collection_name(&collection).ok_or(ApiFailure::NotFound)?;
    let mut store = db.write().await;
    let object = store.object_mut(collection, &id)?;
    for (field, value) in body {
        if field == "id" {
            continue;
        }
        match field.strip_prefix("prefs/") {
            Some(pref) => {
                let prefs = object.entry("prefs").or_insert_with(|| json!({}));
                if let Some(prefs) = prefs.as_object_mut() {
                    prefs.insert(pref.to_string(), value);
                }
            }
            None => {
                object.insert(field, value);
            }
        }
    }
    let object = object.clone();
    Ok(Json(store.render(collection, &object)))
}

async fn delete_resource(State(db): State<Db>, Path((collection, id)): Path<(String, String)>) -> ApiResult {
    let collection = collection_name(&collection).ok_or(ApiFailure::NotFound)?;
    let mut store = db.write().await;
    let id = store.resolve(collection, &id)?;
    let removed = store
        .collections
        .get_mut(collection)
        .and_then(|t| t.remove(&id))
        .ok_or(ApiFailure::NotFound)?;
    if collection == "checklists" {
        if let Ok(card) = store.object_mut("cards", str_field(&removed, "idCard")) {
            if let Some(Value::Array(checklists)) = card.get_mut("idChecklists") {
                checklists.retain(|c| c.as_str() != Some(id.as_str()));
            }
        }
    }
    Ok(Json(json!({"_value": null})))
}

async fn create_resource(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Json(mut body): Json<Object>,
) -> ApiResult {
    let collection = collection_name(&collection).ok_or(ApiFailure::NotFound)?;
    let mut store = db.write().await;
    let id = new_id();
    body.insert("id".to_string(), Value::from(id.clone()));

    match collection {
        "organizations" => {
            let display_name = required(&body, "displayName")?;
            body.entry("name")
                .or_insert_with(|| Value::from(display_name.to_lowercase().replace(' ', "")));
            body.entry("idBoards").or_insert_with(|| json!([]));
        }
        "boards" => {
            required(&body, "name")?;
            let link = short_link();
            body.entry("closed").or_insert(Value::Bool(false));
            body.entry("idOrganization").or_insert(Value::Null);
            body.entry("prefs").or_insert_with(fixture::default_prefs);
            body.insert("url".to_string(), Value::from(format!("https://trello.com/b/{link}")));
            body.insert("shortLink".to_string(), Value::from(link));
        }
        "lists" => {
            required(&body, "name")?;
            let board = required(&body, "idBoard")?;
            store.object("boards", &board)?;
            body.entry("closed").or_insert(Value::Bool(false));
        }
        "cards" => {
            let list = required(&body, "idList")?;
            let board = str_field(store.object("lists", &list)?, "idBoard").to_string();
            let link = short_link();
            body.insert("idBoard".to_string(), Value::from(board));
            body.entry("name").or_insert_with(|| Value::from(""));
            body.entry("closed").or_insert(Value::Bool(false));
            body.entry("due").or_insert(Value::Null);
            body.entry("idChecklists").or_insert_with(|| json!([]));
            body.entry("idLabels").or_insert_with(|| json!([]));
            body.insert("url".to_string(), Value::from(format!("https://trello.com/c/{link}")));
            body.insert("shortLink".to_string(), Value::from(link));
        }
        "checklists" => {
            let card_id = required(&body, "idCard")?;
            let card = store.object_mut("cards", &card_id)?;
            if let Some(Value::Array(checklists)) = card.get_mut("idChecklists") {
                checklists.push(Value::from(id.clone()));
            }
            let board = str_field(card, "idBoard").to_string();
            body.insert("idBoard".to_string(), Value::from(board));
            body.entry("checkItems").or_insert_with(|| json!([]));
        }
        "labels" => {
            let board = required(&body, "idBoard")?;
            store.object("boards", &board)?;
            body.entry("name").or_insert_with(|| Value::from(""));
        }
        _ => return Err(ApiFailure::NotFound),
    }

    let value = Value::Object(body);
    store.insert(collection, value);
    let created = store.object(collection, &id)?;
    Ok(Json(store.render(collection, created)))
}

async fn list_nested(
    State(db): State<Db>,
    Path((collection, id, nested)): Path<(String, String, String)>,
    Query(params): Query<Params>,
) -> ApiResult {
    let store = db.read().await;
    let listed = match (collection.as_str(), nested.as_str()) {
        ("members", "boards") if id == "me" => {
            let open_only = params.get("filter").map(String::as_str) == Some("open");
            Value::Array(
                store
                    .table("boards")
                    .filter(|b| !open_only || b.get("closed") != Some(&Value::Bool(true)))
                    .map(|b| store.render("boards", b))
                    .collect(),
            )
        }
        ("members", "organizations") if id == "me" => Value::Array(
            store
                .table("organizations")
                .map(|o| store.render("organizations", o))
                .collect(),
        ),
        ("boards", "lists" | "cards" | "checklists" | "labels") => {
            let board = store.resolve("boards", &id)?;
            let child = collection_name(&nested).ok_or(ApiFailure::NotFound)?;
            store.children(child, "idBoard", &board)
        }
        ("lists", "cards") => {
            let list = store.resolve("lists", &id)?;
            store.children("cards", "idList", &list)
        }
        ("organizations", "boards") => {
            let organization = store.resolve("organizations", &id)?;
            store.children("boards", "idOrganization", &organization)
        }
        ("checklists", "checkItems") => store
            .object("checklists", &id)?
            .get("checkItems")
            .cloned()
            .unwrap_or_else(|| json!([])),
        _ => return Err(ApiFailure::NotFound),
    };
    Ok(Json(listed))
}

async fn post_nested(
    State(db): State<Db>,
    Path((collection, id, nested)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult {
    let mut store = db.write().await;
    match (collection.as_str(), nested.as_str()) {
        ("lists", "archiveAllCards") => {
            let list = store.resolve("lists", &id)?;
            if let Some(cards) = store.collections.get_mut("cards") {
                cards
                    .values_mut()
                    .filter(|c| str_field(c, "idList") == list)
                    .for_each(|c| {
                        c.insert("closed".to_string(), Value::Bool(true));
                    });
            }
            Ok(Json(json!({})))
        }
        ("checklists", "checkItems") => {
            let body: Object = serde_json::from_slice(&body)
                .map_err(|e| ApiFailure::BadRequest(format!("invalid body: {e}")))?;
            let name = required(&body, "name")?;
            let checklist_id = store.resolve("checklists", &id)?;
            let checklist = store.object_mut("checklists", &checklist_id)?;
            let items = checklist
                .entry("checkItems")
                .or_insert_with(|| json!([]))
                .as_array_mut()
                .ok_or(ApiFailure::NotFound)?;
            let item = json!({
                "id": new_id(),
                "name": name,
                "state": body.get("state").cloned().unwrap_or_else(|| Value::from("incomplete")),
                "idChecklist": checklist_id,
                "pos": items.len() as u64 * 16384 + 16384,
            });
            items.push(item.clone());
            Ok(Json(item))
        }
        _ => Err(ApiFailure::NotFound),
    }
}

async fn get_item(
    State(db): State<Db>,
    Path((collection, id, nested, item)): Path<(String, String, String, String)>,
) -> ApiResult {
    if (collection.as_str(), nested.as_str()) != ("checklists", "checkItems") {
        return Err(ApiFailure::NotFound);
    }
    let mut store = db.write().await;
    let item = store.check_item_mut(&id, &item)?;
    Ok(Json(Value::Object(item.clone())))
}

/// `PUT /1/cards/{card}/checkItem/{item}`: check items are updated through
/// the card that owns their checklist.
async fn update_item(
    State(db): State<Db>,
    Path((collection, id, nested, item)): Path<(String, String, String, String)>,
    Json(body): Json<Object>,
) -> ApiResult {
    if (collection.as_str(), nested.as_str()) != ("cards", "checkItem") {
        return Err(ApiFailure::NotFound);
    }
    let mut store = db.write().await;
    let card = store.object("cards", &id)?;
    let checklists = ids(card, "idChecklists");
    let owner = checklists
        .into_iter()
        .find(|checklist| store.has_check_item(checklist, &item))
        .ok_or(ApiFailure::NotFound)?;
    let target = store.check_item_mut(&owner, &item)?;
    for (field, value) in body {
        if field != "id" {
            target.insert(field, value);
        }
    }
    Ok(Json(Value::Object(target.clone())))
}

async fn delete_item(
    State(db): State<Db>,
    Path((collection, id, nested, item)): Path<(String, String, String, String)>,
) -> ApiResult {
    if (collection.as_str(), nested.as_str()) != ("checklists", "checkItems") {
        return Err(ApiFailure::NotFound);
    }
    let mut store = db.write().await;
    let checklist = store.object_mut("checklists", &id)?;
    let items = checklist
        .get_mut("checkItems")
        .and_then(Value::as_array_mut)
        .ok_or(ApiFailure::NotFound)?;
    let before = items.len();
    items.retain(|i| i.get("id").and_then(Value::as_str) != Some(item.as_str()));
    if items.len() == before {
        return Err(ApiFailure::NotFound);
    }
    Ok(Json(json!({"_value": null})))
}
