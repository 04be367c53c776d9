//! Client-side object model for the Trello REST API.
//!
//! # Overview
//! Remote resources (organizations, boards, lists, cards, checklists, check
//! items, labels) are read and mutated as local objects. A `Session` pairs a
//! `TrelloClient` with an `IdentityMap`, so every fetch of the same resolved
//! id yields the same canonical instance, and fetched objects have their id
//! fields inflated into live links to other canonical objects.
//!
//! # Design
//! - `TrelloClient` builds plain `HttpRequest`s and parses `HttpResponse`s;
//!   a `Transport` does the I/O in between (`ReqwestTransport` by default).
//!   Requests are rate-limited and GET responses optionally cached.
//! - A static per-kind `schema` drives the state transformer and the relation
//!   inflator; the typed wrappers in `models` carry no parsing code.
//! - Every operation is an `async fn`; its `*_blocking` twin runs it on a
//!   dedicated runtime via `bridge::run_blocking`.
//! - `save` sends only dirty fields, and re-fetches never overwrite unsaved
//!   edits: disagreements are reported as `ApiError::Conflict`.

pub mod bridge;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod inflate;
pub mod models;
pub mod object;
pub mod rate_limit;
pub mod schema;
pub mod session;
pub mod transform;
pub mod transport;
pub mod types;

pub use bridge::run_blocking;
pub use client::{Endpoints, TrelloClient};
pub use config::{ClientConfig, Credentials};
pub use error::{ApiError, FieldConflict};
pub use http::{ApiRequest, CachePolicy, HttpMethod, HttpRequest, HttpResponse};
pub use identity::IdentityMap;
pub use inflate::FetchOptions;
pub use models::{Board, BoardPrefs, Card, CheckItem, Checklist, Label, List, Organization, Resource};
pub use object::{ObjectRef, TrelloObject};
pub use session::{Scope, Session};
pub use transform::Attributes;
pub use transport::{ReqwestTransport, Transport};
pub use types::{ResourceId, ResourceKind};
