//! Identifier and resource-kind types shared by every layer of the client.
//!
//! # Design
//! `ResourceId` is an opaque string. Trello hands out two textual forms for
//! the same resource: the resolved 24-character hex id and a short form
//! (e.g. a card's `shortLink`). Only resolved ids are ever used as identity
//! map keys; a short id is sent to the API once and the `id` in the response
//! becomes the key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of a resolved Trello id.
pub const RESOLVED_ID_LEN: usize = 24;

/// An opaque Trello resource identifier, in either resolved or short form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this is the canonical 24-hex form rather than a short id.
    pub fn is_resolved(&self) -> bool {
        self.0.len() == RESOLVED_ID_LEN && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The remote resource types this client models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Organization,
    Board,
    List,
    Card,
    Checklist,
    CheckItem,
    Label,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Organization,
        ResourceKind::Board,
        ResourceKind::List,
        ResourceKind::Card,
        ResourceKind::Checklist,
        ResourceKind::CheckItem,
        ResourceKind::Label,
    ];

    /// Path segment of the REST collection for this kind.
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Organization => "organizations",
            ResourceKind::Board => "boards",
            ResourceKind::List => "lists",
            ResourceKind::Card => "cards",
            ResourceKind::Checklist => "checklists",
            ResourceKind::CheckItem => "checkItems",
            ResourceKind::Label => "labels",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Organization => "organization",
            ResourceKind::Board => "board",
            ResourceKind::List => "list",
            ResourceKind::Card => "card",
            ResourceKind::Checklist => "checklist",
            ResourceKind::CheckItem => "checkItem",
            ResourceKind::Label => "label",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity map key: a kind plus a resolved id.
pub type ObjectKey = (ResourceKind, ResourceId);
