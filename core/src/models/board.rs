use serde::Deserialize;
use serde_json::Value;

use super::{one, Card, Checklist, Label, List, Organization, Resource};
use crate::bridge::blocking_twins;
use crate::error::ApiError;
use crate::inflate::FetchOptions;
use crate::session::{Scope, Session};

resource! {
    /// A Trello board. Boards cannot be deleted through the API; close them.
    Board => Board
}

/// Board preferences, with the values Trello assumes for missing keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardPrefs {
    pub permission_level: String,
    pub voting: String,
    pub comments: String,
    pub invitations: String,
    pub self_join: bool,
    pub card_covers: bool,
    pub card_aging: String,
    pub background: String,
    pub calendar_feed_enabled: bool,
}

impl Default for BoardPrefs {
    fn default() -> Self {
        Self {
            permission_level: "private".to_string(),
            voting: "disabled".to_string(),
            comments: "members".to_string(),
            invitations: "members".to_string(),
            self_join: true,
            card_covers: true,
            card_aging: "regular".to_string(),
            background: "blue".to_string(),
            calendar_feed_enabled: true,
        }
    }
}

impl Board {
    pub fn name(&self) -> Option<String> {
        self.0.get_str("name")
    }

    pub fn set_name(&self, name: &str) -> Result<(), ApiError> {
        self.0.set("name", name)
    }

    pub fn desc(&self) -> Option<String> {
        self.0.get_str("desc")
    }

    pub fn set_desc(&self, desc: &str) -> Result<(), ApiError> {
        self.0.set("desc", desc)
    }

    pub fn closed(&self) -> bool {
        self.0.get_bool("closed").unwrap_or(false)
    }

    /// Mark the board closed; takes effect remotely on the next save.
    pub fn close(&self) -> Result<(), ApiError> {
        self.0.set("closed", true)
    }

    pub fn url(&self) -> Option<String> {
        self.0.get_str("url")
    }

    pub fn short_link(&self) -> Option<String> {
        self.0.get_str("shortLink")
    }

    /// Current preferences. Keys missing from the payload take their
    /// defaults; unknown keys are ignored.
    pub fn prefs(&self) -> Result<BoardPrefs, ApiError> {
        match self.0.get("prefs") {
            None | Some(Value::Null) => Ok(BoardPrefs::default()),
            Some(prefs) => Ok(serde_json::from_value(prefs)?),
        }
    }

    /// Change one preference. It is sent as the flattened `prefs/{name}`
    /// field Trello's update endpoint expects; `prefs()` reflects it once the
    /// save echo is merged.
    pub fn set_pref(&self, name: &str, value: impl Into<Value>) -> Result<(), ApiError> {
        self.0.set(&format!("prefs/{name}"), value)
    }

    pub fn organization(&self) -> Option<Organization> {
        one(&self.0, "organization")
    }

    pub async fn fetch_lists(&self, session: &Session, options: FetchOptions) -> Result<Vec<List>, ApiError> {
        session.get_all(self.scope(), options).await
    }

    pub async fn fetch_cards(&self, session: &Session, options: FetchOptions) -> Result<Vec<Card>, ApiError> {
        session.get_all(self.scope(), options).await
    }

    pub async fn fetch_checklists(&self, session: &Session, options: FetchOptions) -> Result<Vec<Checklist>, ApiError> {
        session.get_all(self.scope(), options).await
    }

    pub async fn fetch_labels(&self, session: &Session, options: FetchOptions) -> Result<Vec<Label>, ApiError> {
        session.get_all(self.scope(), options).await
    }

    blocking_twins! {
        pub fn fetch_lists_blocking = fetch_lists(session: &Session, options: FetchOptions) -> Result<Vec<List>, ApiError>;
        pub fn fetch_cards_blocking = fetch_cards(session: &Session, options: FetchOptions) -> Result<Vec<Card>, ApiError>;
        pub fn fetch_checklists_blocking = fetch_checklists(session: &Session, options: FetchOptions) -> Result<Vec<Checklist>, ApiError>;
        pub fn fetch_labels_blocking = fetch_labels(session: &Session, options: FetchOptions) -> Result<Vec<Label>, ApiError>;
    }

    fn scope(&self) -> Scope {
        Scope::Board(self.id().clone())
    }
}
