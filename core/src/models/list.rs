use serde_json::{Map, Value};
use tracing::debug;

use super::{one, Board, Card, Resource};
use crate::bridge::blocking_twins;
use crate::error::ApiError;
use crate::inflate::FetchOptions;
use crate::session::{Scope, Session};
use crate::types::ResourceKind;

resource! {
    /// A column on a board. Lists cannot be deleted through the API.
    List => List
}

impl List {
    pub fn name(&self) -> Option<String> {
        self.0.get_str("name")
    }

    pub fn set_name(&self, name: &str) -> Result<(), ApiError> {
        self.0.set("name", name)
    }

    pub fn closed(&self) -> bool {
        self.0.get_bool("closed").unwrap_or(false)
    }

    pub fn pos(&self) -> Option<f64> {
        self.0.get_f64("pos")
    }

    pub fn board(&self) -> Option<Board> {
        one(&self.0, "board")
    }

    pub async fn fetch_cards(&self, session: &Session, options: FetchOptions) -> Result<Vec<Card>, ApiError> {
        session.get_all(Scope::List(self.id().clone()), options).await
    }

    /// Archive every card on this list. Cached cards of the list are marked
    /// closed and their cached responses dropped; unsaved edits to `closed`
    /// are kept and reported as a conflict.
    pub async fn archive_all_cards(&self, session: &Session) -> Result<(), ApiError> {
        session
            .client()
            .post(&format!("lists/{}/archiveAllCards", self.id()), Value::Object(Map::new()))
            .await?;

        let mut closed = Map::new();
        closed.insert("closed".to_string(), Value::Bool(true));
        let mut conflicts = Vec::new();
        for card in session.identity().objects_of(ResourceKind::Card) {
            if card.get_str("idList").as_deref() == Some(self.id().as_str()) {
                conflicts.extend(card.merge(&closed));
                session.forget_responses(&card);
            }
        }
        session.client().evict_cached(&format!("lists/{}/cards", self.id()));
        debug!(list = %self.id(), "archived all cards");
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Conflict(conflicts))
        }
    }

    blocking_twins! {
        pub fn fetch_cards_blocking = fetch_cards(session: &Session, options: FetchOptions) -> Result<Vec<Card>, ApiError>;
        pub fn archive_all_cards_blocking = archive_all_cards(session: &Session) -> Result<(), ApiError>;
    }
}
