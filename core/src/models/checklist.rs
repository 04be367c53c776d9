use super::{many, one, Board, Card, CheckItem, Resource};
use crate::bridge::blocking_twins;
use crate::error::ApiError;
use crate::inflate::FetchOptions;
use crate::session::{Scope, Session};

resource! {
    /// A checklist attached to a card. Its check items arrive embedded.
    Checklist => Checklist
}

impl Checklist {
    pub fn name(&self) -> Option<String> {
        self.0.get_str("name")
    }

    pub fn set_name(&self, name: &str) -> Result<(), ApiError> {
        self.0.set("name", name)
    }

    pub fn card(&self) -> Option<Card> {
        one(&self.0, "card")
    }

    pub fn board(&self) -> Option<Board> {
        one(&self.0, "board")
    }

    pub fn check_items(&self) -> Vec<CheckItem> {
        many(&self.0, "check_items")
    }

    pub fn complete_items(&self) -> Vec<CheckItem> {
        self.check_items().into_iter().filter(CheckItem::is_complete).collect()
    }

    pub fn incomplete_items(&self) -> Vec<CheckItem> {
        self.check_items().into_iter().filter(|item| !item.is_complete()).collect()
    }

    pub async fn fetch_check_items(&self, session: &Session, options: FetchOptions) -> Result<Vec<CheckItem>, ApiError> {
        session.get_all(Scope::Checklist(self.id().clone()), options).await
    }

    blocking_twins! {
        pub fn fetch_check_items_blocking = fetch_check_items(session: &Session, options: FetchOptions) -> Result<Vec<CheckItem>, ApiError>;
    }
}
