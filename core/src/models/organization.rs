use serde_json::Value;

use super::{many, Board, Resource};
use crate::bridge::blocking_twins;
use crate::error::ApiError;
use crate::inflate::FetchOptions;
use crate::session::{Scope, Session};
use crate::transform::Attributes;

resource! {
    /// A Trello team.
    Organization => Organization, check = check_website
}

fn check_website(attributes: &Attributes) -> Result<(), ApiError> {
    match attributes.get("website") {
        Some(Value::String(website)) => validate_website(website),
        _ => Ok(()),
    }
}

fn validate_website(website: &str) -> Result<(), ApiError> {
    if website.is_empty() || website.starts_with("http://") || website.starts_with("https://") {
        Ok(())
    } else {
        Err(ApiError::InvalidValue {
            field: "website".to_string(),
            reason: "must start with http:// or https://".to_string(),
        })
    }
}

impl Organization {
    pub fn name(&self) -> Option<String> {
        self.0.get_str("name")
    }

    pub fn display_name(&self) -> Option<String> {
        self.0.get_str("displayName")
    }

    pub fn set_display_name(&self, display_name: &str) -> Result<(), ApiError> {
        self.0.set("displayName", display_name)
    }

    pub fn desc(&self) -> Option<String> {
        self.0.get_str("desc")
    }

    pub fn set_desc(&self, desc: &str) -> Result<(), ApiError> {
        self.0.set("desc", desc)
    }

    pub fn website(&self) -> Option<String> {
        self.0.get_str("website")
    }

    pub fn set_website(&self, website: &str) -> Result<(), ApiError> {
        validate_website(website)?;
        self.0.set("website", website)
    }

    /// Boards linked through `idBoards` by the last inflation.
    pub fn boards(&self) -> Vec<Board> {
        many(&self.0, "boards")
    }

    /// Fetch every board of this organization.
    pub async fn fetch_boards(&self, session: &Session, options: FetchOptions) -> Result<Vec<Board>, ApiError> {
        session
            .get_all(Scope::Organization(self.id().clone()), options)
            .await
    }

    blocking_twins! {
        pub fn fetch_boards_blocking = fetch_boards(session: &Session, options: FetchOptions) -> Result<Vec<Board>, ApiError>;
    }
}
