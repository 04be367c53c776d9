use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{many, one, Board, Checklist, Label, List, Resource};
use crate::error::ApiError;
use crate::transform;

resource! {
    /// A card on a list.
    Card => Card
}

impl Card {
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

    pub fn set_closed(&self, closed: bool) -> Result<(), ApiError> {
        self.0.set("closed", closed)
    }

    pub fn short_link(&self) -> Option<String> {
        self.0.get_str("shortLink")
    }

    pub fn url(&self) -> Option<String> {
        self.0.get_str("url")
    }

    pub fn due(&self) -> Option<DateTime<Utc>> {
        self.0.get_date("due")
    }

    pub fn set_due(&self, due: Option<DateTime<Utc>>) -> Result<(), ApiError> {
        let value = due.map_or(Value::Null, |due| Value::from(transform::format_date(&due)));
        self.0.set("due", value)
    }

    /// Colors of the card's labels, from the embedded label payloads when
    /// present, otherwise from the linked labels.
    pub fn label_colors(&self) -> Vec<String> {
        match self.0.get("labels") {
            Some(Value::Array(labels)) => labels
                .iter()
                .filter_map(|label| label.get("color").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            _ => self.labels().iter().filter_map(Label::color).collect(),
        }
    }

    pub fn list(&self) -> Option<List> {
        one(&self.0, "list")
    }

    pub fn board(&self) -> Option<Board> {
        one(&self.0, "board")
    }

    pub fn checklists(&self) -> Vec<Checklist> {
        many(&self.0, "checklists")
    }

    pub fn labels(&self) -> Vec<Label> {
        many(&self.0, "labels")
    }

    /// Move the card to `list` on the next save.
    pub fn move_to(&self, list: &List) -> Result<(), ApiError> {
        self.0.set_relation("list", list.object())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::identity::IdentityMap;
    use crate::types::ResourceKind;

    #[test]
    fn label_colors_come_from_embedded_labels() {
        let map = IdentityMap::new();
        let card = Card::from_object(
            map.absorb(
                ResourceKind::Card,
                json!({
                    "id": "c1",
                    "labels": [
                        {"id": "lb1", "color": "green", "name": "ok"},
                        {"id": "lb2", "color": "red", "name": "blocked"}
                    ]
                }),
            )
            .unwrap(),
        );
        assert_eq!(card.label_colors(), vec!["green", "red"]);
    }

    #[test]
    fn due_round_trips_through_rfc3339() {
        let map = IdentityMap::new();
        let card = Card::from_object(map.absorb(ResourceKind::Card, json!({"id": "c1", "due": null})).unwrap());
        assert_eq!(card.due(), None);

        let due = Utc.with_ymd_and_hms(2025, 1, 31, 17, 0, 0).unwrap();
        card.set_due(Some(due)).unwrap();
        assert_eq!(card.due(), Some(due));
        assert_eq!(card.get("due"), Some(json!("2025-01-31T17:00:00.000Z")));

        card.set_due(None).unwrap();
        assert_eq!(card.object().pending_changes().get("due"), Some(&Value::Null));
    }

    #[test]
    fn move_to_rewrites_id_list() {
        let map = IdentityMap::new();
        let card = Card::from_object(map.absorb(ResourceKind::Card, json!({"id": "c1", "idList": "l1"})).unwrap());
        let list = List::from_object(map.absorb(ResourceKind::List, json!({"id": "l2", "name": "Done"})).unwrap());
        card.move_to(&list).unwrap();
        assert_eq!(card.get("idList"), Some(json!("l2")));
        assert_eq!(card.list(), Some(list));
    }
}
