//! The seeded data every fresh `app()` starts from.
//!
//! One organization owns the "Launch" board, which has two lists, two cards,
//! one checklist with two items, and two labels. A second, closed board
//! belongs to no organization.

use serde_json::{json, Value};

use crate::Store;

pub const ORGANIZATION_ID: &str = "5f0000000000000000000001";
pub const BOARD_ID: &str = "5f0000000000000000000002";
pub const BOARD_SHORT_LINK: &str = "nC8QJJoZ";
pub const CLOSED_BOARD_ID: &str = "5f0000000000000000000003";
pub const TODO_LIST_ID: &str = "5f0000000000000000000004";
pub const DONE_LIST_ID: &str = "5f0000000000000000000005";
pub const CARD_ID: &str = "5f0000000000000000000006";
pub const CARD_SHORT_LINK: &str = "o3SKtC9v";
pub const CARD_NAME: &str = "Write the release notes";
pub const DONE_CARD_ID: &str = "5f0000000000000000000007";
pub const CHECKLIST_ID: &str = "5f0000000000000000000008";
pub const CHECK_ITEM_IDS: [&str; 2] = ["5f0000000000000000000009", "5f000000000000000000000a"];
pub const GREEN_LABEL_ID: &str = "5f000000000000000000000b";
pub const RED_LABEL_ID: &str = "5f000000000000000000000c";

pub fn default_prefs() -> Value {
    json!({
        "permissionLevel": "private",
        "voting": "disabled",
        "comments": "members",
        "invitations": "members",
        "selfJoin": true,
        "cardCovers": true,
        "cardAging": "regular",
        "background": "blue",
        "calendarFeedEnabled": false
    })
}

pub fn store() -> Store {
    let mut store = Store::default();

    store.insert(
        "organizations",
        json!({
            "id": ORGANIZATION_ID,
            "name": "trellisteam",
            "displayName": "Trellis Team",
            "desc": "",
            "website": "https://example.com",
            "url": "https://trello.com/trellisteam",
            "idBoards": [BOARD_ID]
        }),
    );

    store.insert(
        "boards",
        json!({
            "id": BOARD_ID,
            "name": "Launch",
            "desc": "Everything for the 1.0 launch",
            "closed": false,
            "idOrganization": ORGANIZATION_ID,
            "pinned": false,
            "prefs": default_prefs(),
            "shortLink": BOARD_SHORT_LINK,
            "url": format!("https://trello.com/b/{BOARD_SHORT_LINK}/launch")
        }),
    );
    store.insert(
        "boards",
        json!({
            "id": CLOSED_BOARD_ID,
            "name": "Archive",
            "desc": "",
            "closed": true,
            "idOrganization": null,
            "prefs": default_prefs(),
            "shortLink": "Zk4VbQe1",
            "url": "https://trello.com/b/Zk4VbQe1/archive"
        }),
    );

    for (id, name, pos) in [(TODO_LIST_ID, "To Do", 16384), (DONE_LIST_ID, "Done", 32768)] {
        store.insert(
            "lists",
            json!({"id": id, "name": name, "closed": false, "idBoard": BOARD_ID, "pos": pos, "subscribed": false}),
        );
    }

    store.insert(
        "cards",
        json!({
            "id": CARD_ID,
            "name": CARD_NAME,
            "desc": "Collect changes since 0.9",
            "closed": false,
            "due": "2024-06-01T12:00:00.000Z",
            "idBoard": BOARD_ID,
            "idList": TODO_LIST_ID,
            "idChecklists": [CHECKLIST_ID],
            "idLabels": [GREEN_LABEL_ID, RED_LABEL_ID],
            "idMembers": [],
            "pos": 16384,
            "shortLink": CARD_SHORT_LINK,
            "url": format!("https://trello.com/c/{CARD_SHORT_LINK}/1-write-the-release-notes")
        }),
    );
    store.insert(
        "cards",
        json!({
            "id": DONE_CARD_ID,
            "name": "Tag the release",
            "desc": "",
            "closed": false,
            "due": null,
            "idBoard": BOARD_ID,
            "idList": DONE_LIST_ID,
            "idChecklists": [],
            "idLabels": [],
            "idMembers": [],
            "pos": 16384,
            "shortLink": "pQ7rT2xa",
            "url": "https://trello.com/c/pQ7rT2xa/2-tag-the-release"
        }),
    );

    store.insert(
        "checklists",
        json!({
            "id": CHECKLIST_ID,
            "name": "Steps",
            "idBoard": BOARD_ID,
            "idCard": CARD_ID,
            "pos": 16384,
            "checkItems": [
                {"id": CHECK_ITEM_IDS[0], "name": "Draft", "state": "complete", "idChecklist": CHECKLIST_ID, "pos": 16384},
                {"id": CHECK_ITEM_IDS[1], "name": "Publish", "state": "incomplete", "idChecklist": CHECKLIST_ID, "pos": 32768}
            ]
        }),
    );

    for (id, color, name) in [(GREEN_LABEL_ID, "green", "ready"), (RED_LABEL_ID, "red", "blocked")] {
        store.insert(
            "labels",
            json!({"id": id, "idBoard": BOARD_ID, "color": color, "name": name, "uses": 1}),
        );
    }

    store
}
