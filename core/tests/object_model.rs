mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config, hex_id, session, ScriptedTransport};
use serde_json::{json, Map, Value};
use trellis_core::{
    ApiError, Board, Card, CheckItem, Checklist, FetchOptions, HttpMethod, Label, List, Organization, Resource,
    ResourceKind, Scope, Session, TrelloClient,
};

struct Ids {
    org: String,
    board: String,
    list: String,
    card: String,
    checklist: String,
    items: [String; 2],
    green: String,
    red: String,
}

fn ids() -> Ids {
    Ids {
        org: hex_id(1),
        board: hex_id(2),
        list: hex_id(3),
        card: hex_id(4),
        checklist: hex_id(5),
        items: [hex_id(6), hex_id(7)],
        green: hex_id(8),
        red: hex_id(9),
    }
}

fn card_json(ids: &Ids) -> Value {
    json!({
        "id": ids.card,
        "name": "Write the release notes",
        "desc": "Collect changes since 0.9",
        "closed": false,
        "due": "2024-06-01T12:00:00.000Z",
        "idBoard": ids.board,
        "idList": ids.list,
        "idChecklists": [ids.checklist],
        "idLabels": [ids.green, ids.red],
        "labels": [
            {"id": ids.green, "idBoard": ids.board, "color": "green", "name": "ready"},
            {"id": ids.red, "idBoard": ids.board, "color": "red", "name": "blocked"}
        ],
        "shortLink": "o3SKtC9v"
    })
}

/// A small board: one organization, one list, one card with a checklist of
/// two items, two labels.
fn launch_board() -> (Arc<ScriptedTransport>, Ids) {
    let ids = ids();
    let t = ScriptedTransport::new();
    t.get(
        &format!("organizations/{}", ids.org),
        json!({"id": ids.org, "name": "team", "displayName": "Team", "idBoards": [ids.board]}),
    )
    .get(
        &format!("boards/{}", ids.board),
        json!({"id": ids.board, "name": "Launch", "closed": false, "idOrganization": ids.org}),
    )
    .get(
        &format!("lists/{}", ids.list),
        json!({"id": ids.list, "name": "To Do", "closed": false, "idBoard": ids.board, "pos": 16384}),
    )
    .get(&format!("cards/{}", ids.card), card_json(&ids))
    .get("cards/o3SKtC9v", card_json(&ids))
    .get(
        &format!("checklists/{}", ids.checklist),
        json!({
            "id": ids.checklist,
            "name": "Steps",
            "idBoard": ids.board,
            "idCard": ids.card,
            "checkItems": [
                {"id": ids.items[0], "name": "Draft", "state": "complete", "pos": 1},
                {"id": ids.items[1], "name": "Publish", "state": "incomplete", "pos": 2}
            ]
        }),
    );
    for (id, color) in [(&ids.green, "green"), (&ids.red, "red")] {
        t.get(
            &format!("labels/{id}"),
            json!({"id": id, "idBoard": ids.board, "color": color, "name": color}),
        );
    }
    (t, ids)
}

fn attributes(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

// --- identity ---

#[tokio::test]
async fn same_id_yields_the_same_instance() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let first: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();
    let second: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();

    assert!(Arc::ptr_eq(first.object(), second.object()));
    assert_eq!(first, second);
    assert_eq!(t.count(HttpMethod::Get, &format!("cards/{}", ids.card)), 1);
}

#[tokio::test]
async fn relation_targets_are_the_canonical_instances() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let card: Card = s.get(&ids.card, FetchOptions::default()).await.unwrap();
    let list: List = s.get(&ids.list, FetchOptions::shallow()).await.unwrap();
    let board: Board = s.get(&ids.board, FetchOptions::shallow()).await.unwrap();

    assert_eq!(card.list(), Some(list.clone()));
    assert_eq!(card.board(), Some(board.clone()));
    assert_eq!(list.board(), Some(board));
    assert_eq!(t.count(HttpMethod::Get, &format!("lists/{}", ids.list)), 1);
}

#[tokio::test]
async fn short_id_resolves_to_the_cached_instance() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let by_id: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();
    let by_short: Card = s.get("o3SKtC9v", FetchOptions::shallow()).await.unwrap();

    assert_eq!(by_id, by_short);
    assert_eq!(by_short.id().as_str(), ids.card);
    assert!(s.identity().get(ResourceKind::Card, &"o3SKtC9v".into()).is_none());
}

#[tokio::test]
async fn separate_sessions_do_not_share_instances() {
    let (t, ids) = launch_board();
    let a = session(&t);
    let b = session(&t);

    let from_a: List = a.get(&ids.list, FetchOptions::shallow()).await.unwrap();
    let from_b: List = b.get(&ids.list, FetchOptions::shallow()).await.unwrap();

    assert_ne!(from_a, from_b);
    from_a.set_name("Only here").unwrap();
    assert_eq!(from_b.name().as_deref(), Some("To Do"));
}

// --- saving ---

#[tokio::test]
async fn save_sends_only_dirty_fields() {
    let (t, ids) = launch_board();
    let path = format!("cards/{}", ids.card);
    t.put_echo(&path, card_json(&ids));
    let s = session(&t);

    let card: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();
    card.set_name("Release notes v2").unwrap();
    card.set_closed(true).unwrap();
    s.save(&card).await.unwrap();

    let puts: Vec<_> = t.requests().into_iter().filter(|r| r.method == HttpMethod::Put).collect();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].path, path);
    assert_eq!(puts[0].body, Some(json!({"name": "Release notes v2", "closed": true})));
    assert!(!card.is_dirty());
    assert_eq!(card.name().as_deref(), Some("Release notes v2"));
}

#[tokio::test]
async fn save_without_changes_sends_nothing() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let card: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();
    t.reset_log();
    s.save(&card).await.unwrap();

    assert_eq!(t.total(), 0);
}

#[tokio::test]
async fn removed_field_is_saved_as_null() {
    let (t, ids) = launch_board();
    let path = format!("cards/{}", ids.card);
    t.put_echo(&path, card_json(&ids));
    let s = session(&t);

    let card: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();
    card.set_due(None).unwrap();
    s.save(&card).await.unwrap();

    let put = t.requests().into_iter().find(|r| r.method == HttpMethod::Put).unwrap();
    assert_eq!(put.body, Some(json!({"due": null})));
}

#[tokio::test]
async fn failed_save_keeps_fields_dirty() {
    let (t, ids) = launch_board();
    t.respond(HttpMethod::Put, &format!("cards/{}", ids.card), 500, "boom");
    let s = session(&t);

    let card: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();
    card.set_name("Renamed").unwrap();
    let err = s.save(&card).await.unwrap_err();

    assert!(matches!(err, ApiError::Remote { status: 500, .. }));
    assert!(card.is_dirty());
    assert_eq!(card.name().as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn save_all_writes_every_dirty_object() {
    let (t, ids) = launch_board();
    t.put_echo(&format!("labels/{}", ids.green), json!({"id": ids.green, "idBoard": ids.board}))
        .put_echo(&format!("labels/{}", ids.red), json!({"id": ids.red, "idBoard": ids.board}));
    let s = session(&t);

    let labels: Vec<Label> = s
        .get_many(&[&ids.green, &ids.red], FetchOptions::shallow())
        .await
        .unwrap();
    labels[0].set_color("yellow").unwrap();
    s.save_all(&labels).await.unwrap();

    assert_eq!(t.count(HttpMethod::Put, &format!("labels/{}", ids.green)), 1);
    assert_eq!(t.count(HttpMethod::Put, &format!("labels/{}", ids.red)), 0);
    assert_eq!(labels[0].color().as_deref(), Some("yellow"));
}

#[tokio::test]
async fn check_item_is_saved_through_its_card() {
    let (t, ids) = launch_board();
    let path = format!("cards/{}/checkItem/{}", ids.card, ids.items[1]);
    t.put_echo(&path, json!({"id": ids.items[1], "name": "Publish", "idChecklist": ids.checklist}));
    let s = session(&t);

    let checklist: Checklist = s.get(&ids.checklist, FetchOptions::default().with_max_depth(1)).await.unwrap();
    let items = checklist.check_items();
    assert_eq!(items.len(), 2);
    assert_eq!(checklist.complete_items().len(), 1);

    let publish = items.into_iter().find(|i| i.id().as_str() == ids.items[1]).unwrap();
    publish.set_complete(true).unwrap();
    s.save(&publish).await.unwrap();

    assert_eq!(t.count(HttpMethod::Put, &path), 1);
    assert!(publish.is_complete());
    assert_eq!(checklist.incomplete_items().len(), 0);
}

#[tokio::test]
async fn evict_forces_a_fresh_fetch() {
    let (t, ids) = launch_board();
    let s = session(&t);
    let path = format!("lists/{}", ids.list);
    let old: List = s.get(&ids.list, FetchOptions::shallow()).await.unwrap();

    t.get(
        &path,
        json!({"id": ids.list, "name": "Backlog", "closed": false, "idBoard": ids.board, "pos": 16384}),
    );
    assert!(s.evict::<List>(&ids.list));
    let fresh: List = s.get(&ids.list, FetchOptions::shallow()).await.unwrap();

    assert_eq!(t.count(HttpMethod::Get, &path), 2);
    assert_eq!(fresh.name().as_deref(), Some("Backlog"));
    assert_eq!(old.name().as_deref(), Some("To Do"));
    assert_ne!(old, fresh);
    assert!(!s.evict::<List>(&hex_id(99)));
}

#[tokio::test]
async fn evicted_short_link_is_fetched_again() {
    let (t, ids) = launch_board();
    let s = session(&t);
    let _: Card = s.get("o3SKtC9v", FetchOptions::shallow()).await.unwrap();

    let mut renamed = card_json(&ids);
    renamed["name"] = json!("Release notes, final");
    t.get("cards/o3SKtC9v", renamed);
    assert!(s.evict::<Card>(&ids.card));
    let card: Card = s.get("o3SKtC9v", FetchOptions::shallow()).await.unwrap();

    assert_eq!(t.count(HttpMethod::Get, "cards/o3SKtC9v"), 2);
    assert_eq!(card.name().as_deref(), Some("Release notes, final"));
}

#[tokio::test]
async fn saved_check_item_is_read_fresh_after_eviction() {
    let (t, ids) = launch_board();
    let read = format!("checklists/{}/checkItems/{}", ids.checklist, ids.items[1]);
    let write = format!("cards/{}/checkItem/{}", ids.card, ids.items[1]);
    t.get(
        &read,
        json!({"id": ids.items[1], "name": "Publish", "state": "incomplete", "pos": 2, "idChecklist": ids.checklist}),
    )
    .put_echo(&write, json!({"id": ids.items[1], "name": "Publish", "idChecklist": ids.checklist}));
    let s = session(&t);
    let _: Checklist = s.get(&ids.checklist, FetchOptions::shallow()).await.unwrap();

    let item = s.get_check_item(&ids.checklist, &ids.items[1], FetchOptions::shallow()).await.unwrap();
    assert!(!item.is_complete());
    item.set_complete(true).unwrap();
    s.save(&item).await.unwrap();
    assert_eq!(t.count(HttpMethod::Put, &write), 1);

    t.get(
        &read,
        json!({"id": ids.items[1], "name": "Publish", "state": "complete", "pos": 2, "idChecklist": ids.checklist}),
    );
    assert!(s.evict::<CheckItem>(&ids.items[1]));
    let reread = s.get_check_item(&ids.checklist, &ids.items[1], FetchOptions::shallow()).await.unwrap();

    assert_eq!(t.count(HttpMethod::Get, &read), 2);
    assert!(reread.is_complete());
    assert_ne!(reread, item);
}

#[tokio::test]
async fn archiving_a_list_drops_its_cached_card_listing() {
    let (t, ids) = launch_board();
    let listing = format!("lists/{}/cards", ids.list);
    t.get(&listing, json!([card_json(&ids)])).respond(
        HttpMethod::Post,
        &format!("lists/{}/archiveAllCards", ids.list),
        200,
        "{}",
    );
    let s = session(&t);
    let list: List = s.get(&ids.list, FetchOptions::shallow()).await.unwrap();
    let cards = list.fetch_cards(&s, FetchOptions::shallow()).await.unwrap();
    assert_eq!(cards.len(), 1);

    list.archive_all_cards(&s).await.unwrap();
    t.get(&listing, json!([]));
    let mut archived = card_json(&ids);
    archived["closed"] = json!(true);
    t.get(&format!("cards/{}", ids.card), archived);

    assert!(list.fetch_cards(&s, FetchOptions::shallow()).await.unwrap().is_empty());
    assert!(cards[0].closed());
    assert!(s.evict::<Card>(&ids.card));
    let reread: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();
    assert!(reread.closed());
    assert_eq!(t.count(HttpMethod::Get, &listing), 2);
    assert_eq!(t.count(HttpMethod::Get, &format!("cards/{}", ids.card)), 1);
}

// --- refresh and conflicts ---

#[tokio::test]
async fn refresh_applies_remote_changes() {
    let (t, ids) = launch_board();
    let s = session(&t);
    let list: List = s.get(&ids.list, FetchOptions::shallow()).await.unwrap();

    t.get(
        &format!("lists/{}", ids.list),
        json!({"id": ids.list, "name": "Backlog", "closed": false, "idBoard": ids.board, "pos": 16384}),
    );
    s.refresh(&list, FetchOptions::shallow()).await.unwrap();

    assert_eq!(list.name().as_deref(), Some("Backlog"));
    assert_eq!(t.count(HttpMethod::Get, &format!("lists/{}", ids.list)), 2);
}

#[tokio::test]
async fn refresh_over_unsaved_edit_reports_conflict() {
    let (t, ids) = launch_board();
    let s = session(&t);
    let card: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();
    card.set_name("Mine").unwrap();

    let mut remote = card_json(&ids);
    remote["name"] = json!("Theirs");
    remote["desc"] = json!("Updated remotely");
    t.get(&format!("cards/{}", ids.card), remote);

    let conflicts = match s.refresh(&card, FetchOptions::shallow()).await {
        Err(ApiError::Conflict(conflicts)) => conflicts,
        other => panic!("expected a conflict, got {other:?}"),
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].field, "name");
    assert_eq!(conflicts[0].local, json!("Mine"));
    assert_eq!(conflicts[0].remote, json!("Theirs"));

    assert_eq!(card.name().as_deref(), Some("Mine"));
    assert_eq!(card.desc().as_deref(), Some("Updated remotely"));
    assert!(card.is_dirty());
}

// --- inflation ---

#[tokio::test]
async fn shallow_fetch_issues_exactly_one_request() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let card: Card = s.get(&ids.card, FetchOptions::shallow()).await.unwrap();

    assert_eq!(t.total(), 1);
    assert_eq!(card.list(), None);
    assert_eq!(card.get("idList"), Some(json!(ids.list)));
}

#[tokio::test]
async fn cycles_terminate_and_stay_connected() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let org: Organization = s.get(&ids.org, FetchOptions::default()).await.unwrap();

    let boards = org.boards();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].organization(), Some(org.clone()));
    assert_eq!(t.count(HttpMethod::Get, &format!("organizations/{}", ids.org)), 1);
    assert_eq!(t.count(HttpMethod::Get, &format!("boards/{}", ids.board)), 1);
}

#[tokio::test]
async fn node_reached_at_two_depths_follows_the_shorter_path() {
    let (t, ids) = launch_board();
    t.delay(&format!("boards/{}", ids.board), Duration::from_millis(20));
    let s = session(&t);

    // The board is one hop from the card directly and two hops via the list.
    let card: Card = s.get(&ids.card, FetchOptions::default().with_max_depth(2)).await.unwrap();

    let board = card.board().unwrap();
    assert_eq!(card.list().and_then(|l| l.board()), Some(board.clone()));
    assert_eq!(board.organization().map(|o| o.id().to_string()), Some(ids.org.clone()));
    assert_eq!(t.count(HttpMethod::Get, &format!("organizations/{}", ids.org)), 1);
    assert_eq!(t.count(HttpMethod::Get, &format!("boards/{}", ids.board)), 1);
}

#[tokio::test]
async fn short_link_fetch_inflates_direct_relations() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let card: Card = s.get("o3SKtC9v", FetchOptions::default().with_max_depth(1)).await.unwrap();

    assert_eq!(card.id().as_str(), ids.card);
    assert_eq!(card.list().map(|l| json!(l.id().as_str())), card.get("idList"));
    assert_eq!(card.list().and_then(|l| l.name()).as_deref(), Some("To Do"));
    assert_eq!(card.board().and_then(|b| b.name()).as_deref(), Some("Launch"));
    assert_eq!(card.checklists().len(), 1);
    assert_eq!(card.checklists()[0].check_items().len(), 2);
    assert_eq!(card.label_colors(), vec!["green".to_string(), "red".to_string()]);
    assert_eq!(card.labels().len(), 2);

    let mut paths: Vec<_> = t.requests().into_iter().map(|r| r.path).collect();
    paths.sort();
    let mut expected = vec![
        "cards/o3SKtC9v".to_string(),
        format!("lists/{}", ids.list),
        format!("boards/{}", ids.board),
        format!("checklists/{}", ids.checklist),
    ];
    expected.sort();
    assert_eq!(paths, expected);
}

#[tokio::test]
async fn embedded_labels_are_not_fetched_again() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let card: Card = s.get(&ids.card, FetchOptions::default()).await.unwrap();

    assert_eq!(card.labels().len(), 2);
    assert_eq!(t.count(HttpMethod::Get, &format!("labels/{}", ids.green)), 0);
    assert_eq!(t.count(HttpMethod::Get, &format!("labels/{}", ids.red)), 0);
}

#[tokio::test]
async fn moving_a_card_relinks_on_save() {
    let (t, ids) = launch_board();
    let done = hex_id(10);
    t.get(
        &format!("lists/{done}"),
        json!({"id": done, "name": "Done", "closed": false, "idBoard": ids.board}),
    );
    let mut moved = card_json(&ids);
    moved["idList"] = json!(done);
    t.put_echo(&format!("cards/{}", ids.card), moved);
    let s = session(&t);

    let card: Card = s.get(&ids.card, FetchOptions::default()).await.unwrap();
    let target: List = s.get(&done, FetchOptions::shallow()).await.unwrap();
    card.move_to(&target).unwrap();
    assert_eq!(card.get("idList"), Some(json!(done)));
    assert_eq!(card.list(), Some(target.clone()));

    s.save(&card).await.unwrap();
    assert!(!card.is_dirty());
    assert_eq!(card.list(), Some(target));
}

// --- get_many / get_all ---

#[tokio::test]
async fn get_many_keeps_input_order_under_latency_skew() {
    let (t, ids) = launch_board();
    t.delay(&format!("labels/{}", ids.green), Duration::from_millis(80));
    let s = session(&t);

    let labels: Vec<Label> = s
        .get_many(&[&ids.green, &ids.red], FetchOptions::shallow())
        .await
        .unwrap();

    let order: Vec<_> = labels.iter().map(|l| l.id().as_str().to_string()).collect();
    assert_eq!(order, vec![ids.green.clone(), ids.red.clone()]);

    let completed: Vec<_> = t.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(completed[0], format!("labels/{}", ids.red));
}

#[tokio::test]
async fn concurrent_requests_for_one_id_share_a_fetch() {
    let (t, ids) = launch_board();
    t.delay(&format!("lists/{}", ids.list), Duration::from_millis(30));
    let s = session(&t);

    let lists: Vec<List> = s
        .get_many(&[&ids.list, &ids.list], FetchOptions::shallow())
        .await
        .unwrap();

    assert_eq!(lists[0], lists[1]);
    assert_eq!(t.count(HttpMethod::Get, &format!("lists/{}", ids.list)), 1);
}

#[tokio::test]
async fn failed_load_is_retried_on_the_next_get() {
    let (t, ids) = launch_board();
    let path = format!("lists/{}", ids.list);
    t.respond(HttpMethod::Get, &path, 503, "unavailable");
    let s = session(&t);

    let err = s.get::<List>(&ids.list, FetchOptions::shallow()).await.unwrap_err();
    assert!(matches!(err, ApiError::Remote { status: 503, .. }));

    t.get(&path, json!({"id": ids.list, "name": "To Do", "idBoard": ids.board}));
    let list: List = s.get(&ids.list, FetchOptions::shallow()).await.unwrap();
    assert!(list.is_loaded());
    assert_eq!(t.count(HttpMethod::Get, &path), 2);
}

#[tokio::test]
async fn get_many_reports_a_missing_id() {
    let (t, ids) = launch_board();
    let s = session(&t);
    let missing = hex_id(99);

    let err = s
        .get_many::<List>(&[&ids.list, &missing], FetchOptions::shallow())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    let list = s.identity().get(ResourceKind::List, &ids.list.as_str().into()).unwrap();
    assert!(list.is_loaded());
}

#[tokio::test]
async fn get_all_registers_listed_objects() {
    let (t, ids) = launch_board();
    t.get(
        &format!("boards/{}/lists", ids.board),
        json!([
            {"id": ids.list, "name": "To Do", "closed": false, "pos": 1},
            {"id": hex_id(10), "name": "Done", "closed": false, "pos": 2}
        ]),
    );
    let s = session(&t);

    let lists: Vec<List> = s
        .get_all(Scope::Board(ids.board.as_str().into()), FetchOptions::shallow())
        .await
        .unwrap();
    let again: List = s.get(&ids.list, FetchOptions::shallow()).await.unwrap();

    assert_eq!(lists.len(), 2);
    assert_eq!(lists[0], again);
    assert_eq!(again.get("idBoard"), Some(json!(ids.board)));
    assert_eq!(t.total(), 1);
}

#[tokio::test]
async fn check_items_cannot_be_listed_per_board() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let err = s
        .get_all::<CheckItem>(Scope::Board(ids.board.as_str().into()), FetchOptions::shallow())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unsupported { .. }));
    assert_eq!(t.total(), 0);
}

// --- create and delete ---

#[tokio::test]
async fn create_rejects_missing_required_fields_locally() {
    let (t, _) = launch_board();
    let s = session(&t);

    let err = s
        .create::<List>(attributes(json!({"name": "Orphan"})))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidValue { ref field, .. } if field == "idBoard"));
    assert_eq!(t.total(), 0);
}

#[tokio::test]
async fn create_registers_the_returned_object() {
    let (t, ids) = launch_board();
    let new_id = hex_id(11);
    t.respond(
        HttpMethod::Post,
        "labels",
        200,
        &json!({"id": new_id, "idBoard": ids.board, "color": "blue", "name": "infra"}).to_string(),
    );
    let s = session(&t);

    let label: Label = s
        .create(attributes(json!({"idBoard": ids.board, "color": "blue", "name": "infra"})))
        .await
        .unwrap();
    let again: Label = s.get(&new_id, FetchOptions::shallow()).await.unwrap();

    assert_eq!(label, again);
    assert!(!label.is_dirty());
    assert_eq!(t.count(HttpMethod::Get, &format!("labels/{new_id}")), 0);
}

#[tokio::test]
async fn boards_cannot_be_deleted() {
    let (t, ids) = launch_board();
    let s = session(&t);
    let board: Board = s.get(&ids.board, FetchOptions::shallow()).await.unwrap();
    t.reset_log();

    let err = s.delete(&board).await.unwrap_err();

    assert!(matches!(err, ApiError::Unsupported { kind: ResourceKind::Board, .. }));
    assert_eq!(t.total(), 0);
}

#[tokio::test]
async fn delete_evicts_from_the_identity_map() {
    let (t, ids) = launch_board();
    t.respond(HttpMethod::Delete, &format!("labels/{}", ids.red), 200, r#"{"_value":null}"#);
    let s = session(&t);
    let label: Label = s.get(&ids.red, FetchOptions::shallow()).await.unwrap();

    s.delete(&label).await.unwrap();

    assert!(!s.identity().contains(ResourceKind::Label, label.id()));
}

#[tokio::test]
async fn unbounded_rate_limit_is_accepted() {
    let (t, ids) = launch_board();
    let client = TrelloClient::with_transport(config().with_rate_limit(usize::MAX, Duration::from_secs(1)), t.clone())
        .unwrap();
    let s = Session::new(client);

    let list: List = s.get(&ids.list, FetchOptions::shallow()).await.unwrap();

    assert_eq!(list.name().as_deref(), Some("To Do"));
}

#[tokio::test]
async fn invalid_website_is_rejected_before_saving() {
    let (t, ids) = launch_board();
    let s = session(&t);
    let org: Organization = s.get(&ids.org, FetchOptions::shallow()).await.unwrap();

    assert!(org.set_website("ftp://example.com").is_err());
    assert!(!org.is_dirty());
}

// --- blocking bridge ---

#[test]
fn blocking_twins_share_the_identity_map() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let card: Card = s.get_blocking(&ids.card, FetchOptions::default()).unwrap();
    let list: List = s.get_blocking(&ids.list, FetchOptions::shallow()).unwrap();

    assert_eq!(card.list(), Some(list));
    assert_eq!(t.count(HttpMethod::Get, &format!("lists/{}", ids.list)), 1);
}

#[tokio::test]
async fn blocking_twin_inside_a_runtime_is_refused() {
    let (t, ids) = launch_board();
    let s = session(&t);

    let err = s.get_blocking::<Card>(&ids.card, FetchOptions::shallow()).unwrap_err();

    assert!(matches!(err, ApiError::BlockingInAsyncContext));
    assert_eq!(t.total(), 0);
}
