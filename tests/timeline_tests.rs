use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use reply_guy::browser::document::{Document, ItemNode, Marker};
use reply_guy::browser::watcher::spawn_list_watcher;
use reply_guy::bulk::session::{Activity, SessionState};
use reply_guy::timeline::eligibility::{Eligibility, is_eligible};
use reply_guy::timeline::item::ItemId;
use reply_guy::timeline::locator::locate_items;

use crate::common::page::{FakePage, handle, post, promoted};

mod common;

// ============================================================================
// Locating items on a page
// ============================================================================

#[test]
fn locate_reads_ids_references_and_handles() {
    let page = FakePage::new(vec![post("11", "alice"), post("12", "bob")]);

    let items = locate_items(&page);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, ItemId::new("11"));
    assert_eq!(
        items[0].reference.as_ref().map(|r| r.as_str()),
        Some("https://x.com/alice/status/11")
    );
    assert_eq!(items[1].element, handle("12"));
}

#[test]
fn nodes_without_any_id_are_skipped() {
    let anonymous = ItemNode {
        handle: handle("x"),
        text: "who am I".into(),
        ..ItemNode::default()
    };
    let page = FakePage::new(vec![anonymous, post("5", "alice")]);

    let ids: Vec<_> = locate_items(&page).into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![ItemId::new("5")]);
}

#[test]
fn detached_nodes_are_not_located() {
    let page = FakePage::new(vec![post("1", "alice"), post("2", "alice")]);
    page.detach("1");

    let items = locate_items(&page);
    assert_eq!(items.len(), 1);
    assert!(!page.is_attached(&handle("1")));
}

// ============================================================================
// Eligibility against session state
// ============================================================================

#[test]
fn eligibility_reasons_follow_session_state() {
    let page = FakePage::new(vec![post("1", "alice"), post("2", "me"), promoted("3", "brand")]);
    page.set_marker(&handle("1"), Marker::Processing);
    let items = locate_items(&page);

    let mut session = SessionState::begin(Instant::now());
    assert_eq!(is_eligible(&items[0], &session, Some("me")), Eligibility::Ineligible("in_progress"));
    assert_eq!(is_eligible(&items[1], &session, Some("me")), Eligibility::Ineligible("self_authored"));
    assert_eq!(is_eligible(&items[2], &session, Some("me")), Eligibility::Ineligible("promoted"));

    // Unknown identity skips the self-authored check only
    assert_eq!(is_eligible(&items[1], &session, None), Eligibility::Eligible);

    session.handled.insert(ItemId::new("2"));
    assert_eq!(is_eligible(&items[1], &session, None), Eligibility::Ineligible("already_handled"));
}

#[test]
fn item_in_flight_is_ineligible_even_without_its_marker() {
    // Same post re-rendered under a fresh handle, so no Processing marker
    let rerendered = ItemNode {
        handle: reply_guy::browser::document::ElementHandle::new("h1-rerendered"),
        ..post("1", "alice")
    };
    let page = FakePage::new(vec![rerendered]);
    let items = locate_items(&page);

    let mut session = SessionState::begin(Instant::now());
    assert_eq!(is_eligible(&items[0], &session, None), Eligibility::Eligible);

    session.activity = Activity::Processing {
        id: ItemId::new("1"),
        since: Instant::now(),
    };
    assert_eq!(is_eligible(&items[0], &session, None), Eligibility::Ineligible("in_progress"));
}

#[test]
fn populate_is_idempotent() {
    let page = FakePage::new(vec![post("1", "alice"), post("2", "bob")]);
    let mut session = SessionState::begin(Instant::now());

    assert_eq!(session.populate(&page, None), 2);
    assert_eq!(session.populate(&page, None), 0);
    assert_eq!(session.queue.len(), 2);
}

// ============================================================================
// List watcher
// ============================================================================

#[tokio::test(start_paused = true)]
async fn watcher_notifies_on_new_items() {
    let page = Arc::new(FakePage::new(vec![post("1", "alice")]));
    let document: Arc<dyn Document> = page.clone();
    let (mut changes, task) = spawn_list_watcher(document, Duration::from_millis(200));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(changes.try_recv().is_err());

    page.push(post("2", "bob"));
    let notified = tokio::time::timeout(Duration::from_secs(1), changes.recv()).await;
    assert_eq!(notified.unwrap(), Some(()));

    drop(changes);
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
}
