use std::sync::Arc;

use reply_guy::browser::document::{Document, ItemNode, ScrollRegion};
use reply_guy::bulk::viewport::{Pace, ViewportConfig, ViewportLoader, locate_scroll_region};

use crate::common::page::{FakePage, post};

mod common;

fn posts(n: usize) -> Vec<ItemNode> {
    (1..=n).map(|i| post(&i.to_string(), "alice")).collect()
}

// ============================================================================
// Scroll region
// ============================================================================

#[test]
fn region_prefers_labeled_timeline() {
    let page = FakePage::new(posts(1));
    page.add_region(ScrollRegion::Main);
    page.add_region(ScrollRegion::Labeled);
    assert_eq!(locate_scroll_region(&page), ScrollRegion::Labeled);
}

#[test]
fn region_falls_back_to_main_then_document() {
    let page = FakePage::new(posts(1));
    assert_eq!(locate_scroll_region(&page), ScrollRegion::Document);

    page.add_region(ScrollRegion::Main);
    assert_eq!(locate_scroll_region(&page), ScrollRegion::Main);
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test(start_paused = true)]
async fn loads_hidden_items() {
    let page = FakePage::with_hidden(posts(6), 2, 2);
    let loader = ViewportLoader::default();

    assert!(loader.ensure_more_items(&page).await);
    assert!(page.item_count() > 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_page_returns_false_within_bounds() {
    let page = FakePage::new(posts(3));
    let loader = ViewportLoader::default();

    assert!(!loader.ensure_more_items(&page).await);
    assert_eq!(page.item_count(), 3);

    // Two passes, each at most one initial check plus the attempt limit
    let limit = 2 * (ViewportConfig::default().max_scroll_attempts + 1);
    assert!(page.scroll_calls() <= limit);
}

#[tokio::test(start_paused = true)]
async fn pass_stops_when_scrolling_no_longer_moves() {
    let page = FakePage::new(posts(2));
    let loader = ViewportLoader::default();

    let pass = loader.scroll_pass(&page, ScrollRegion::Document, Pace::Polite).await;
    assert!(pass.reached_end);
    assert!(pass.attempts < ViewportConfig::default().max_scroll_attempts);
    assert_eq!(pass.distance, 600.0);
}

#[tokio::test(start_paused = true)]
async fn pass_stops_after_max_distance() {
    // Plenty of hidden content: the distance limit ends the pass
    let page = FakePage::with_hidden(posts(200), 10, 10);
    let loader = ViewportLoader::default();

    let pass = loader.scroll_pass(&page, ScrollRegion::Document, Pace::Aggressive).await;
    assert!(!pass.reached_end);
    assert!(pass.distance > 900.0 * 3.0);
    assert!(pass.attempts <= ViewportConfig::default().max_scroll_attempts);
}

#[tokio::test(start_paused = true)]
async fn attempts_are_capped() {
    let page = FakePage::with_hidden(posts(500), 10, 50);
    let config = ViewportConfig {
        max_viewports: 1_000.0,
        max_scroll_attempts: 4,
        ..ViewportConfig::default()
    };
    let loader = ViewportLoader::new(config);

    let pass = loader.scroll_pass(&page, ScrollRegion::Document, Pace::Polite).await;
    assert_eq!(pass.attempts, 4);
    assert!(!pass.reached_end);
}

#[tokio::test(start_paused = true)]
async fn loader_is_shareable_across_tasks() {
    let page: Arc<dyn Document> = Arc::new(FakePage::with_hidden(posts(4), 1, 1));
    let loader = Arc::new(ViewportLoader::default());

    let task = {
        let page = Arc::clone(&page);
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.ensure_more_items(page.as_ref()).await })
    };
    assert!(task.await.unwrap());
}
