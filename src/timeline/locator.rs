use std::sync::LazyLock;

use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::browser::document::{Document, ItemNode};
use crate::timeline::item::{Item, ItemId, StatusReference};

static CONTAINER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{15,})").expect("container id pattern is valid"));

static STATUS_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/status/(\d+)").expect("status segment pattern is valid"));

/// Read every currently rendered post from the page.
///
/// Re-run on demand, nothing is cached. Nodes whose structure is not
/// recognized are skipped, so the result may be shorter than what is
/// visually present.
pub fn locate_items(document: &dyn Document) -> Vec<Item> {
    let nodes = document.item_nodes();
    let now = Instant::now();

    let items: Vec<Item> = nodes
        .iter()
        .filter_map(|node| item_from_node(node, now))
        .collect();

    debug!(nodes = nodes.len(), items = items.len(), "located timeline items");
    items
}

/// Build an [`Item`] from one node, or `None` when no stable id is present.
pub fn item_from_node(node: &ItemNode, discovered_at: Instant) -> Option<Item> {
    let Some(id) = extract_item_id(node) else {
        trace!(handle = %node.handle, "no stable id, skipping node");
        return None;
    };

    let reference = extract_reference(node, &id);

    Some(Item {
        id,
        reference,
        element: node.handle.clone(),
        discovered_at,
        node: node.clone(),
    })
}

/// Container attribute first, then the first status link in the node.
pub fn extract_item_id(node: &ItemNode) -> Option<ItemId> {
    if let Some(attr) = &node.container_id {
        if let Some(caps) = CONTAINER_ID.captures(attr) {
            return Some(ItemId::new(&caps[1]));
        }
    }

    node.time_href
        .iter()
        .chain(node.status_hrefs.iter())
        .find_map(|href| STATUS_SEGMENT.captures(href))
        .map(|caps| ItemId::new(&caps[1]))
}

/// Timestamp link, then any status link, then id + author handle.
pub fn extract_reference(node: &ItemNode, id: &ItemId) -> Option<StatusReference> {
    if let Some(reference) = node.time_href.as_deref().and_then(StatusReference::parse) {
        return Some(reference);
    }

    if let Some(reference) = node
        .status_hrefs
        .iter()
        .find_map(|href| StatusReference::parse(href))
    {
        return Some(reference);
    }

    extract_author(node).and_then(|author| StatusReference::from_parts(&author, id))
}

/// First author-block link that looks like a profile path.
pub fn extract_author(node: &ItemNode) -> Option<String> {
    node.author_hrefs.iter().find_map(|href| {
        let path = href
            .trim_start_matches("https://x.com")
            .trim_start_matches("https://twitter.com");
        let segment = path.strip_prefix('/')?.split('/').next()?;
        if segment.is_empty() || segment.contains("status") {
            None
        } else {
            Some(segment.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::document::ElementHandle;

    fn node() -> ItemNode {
        ItemNode {
            handle: ElementHandle::new("n1"),
            ..Default::default()
        }
    }

    #[test]
    fn container_id_wins_over_links() {
        let n = ItemNode {
            container_id: Some("cell-1800000000000000001".into()),
            status_hrefs: vec!["/a/status/42".into()],
            ..node()
        };
        assert_eq!(extract_item_id(&n), Some(ItemId::new("1800000000000000001")));
    }

    #[test]
    fn short_container_digits_fall_back_to_links() {
        let n = ItemNode {
            container_id: Some("cellInnerDiv-12".into()),
            status_hrefs: vec!["/a/status/42/photo/1".into()],
            ..node()
        };
        assert_eq!(extract_item_id(&n), Some(ItemId::new("42")));
    }

    #[test]
    fn reference_constructed_from_author_when_links_are_unusable() {
        let n = ItemNode {
            container_id: Some("1800000000000000001".into()),
            author_hrefs: vec!["/ferris".into()],
            ..node()
        };
        let id = extract_item_id(&n).unwrap();
        let reference = extract_reference(&n, &id).unwrap();
        assert_eq!(reference.as_str(), "https://x.com/ferris/status/1800000000000000001");
    }

    #[test]
    fn node_without_id_is_dropped() {
        let n = ItemNode {
            author_hrefs: vec!["/ferris".into()],
            text: "hello".into(),
            ..node()
        };
        assert!(item_from_node(&n, Instant::now()).is_none());
    }
}
