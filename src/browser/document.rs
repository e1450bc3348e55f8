use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque token the page assigns to a rendered timeline node.
///
/// A handle never keeps the node alive: the host page virtualizes its list
/// and may drop the node at any time, so callers re-check it with
/// [`Document::is_attached`] before acting on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Visual markers painted on a timeline node while bulk mode works on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Processing,
    Completed,
    Failed,
}

/// Scrollable containers, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollRegion {
    /// The timeline's own labeled region.
    Labeled,
    /// The page's generic main region.
    Main,
    /// The whole document.
    Document,
}

impl ScrollRegion {
    pub const FALLBACK_ORDER: [ScrollRegion; 3] =
        [ScrollRegion::Labeled, ScrollRegion::Main, ScrollRegion::Document];
}

/// Raw snapshot of one rendered timeline node, as read from the page.
///
/// Every field is optional or defaulted: the page's markup changes without
/// notice and a missing attribute must read as "absent", never as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNode {
    pub handle: ElementHandle,

    /// Identifier-bearing attribute of the cell container, if any.
    #[serde(default)]
    pub container_id: Option<String>,

    /// `href` of the link wrapping the post's timestamp.
    #[serde(default)]
    pub time_href: Option<String>,

    /// Every `href` inside the node that contains `/status/`.
    #[serde(default)]
    pub status_hrefs: Vec<String>,

    /// `href`s of the author name block links.
    #[serde(default)]
    pub author_hrefs: Vec<String>,

    /// Short label next to the author, e.g. "You" on the account's own posts.
    #[serde(default)]
    pub author_label: Option<String>,

    /// Visible `@handle` strings inside the author block.
    #[serde(default)]
    pub handle_texts: Vec<String>,

    /// Full visible text content of the node.
    #[serde(default)]
    pub text: String,

    /// Social-context banner above the post ("Promoted", "X reposted", ...).
    #[serde(default)]
    pub social_context: Option<String>,

    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl ItemNode {
    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }
}

/// Read/act access to the live timeline page.
///
/// Methods are synchronous and infallible on purpose: the page is mutated
/// externally and anything that cannot be found reads as empty, `None` or
/// `false`. Implementations log their own transport problems.
pub trait Document: Send + Sync {
    /// Currently rendered timeline nodes, in render order.
    fn item_nodes(&self) -> Vec<ItemNode>;

    fn item_count(&self) -> usize {
        self.item_nodes().len()
    }

    fn is_attached(&self, handle: &ElementHandle) -> bool;

    fn set_marker(&self, handle: &ElementHandle, marker: Marker);

    fn clear_marker(&self, handle: &ElementHandle, marker: Marker);

    /// Remove `marker` from every node that carries it.
    fn clear_all_markers(&self, marker: Marker);

    /// Handle (without `@`) of the logged-in account, if the page shows it.
    fn operating_handle(&self) -> Option<String>;

    fn has_region(&self, region: ScrollRegion) -> bool;

    /// Scroll `region` by `dy` pixels and return its new scroll offset.
    fn scroll_by(&self, region: ScrollRegion, dy: f64) -> Option<f64>;

    fn viewport_height(&self) -> f64;

    /// Click the reply affordance scoped to one node.
    fn open_reply(&self, handle: &ElementHandle) -> bool;

    fn compose_ready(&self) -> bool;

    fn insert_reply_text(&self, text: &str) -> bool;

    fn submit_ready(&self) -> bool;

    fn click_submit(&self) -> bool;
}
