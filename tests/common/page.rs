use std::collections::HashSet;
use std::sync::Mutex;

use reply_guy::browser::document::{Document, ElementHandle, ItemNode, Marker, ScrollRegion};

pub const ROW_HEIGHT: f64 = 300.0;
pub const VIEWPORT: f64 = 900.0;

/// A timeline post as the page would render it.
pub fn post(id: &str, author: &str) -> ItemNode {
    let status = format!("/{}/status/{}", author, id);
    ItemNode {
        handle: ElementHandle::new(format!("h{}", id)),
        container_id: None,
        time_href: Some(status.clone()),
        status_hrefs: vec![status],
        author_hrefs: vec![format!("/{}", author)],
        author_label: None,
        handle_texts: vec![format!("@{}", author)],
        text: format!("{}\n@{}\npost number {}", author, author, id),
        social_context: None,
        markers: Vec::new(),
    }
}

pub fn promoted(id: &str, author: &str) -> ItemNode {
    let mut node = post(id, author);
    node.text = format!("{}\nbuy our stuff\nPromoted", author);
    node
}

pub fn handle(id: &str) -> ElementHandle {
    ElementHandle::new(format!("h{}", id))
}

#[derive(Default)]
struct PageState {
    nodes: Vec<ItemNode>,
    rendered: usize,
    batch: usize,
    detached: HashSet<ElementHandle>,
    identity: Option<String>,
    regions: HashSet<ScrollRegion>,
    offset: f64,
    scroll_calls: u32,
    cleared_all: Vec<Marker>,
    reply_button: bool,
    compose_open: bool,
    compose_polls: u32,
    compose_ready_after: Option<u32>,
    accept_insert: bool,
    submit_ready: bool,
    inserted: Vec<String>,
    submitted: u32,
}

/// In-memory timeline page.
///
/// `rendered` nodes are visible; the rest appear `batch` at a time whenever a
/// scroll actually moves. The scrollable height follows the rendered count.
pub struct FakePage {
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new(nodes: Vec<ItemNode>) -> Self {
        let rendered = nodes.len();
        Self::with_hidden(nodes, rendered, 0)
    }

    /// Only the first `rendered` nodes are visible until scrolled.
    pub fn with_hidden(nodes: Vec<ItemNode>, rendered: usize, batch: usize) -> Self {
        Self {
            state: Mutex::new(PageState {
                rendered: rendered.min(nodes.len()),
                nodes,
                batch,
                reply_button: true,
                compose_ready_after: Some(0),
                accept_insert: true,
                submit_ready: true,
                ..PageState::default()
            }),
        }
    }

    pub fn set_identity(&self, handle: &str) {
        self.state.lock().unwrap().identity = Some(handle.to_string());
    }

    pub fn add_region(&self, region: ScrollRegion) {
        self.state.lock().unwrap().regions.insert(region);
    }

    pub fn detach(&self, id: &str) {
        self.state.lock().unwrap().detached.insert(handle(id));
    }

    /// Append a freshly rendered node.
    pub fn push(&self, node: ItemNode) {
        let mut state = self.state.lock().unwrap();
        state.nodes.push(node);
        state.rendered += 1;
    }

    pub fn markers(&self, id: &str) -> Vec<Marker> {
        let state = self.state.lock().unwrap();
        state
            .nodes
            .iter()
            .find(|n| n.handle == handle(id))
            .map(|n| n.markers.clone())
            .unwrap_or_default()
    }

    pub fn cleared_all(&self) -> Vec<Marker> {
        self.state.lock().unwrap().cleared_all.clone()
    }

    pub fn scroll_calls(&self) -> u32 {
        self.state.lock().unwrap().scroll_calls
    }

    pub fn rendered(&self) -> usize {
        self.state.lock().unwrap().rendered
    }

    pub fn set_reply_button(&self, present: bool) {
        self.state.lock().unwrap().reply_button = present;
    }

    /// `None`: the composer never shows up.
    pub fn set_compose_ready_after(&self, polls: Option<u32>) {
        self.state.lock().unwrap().compose_ready_after = polls;
    }

    pub fn set_submit_ready(&self, ready: bool) {
        self.state.lock().unwrap().submit_ready = ready;
    }

    pub fn inserted(&self) -> Vec<String> {
        self.state.lock().unwrap().inserted.clone()
    }

    pub fn submitted(&self) -> u32 {
        self.state.lock().unwrap().submitted
    }

    pub fn is_compose_open(&self) -> bool {
        self.state.lock().unwrap().compose_open
    }
}

impl PageState {
    fn visible(&self) -> impl Iterator<Item = &ItemNode> {
        self.nodes
            .iter()
            .take(self.rendered)
            .filter(|n| !self.detached.contains(&n.handle))
    }

    fn node_mut(&mut self, handle: &ElementHandle) -> Option<&mut ItemNode> {
        let rendered = self.rendered;
        self.nodes.iter_mut().take(rendered).find(|n| &n.handle == handle)
    }

    fn max_offset(&self) -> f64 {
        self.rendered as f64 * ROW_HEIGHT
    }
}

impl Document for FakePage {
    fn item_nodes(&self) -> Vec<ItemNode> {
        self.state.lock().unwrap().visible().cloned().collect()
    }

    fn is_attached(&self, handle: &ElementHandle) -> bool {
        self.state.lock().unwrap().visible().any(|n| &n.handle == handle)
    }

    fn set_marker(&self, handle: &ElementHandle, marker: Marker) {
        let mut state = self.state.lock().unwrap();
        if let Some(node) = state.node_mut(handle) {
            if !node.markers.contains(&marker) {
                node.markers.push(marker);
            }
        }
    }

    fn clear_marker(&self, handle: &ElementHandle, marker: Marker) {
        let mut state = self.state.lock().unwrap();
        if let Some(node) = state.node_mut(handle) {
            node.markers.retain(|m| *m != marker);
        }
    }

    fn clear_all_markers(&self, marker: Marker) {
        let mut state = self.state.lock().unwrap();
        state.cleared_all.push(marker);
        for node in state.nodes.iter_mut() {
            node.markers.retain(|m| *m != marker);
        }
    }

    fn operating_handle(&self) -> Option<String> {
        self.state.lock().unwrap().identity.clone()
    }

    fn has_region(&self, region: ScrollRegion) -> bool {
        self.state.lock().unwrap().regions.contains(&region)
    }

    fn scroll_by(&self, _region: ScrollRegion, dy: f64) -> Option<f64> {
        let mut state = self.state.lock().unwrap();
        state.scroll_calls += 1;

        let next = (state.offset + dy).clamp(0.0, state.max_offset());
        if next > state.offset && state.rendered < state.nodes.len() {
            state.rendered = (state.rendered + state.batch).min(state.nodes.len());
        }
        state.offset = next;
        Some(next)
    }

    fn viewport_height(&self) -> f64 {
        VIEWPORT
    }

    fn open_reply(&self, handle: &ElementHandle) -> bool {
        let mut state = self.state.lock().unwrap();
        let found = state.visible().any(|n| &n.handle == handle);
        if found && state.reply_button {
            state.compose_open = true;
            state.compose_polls = 0;
            true
        } else {
            false
        }
    }

    fn compose_ready(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.compose_open {
            return false;
        }
        state.compose_polls += 1;
        match state.compose_ready_after {
            Some(after) => state.compose_polls > after,
            None => false,
        }
    }

    fn insert_reply_text(&self, text: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.accept_insert {
            return false;
        }
        state.inserted.push(text.to_string());
        true
    }

    fn submit_ready(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.compose_open && state.submit_ready
    }

    fn click_submit(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.compose_open {
            return false;
        }
        state.compose_open = false;
        state.submitted += 1;
        true
    }
}
