use crate::browser::document::{ItemNode, Marker};
use crate::bulk::session::SessionState;
use crate::timeline::item::Item;
use crate::timeline::locator::extract_author;

/// Whole-line text indicators of a promoted post.
pub const PROMOTED_LINES: [&str; 3] = ["Promoted", "Ad", "Sponsored"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(&'static str),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Decide whether a discovered item may enter the work queue.
///
/// `identity` is the operating account's handle. When it is unknown the
/// self-authored check is skipped rather than excluding everything.
pub fn is_eligible(item: &Item, session: &SessionState, identity: Option<&str>) -> Eligibility {
    let node = &item.node;

    if session.handled.contains(&item.id) {
        return Eligibility::Ineligible("already_handled");
    }

    if session.queue.contains(&item.id) {
        return Eligibility::Ineligible("already_queued");
    }

    // A re-rendered node carries a new handle and no marker
    if session.activity.is_processing(&item.id) || node.has_marker(Marker::Processing) {
        return Eligibility::Ineligible("in_progress");
    }

    if item.reference.is_none() {
        return Eligibility::Ineligible("no_reference");
    }

    if let Some(identity) = identity {
        if is_self_authored(node, identity) {
            return Eligibility::Ineligible("self_authored");
        }
    }

    if is_promoted(node) {
        return Eligibility::Ineligible("promoted");
    }

    Eligibility::Eligible
}

/// Author-link path, "You" label, or exact `@handle` text.
pub fn is_self_authored(node: &ItemNode, identity: &str) -> bool {
    let identity = identity.trim_start_matches('@');
    if identity.is_empty() {
        return false;
    }

    if extract_author(node).is_some_and(|author| author.eq_ignore_ascii_case(identity)) {
        return true;
    }

    if node
        .author_label
        .as_deref()
        .is_some_and(|label| label.trim() == "You")
    {
        return true;
    }

    node.handle_texts.iter().any(|text| {
        text.trim()
            .strip_prefix('@')
            .is_some_and(|handle| handle.eq_ignore_ascii_case(identity))
    })
}

pub fn is_promoted(node: &ItemNode) -> bool {
    let line_match = node.text.lines().map(str::trim).any(|line| {
        PROMOTED_LINES.contains(&line) || line.starts_with("Promoted by")
    });
    if line_match {
        return true;
    }

    node.social_context.as_deref().is_some_and(|context| {
        context
            .split_whitespace()
            .any(|word| word == "Promoted" || word == "Ad")
    })
}
