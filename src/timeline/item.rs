use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::browser::document::{ElementHandle, ItemNode};

pub const CANONICAL_ORIGIN: &str = "https://x.com";

static STATUS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://(?:www\.|mobile\.)?(?:x|twitter)\.com)?/([A-Za-z0-9_]{1,15})/status/(\d+)")
        .expect("status url pattern is valid")
});

/// Stable post identifier (the numeric status id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical `https://x.com/<handle>/status/<id>` locator for a post.
///
/// Only constructible through [`StatusReference::parse`], so holding one
/// means the fetch collaborator will accept it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StatusReference {
    url: String,
}

impl StatusReference {
    /// Parse an absolute or site-relative status link.
    ///
    /// Accepts x.com and twitter.com hosts, normalizes to x.com and drops
    /// trailing segments such as `/photo/1` or `/analytics`.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = STATUS_URL.captures(raw.trim())?;
        Some(Self {
            url: format!("{}/{}/status/{}", CANONICAL_ORIGIN, &caps[1], &caps[2]),
        })
    }

    /// Build from a known author handle and status id.
    pub fn from_parts(handle: &str, id: &ItemId) -> Option<Self> {
        Self::parse(&format!("/{}/status/{}", handle.trim_start_matches('@'), id))
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn status_id(&self) -> ItemId {
        ItemId::new(self.url.rsplit('/').next().unwrap_or_default())
    }

    pub fn author(&self) -> &str {
        self.url
            .trim_start_matches(CANONICAL_ORIGIN)
            .split('/')
            .nth(1)
            .unwrap_or_default()
    }
}

impl fmt::Display for StatusReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// A discovered timeline post.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    /// `None` when no status link could be derived; such items never queue.
    pub reference: Option<StatusReference>,
    pub element: ElementHandle,
    pub discovered_at: Instant,
    /// Node snapshot taken at discovery; markers and author data may be stale.
    pub node: ItemNode,
}
