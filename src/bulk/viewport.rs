use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::browser::document::{Document, ScrollRegion};

/// Tuning for the scroll-driven loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_max_scroll_attempts")]
    pub max_scroll_attempts: u32,

    /// Polite pass: step as a fraction of the viewport height.
    #[serde(default = "default_polite_step")]
    pub polite_step: f64,
    #[serde(default = "default_polite_settle_ms")]
    pub polite_settle_ms: u64,

    /// Escalated pass: larger steps, shorter settles.
    #[serde(default = "default_aggressive_step")]
    pub aggressive_step: f64,
    #[serde(default = "default_aggressive_settle_ms")]
    pub aggressive_settle_ms: u64,

    /// Wait after a scroll sequence before recounting items.
    #[serde(default = "default_final_settle_ms")]
    pub final_settle_ms: u64,

    /// Movement below this many pixels means the end of the content.
    #[serde(default = "default_min_progress_px")]
    pub min_progress_px: f64,

    /// Stop a pass after scrolling this many viewport heights.
    #[serde(default = "default_max_viewports")]
    pub max_viewports: f64,

    /// Used when the page reports a zero viewport height.
    #[serde(default = "default_fallback_viewport_px")]
    pub fallback_viewport_px: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            max_scroll_attempts: default_max_scroll_attempts(),
            polite_step: default_polite_step(),
            polite_settle_ms: default_polite_settle_ms(),
            aggressive_step: default_aggressive_step(),
            aggressive_settle_ms: default_aggressive_settle_ms(),
            final_settle_ms: default_final_settle_ms(),
            min_progress_px: default_min_progress_px(),
            max_viewports: default_max_viewports(),
            fallback_viewport_px: default_fallback_viewport_px(),
        }
    }
}

fn default_max_scroll_attempts() -> u32 { 8 }
fn default_polite_step() -> f64 { 0.8 }
fn default_polite_settle_ms() -> u64 { 500 }
fn default_aggressive_step() -> f64 { 1.6 }
fn default_aggressive_settle_ms() -> u64 { 250 }
fn default_final_settle_ms() -> u64 { 800 }
fn default_min_progress_px() -> f64 { 10.0 }
fn default_max_viewports() -> f64 { 3.0 }
fn default_fallback_viewport_px() -> f64 { 900.0 }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Polite,
    Aggressive,
}

/// Result of one scroll sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPass {
    pub attempts: u32,
    pub distance: f64,
    pub reached_end: bool,
}

/// Makes the host page render more timeline items by scrolling.
#[derive(Debug, Clone, Default)]
pub struct ViewportLoader {
    config: ViewportConfig,
}

impl ViewportLoader {
    pub fn new(config: ViewportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Scroll until new items render. Returns whether the item count grew.
    ///
    /// Runs a polite pass first and escalates to one aggressive pass when
    /// nothing appeared. "No new items" is a normal outcome.
    pub async fn ensure_more_items(&self, document: &dyn Document) -> bool {
        let before = document.item_count();
        let region = locate_scroll_region(document);

        for pace in [Pace::Polite, Pace::Aggressive] {
            let pass = self.scroll_pass(document, region, pace).await;
            sleep(Duration::from_millis(self.config.final_settle_ms)).await;

            let after = document.item_count();
            debug!(?pace, ?region, before, after, attempts = pass.attempts, distance = pass.distance, "scroll pass finished");
            if after > before {
                info!(new_items = after - before, ?pace, "viewport loaded more items");
                return true;
            }
        }

        debug!(before, "no new items after escalation");
        false
    }

    /// One bounded sequence of incremental scroll advances.
    pub async fn scroll_pass(&self, document: &dyn Document, region: ScrollRegion, pace: Pace) -> ScrollPass {
        let viewport = match document.viewport_height() {
            h if h > 0.0 => h,
            _ => self.config.fallback_viewport_px,
        };
        let (step, settle) = match pace {
            Pace::Polite => (self.config.polite_step, self.config.polite_settle_ms),
            Pace::Aggressive => (self.config.aggressive_step, self.config.aggressive_settle_ms),
        };
        let dy = viewport * step;
        let limit = viewport * self.config.max_viewports;

        let mut pass = ScrollPass { attempts: 0, distance: 0.0, reached_end: false };
        // A zero-distance scroll just reports the current offset
        let mut offset = document.scroll_by(region, 0.0).unwrap_or(0.0);

        while pass.attempts < self.config.max_scroll_attempts {
            pass.attempts += 1;

            let Some(next) = document.scroll_by(region, dy) else {
                pass.reached_end = true;
                break;
            };
            sleep(Duration::from_millis(settle)).await;

            let moved = next - offset;
            offset = next;
            pass.distance += moved.max(0.0);

            if moved < self.config.min_progress_px {
                pass.reached_end = true;
                break;
            }
            if pass.distance > limit {
                break;
            }
        }

        pass
    }
}

/// Labeled timeline region, then the main region, then the document.
pub fn locate_scroll_region(document: &dyn Document) -> ScrollRegion {
    ScrollRegion::FALLBACK_ORDER
        .into_iter()
        .find(|region| *region == ScrollRegion::Document || document.has_region(*region))
        .unwrap_or(ScrollRegion::Document)
}
