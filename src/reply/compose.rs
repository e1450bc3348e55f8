use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::debug;

use crate::browser::document::{Document, ElementHandle};
use crate::bulk::retry::{PollPolicy, poll_until};
use crate::reply::error::ComposeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause between inserting text and pressing submit.
    #[serde(default = "default_submit_pause_ms")]
    pub submit_pause_ms: u64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            submit_pause_ms: default_submit_pause_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 { 5000 }
fn default_poll_interval_ms() -> u64 { 100 }
fn default_submit_pause_ms() -> u64 { 1000 }

impl ComposeConfig {
    fn policy(&self) -> PollPolicy {
        PollPolicy::fixed(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.timeout_ms),
        )
    }
}

/// Drives the page's native reply composer for one post.
#[derive(Clone)]
pub struct ComposeSurface {
    document: Arc<dyn Document>,
    config: ComposeConfig,
}

impl ComposeSurface {
    pub fn new(document: Arc<dyn Document>, config: ComposeConfig) -> Self {
        Self { document, config }
    }

    /// Open the composer for `element` and fill in `text`.
    pub async fn insert(&self, element: &ElementHandle, text: &str) -> Result<(), ComposeError> {
        if !self.document.open_reply(element) {
            return Err(ComposeError::ReplyButtonNotFound);
        }

        let document = Arc::clone(&self.document);
        poll_until(|| document.compose_ready(), self.config.policy())
            .await
            .map_err(|t| ComposeError::ComposeNotFound { attempts: t.attempts })?;

        if !self.document.insert_reply_text(text) {
            return Err(ComposeError::InsertRejected);
        }

        debug!(element = %element, chars = text.chars().count(), "reply inserted");
        Ok(())
    }

    /// Press submit once the control is enabled.
    pub async fn submit(&self) -> Result<(), ComposeError> {
        sleep(Duration::from_millis(self.config.submit_pause_ms)).await;

        let document = Arc::clone(&self.document);
        poll_until(|| document.submit_ready(), self.config.policy())
            .await
            .map_err(|t| ComposeError::SubmitNotFound { attempts: t.attempts })?;

        if !self.document.click_submit() {
            return Err(ComposeError::SubmitNotFound { attempts: 1 });
        }

        debug!("reply submitted");
        Ok(())
    }
}

/// Why [`hold_for_review`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEnd {
    /// The user confirmed from the terminal.
    Confirmed,
    /// The composer left the page: sent or dismissed in the browser.
    ComposerClosed,
}

/// Keep the page untouched while the user reviews an inserted draft.
///
/// Returns once `confirm` resolves or the composer is no longer on the page,
/// whichever happens first.
pub async fn hold_for_review(
    document: &dyn Document,
    confirm: impl Future<Output = ()>,
    check_every: Duration,
) -> ReviewEnd {
    let mut confirm = pin!(confirm);
    let mut checks = interval(check_every);
    checks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut confirm => return ReviewEnd::Confirmed,
            _ = checks.tick() => {
                if !document.compose_ready() {
                    debug!("composer closed during review");
                    return ReviewEnd::ComposerClosed;
                }
            }
        }
    }
}
