use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    bulk::{session::Mode, stats::whole_millis},
    reply::error::FailureClass,
    timeline::item::ItemId,
};

/// One line of the bulk session trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub mode: String,
    pub processed: u32,

    pub decision: String,
    pub item_id: Option<String>,

    pub failure_class: Option<String>,
    pub detail: Option<String>,
    pub elapsed_ms: Option<u64>,
}

impl TraceEvent {
    pub fn now(step: u64, mode: Mode, processed: u32, decision: impl ToString) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step,
            mode: format!("{:?}", mode),
            processed,
            decision: decision.to_string(),
            item_id: None,
            failure_class: None,
            detail: None,
            elapsed_ms: None,
        }
    }

    pub fn with_item(mut self, id: &ItemId) -> Self {
        self.item_id = Some(id.to_string());
        self
    }

    pub fn with_failure(mut self, class: FailureClass, detail: impl ToString) -> Self {
        self.failure_class = Some(class.to_string());
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_elapsed(mut self, elapsed: std::time::Duration) -> Self {
        self.elapsed_ms = Some(whole_millis(elapsed));
        self
    }
}
