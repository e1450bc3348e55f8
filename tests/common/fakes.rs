use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use reply_guy::browser::document::ElementHandle;
use reply_guy::bulk::stats::{StatsReporter, StatsSnapshot};
use reply_guy::reply::action::{ActionReport, ItemAction};
use reply_guy::reply::error::{ActionError, FetchError, GenerateError};
use reply_guy::reply::generate::ReplyGenerator;
use reply_guy::reply::model::ItemData;
use reply_guy::reply::scrape::ItemFetcher;
use reply_guy::settings::{Credentials, StaticSettings};
use reply_guy::timeline::item::StatusReference;

pub fn full_settings() -> Arc<StaticSettings> {
    Arc::new(StaticSettings::new(
        Credentials::new(Some("scrape-key"), Some("gemini-key")),
        "test-model",
    ))
}

pub fn settings_with(scrape: Option<&str>, gemini: Option<&str>) -> Arc<StaticSettings> {
    Arc::new(StaticSettings::new(Credentials::new(scrape, gemini), "test-model"))
}

// ============================================================================
// Single-item action
// ============================================================================

/// Action that sleeps, then succeeds unless the status id is in `fail_ids`.
#[derive(Default)]
pub struct ScriptedAction {
    delay: Duration,
    fail_ids: HashSet<String>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAction {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(mut self, ids: &[&str]) -> Self {
        self.fail_ids = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemAction for ScriptedAction {
    async fn run(
        &self,
        reference: &StatusReference,
        _element: &ElementHandle,
    ) -> Result<ActionReport, ActionError> {
        let id = reference.status_id().to_string();
        self.calls.lock().unwrap().push(id.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_ids.contains(&id) {
            Err(ActionError::Fetch(FetchError::NotFound))
        } else {
            Ok(ActionReport {
                reply: format!("reply to {}", id),
                submitted: true,
            })
        }
    }
}

// ============================================================================
// Remote collaborators
// ============================================================================

pub struct FakeFetcher {
    pub result: Mutex<Option<Result<ItemData, FetchError>>>,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn returning(result: Result<ItemData, FetchError>) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemFetcher for FakeFetcher {
    async fn fetch(&self, _reference: &str, _api_key: &SecretString) -> Result<ItemData, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(FetchError::Unknown("fetched twice".into())))
    }
}

pub struct FakeGenerator {
    pub reply: Result<String, u16>,
    pub models: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            reply: Err(status),
            models: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReplyGenerator for FakeGenerator {
    async fn generate(
        &self,
        _item: &ItemData,
        _api_key: &SecretString,
        model_id: &str,
    ) -> Result<String, GenerateError> {
        self.models.lock().unwrap().push(model_id.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(GenerateError::InvalidCredential { status: *status }),
        }
    }
}

pub fn sample_data() -> ItemData {
    ItemData {
        text: Some("Just shipped v1!".into()),
        author: Some("ferris".into()),
        likes: 10,
        reposts: 3,
    }
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Clone, Default)]
pub struct SharedReporter {
    pub snapshots: Arc<Mutex<Vec<StatsSnapshot>>>,
}

impl StatsReporter for SharedReporter {
    fn report(&mut self, snapshot: &StatsSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}
