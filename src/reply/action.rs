use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::browser::document::ElementHandle;
use crate::reply::compose::ComposeSurface;
use crate::reply::error::ActionError;
use crate::reply::generate::ReplyGenerator;
use crate::reply::model::ItemData;
use crate::reply::scrape::ItemFetcher;
use crate::settings::SettingsProvider;
use crate::timeline::item::StatusReference;

/// What a successful single-item action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub reply: String,
    pub submitted: bool,
}

/// One fallible unit of work per timeline item, as seen by the controller.
#[async_trait]
pub trait ItemAction: Send + Sync {
    async fn run(
        &self,
        reference: &StatusReference,
        element: &ElementHandle,
    ) -> Result<ActionReport, ActionError>;
}

/// Fetch post data and ask the model for a reply. No page access.
#[derive(Clone)]
pub struct Drafter {
    fetcher: Arc<dyn ItemFetcher>,
    generator: Arc<dyn ReplyGenerator>,
    settings: Arc<dyn SettingsProvider>,
}

impl Drafter {
    pub fn new(
        fetcher: Arc<dyn ItemFetcher>,
        generator: Arc<dyn ReplyGenerator>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            fetcher,
            generator,
            settings,
        }
    }

    pub async fn draft(&self, reference: &str) -> Result<(ItemData, String), ActionError> {
        let credentials = self.settings.credentials();
        let scrape_key = credentials
            .scrape_api_key
            .ok_or(ActionError::CredentialMissing("ScrapeCreators"))?;
        let gemini_key = credentials
            .gemini_api_key
            .ok_or(ActionError::CredentialMissing("Gemini"))?;

        let data = self.fetcher.fetch(reference, &scrape_key).await?;
        debug!(author = data.author_or_placeholder(), "post data received");

        let reply = self
            .generator
            .generate(&data, &gemini_key, &self.settings.model_id())
            .await?;

        Ok((data, reply))
    }
}

/// Draft a reply and put it into the page's composer.
pub struct ReplyAction {
    drafter: Drafter,
    compose: ComposeSurface,
    auto_submit: bool,
}

impl ReplyAction {
    pub fn new(drafter: Drafter, compose: ComposeSurface) -> Self {
        Self {
            drafter,
            compose,
            auto_submit: false,
        }
    }

    /// Submit after inserting. Only bulk sessions turn this on.
    pub fn with_auto_submit(mut self, auto_submit: bool) -> Self {
        self.auto_submit = auto_submit;
        self
    }
}

#[async_trait]
impl ItemAction for ReplyAction {
    async fn run(
        &self,
        reference: &StatusReference,
        element: &ElementHandle,
    ) -> Result<ActionReport, ActionError> {
        let (_, reply) = self.drafter.draft(reference.as_str()).await?;

        self.compose.insert(element, &reply).await?;
        if self.auto_submit {
            self.compose.submit().await?;
        }

        info!(url = %reference, submitted = self.auto_submit, "reply placed");
        Ok(ActionReport {
            reply,
            submitted: self.auto_submit,
        })
    }
}
