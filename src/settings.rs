use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// API keys for the two remote collaborators.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub scrape_api_key: Option<SecretString>,
    pub gemini_api_key: Option<SecretString>,
}

impl Credentials {
    pub fn new(scrape: Option<&str>, gemini: Option<&str>) -> Self {
        Self {
            scrape_api_key: non_empty(scrape),
            gemini_api_key: non_empty(gemini),
        }
    }

    /// Names of the keys that are absent or blank.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.scrape_api_key.is_none() {
            missing.push("ScrapeCreators");
        }
        if self.gemini_api_key.is_none() {
            missing.push("Gemini");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

fn non_empty(value: Option<&str>) -> Option<SecretString> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.to_string()))
}

/// Narrow read access to stored settings.
///
/// Injected into the controller and the single-item action so neither
/// reaches into config files or the environment directly.
pub trait SettingsProvider: Send + Sync {
    fn credentials(&self) -> Credentials;

    fn model_id(&self) -> String {
        DEFAULT_MODEL.to_string()
    }
}

/// Settings fixed at construction time.
#[derive(Debug, Clone)]
pub struct StaticSettings {
    pub credentials: Credentials,
    pub model: String,
}

impl StaticSettings {
    pub fn new(credentials: Credentials, model: impl Into<String>) -> Self {
        Self {
            credentials,
            model: model.into(),
        }
    }
}

impl SettingsProvider for StaticSettings {
    fn credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

/// Borrow a secret's value for one request.
pub fn expose(secret: &SecretString) -> &str {
    secret.expose_secret()
}
