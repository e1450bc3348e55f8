use std::path::Path;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::session::DEFAULT_BRIDGE_SCRIPT;
use crate::bulk::controller::BulkConfig;
use crate::bulk::viewport::ViewportConfig;
use crate::reply::compose::ComposeConfig;
use crate::settings::{Credentials, DEFAULT_MODEL, StaticSettings};

pub const DEFAULT_CONFIG_PATH: &str = "reply-guy.yaml";
pub const SCRAPE_KEY_ENV: &str = "SCRAPECREATORS_API_KEY";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "reply-guy",
    version,
    about = "Drafts and posts AI replies on an X/Twitter timeline"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: reply-guy.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a bulk session against the home timeline (Ctrl-C stops)
    Run {
        /// Timeline URL to open
        #[arg(long)]
        url: Option<String>,

        /// Successful replies before the session stops itself
        #[arg(long)]
        cap: Option<u32>,

        /// Milliseconds between scheduler ticks
        #[arg(long)]
        rate_ms: Option<u64>,

        /// Insert replies without pressing submit
        #[arg(long)]
        no_submit: bool,
    },

    /// Draft a reply for a single post
    Reply {
        /// Status URL of the post
        #[arg(long)]
        url: String,

        /// Also open the post and insert the draft into its composer
        #[arg(long)]
        insert: bool,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `reply-guy.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub bulk: BulkConfig,

    #[serde(default)]
    pub viewport: ViewportConfig,

    #[serde(default)]
    pub compose: ComposeConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    /// JSONL trace of scheduler decisions. Disabled when unset.
    pub trace_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialsConfig::default(),
            model: default_model(),
            bulk: BulkConfig::default(),
            viewport: ViewportConfig::default(),
            compose: ComposeConfig::default(),
            browser: BrowserConfig::default(),
            trace_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub scrapecreators_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_bridge_script")]
    pub bridge_script: String,

    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// How often the list watcher polls the item count.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            bridge_script: default_bridge_script(),
            start_url: default_start_url(),
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

// Serde default helpers
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_bridge_script() -> String { DEFAULT_BRIDGE_SCRIPT.to_string() }
fn default_start_url() -> String { "https://x.com/home".to_string() }
fn default_watch_interval_ms() -> u64 { 500 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "malformed config, using defaults");
            AppConfig::default()
        }),
        Err(_) => {
            if Path::new(config_path).exists() || path.is_some() {
                warn!(path = config_path, "config file unreadable, using defaults");
            } else {
                debug!(path = config_path, "no config file, using defaults");
            }
            AppConfig::default()
        }
    }
}

// ============================================================================
// Config Builders (merge CLI args, env and config file)
// ============================================================================

/// Credentials with environment variables taking precedence over the file.
pub fn resolve_credentials(
    config: &AppConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Credentials {
    let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());
    let scrape = lookup(SCRAPE_KEY_ENV).or_else(|| config.credentials.scrapecreators_api_key.clone());
    let gemini = lookup(GEMINI_KEY_ENV).or_else(|| config.credentials.gemini_api_key.clone());
    Credentials::new(scrape.as_deref(), gemini.as_deref())
}

/// Settings from the config file plus process environment.
pub fn build_settings(config: &AppConfig) -> StaticSettings {
    let credentials = resolve_credentials(config, |name| std::env::var(name).ok());
    StaticSettings::new(credentials, config.model.clone())
}

/// Bulk settings with `run` flags applied on top.
pub fn build_bulk_config(
    config: &AppConfig,
    cap: Option<u32>,
    rate_ms: Option<u64>,
    no_submit: bool,
) -> BulkConfig {
    let mut bulk = config.bulk.clone();
    if let Some(cap) = cap {
        bulk.session_cap = cap;
    }
    if let Some(rate_ms) = rate_ms {
        bulk.rate_limit_ms = rate_ms;
    }
    if no_submit {
        bulk.auto_submit = false;
    }
    bulk
}
