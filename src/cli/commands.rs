use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::browser::document::Document;
use crate::browser::session::BrowserSession;
use crate::browser::watcher::spawn_list_watcher;
use crate::bulk::controller::{BulkConfig, BulkController, Control, SessionSummary};
use crate::bulk::error::BulkError;
use crate::bulk::retry::{PollPolicy, poll_until};
use crate::bulk::viewport::ViewportLoader;
use crate::cli::config::{AppConfig, build_settings};
use crate::reply::action::{Drafter, ItemAction, ReplyAction};
use crate::reply::compose::{ComposeSurface, hold_for_review};
use crate::reply::generate::GeminiClient;
use crate::reply::scrape::ScrapeCreatorsClient;
use crate::settings::SettingsProvider;
use crate::timeline::item::StatusReference;
use crate::timeline::locator::locate_items;
use crate::trace::logger::TraceLogger;

/// How long `reply --insert` waits for the post to render.
const FOCAL_ITEM_TIMEOUT: Duration = Duration::from_secs(15);

/// How often an inserted draft's composer is checked while the user reviews it.
const REVIEW_CHECK_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// run subcommand
// ============================================================================

/// Open the timeline and run one bulk session until the cap or Ctrl-C.
pub async fn cmd_run(
    config: &AppConfig,
    url: Option<&str>,
    bulk: BulkConfig,
) -> anyhow::Result<SessionSummary> {
    let settings: Arc<dyn SettingsProvider> = Arc::new(build_settings(config));

    // Fail before spending a browser launch
    let missing = settings.credentials().missing();
    if !missing.is_empty() {
        return Err(BulkError::CredentialMissing { missing }.into());
    }

    let session = Arc::new(BrowserSession::launch(&config.browser.bridge_script)?);
    let start_url = url.unwrap_or(&config.browser.start_url);
    session
        .navigate(start_url)
        .with_context(|| format!("navigating to {}", start_url))?;

    let document: Arc<dyn Document> = session.clone();
    let action = build_action(config, Arc::clone(&document), Arc::clone(&settings))
        .with_auto_submit(bulk.auto_submit);

    let tracer = TraceLogger::from_config(config.trace_path.as_deref());

    let mut controller = BulkController::new(bulk, Arc::clone(&document), Arc::new(action), settings)
        .with_loader(ViewportLoader::new(config.viewport.clone()))
        .with_tracer(tracer);

    let (controls, control_rx) = mpsc::channel(4);
    let stopper = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stop requested");
            let _ = controls.send(Control::Stop).await;
        }
    });

    let (changes, watcher) = spawn_list_watcher(
        Arc::clone(&document),
        Duration::from_millis(config.browser.watch_interval_ms),
    );

    let summary = controller.run(control_rx, Some(changes)).await;

    watcher.abort();
    stopper.abort();
    if let Err(e) = session.quit() {
        warn!(error = %e, "browser did not shut down cleanly");
    }

    let summary = summary?;
    println!(
        "Session finished: {} replied, {} failed, {} handled in {:.1}s",
        summary.processed,
        summary.failed,
        summary.handled,
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}

// ============================================================================
// reply subcommand
// ============================================================================

/// Draft a reply for one post. Returns whether it succeeded.
///
/// With `insert`, the post is opened in the browser and the draft is placed
/// in its composer without submitting. The browser stays open until the user
/// presses Enter or Ctrl-C, or sends/dismisses the draft in the page.
pub async fn cmd_reply(config: &AppConfig, url: &str, insert: bool) -> anyhow::Result<bool> {
    let settings: Arc<dyn SettingsProvider> = Arc::new(build_settings(config));

    if !insert {
        let drafter = build_drafter(settings);
        return match drafter.draft(url).await {
            Ok((data, reply)) => {
                println!("@{}: {}", data.author_or_placeholder(), data.text_or_placeholder());
                println!();
                println!("{}", reply);
                Ok(true)
            }
            Err(e) => {
                eprintln!("{}", e.notice());
                Ok(false)
            }
        };
    }

    let reference = StatusReference::parse(url)
        .ok_or_else(|| anyhow!("not a status URL: {}", url))?;

    let session = Arc::new(BrowserSession::launch(&config.browser.bridge_script)?);
    session
        .navigate(reference.as_str())
        .with_context(|| format!("navigating to {}", reference))?;
    let document: Arc<dyn Document> = session.clone();

    let wanted = reference.status_id();
    let focal = Arc::clone(&document);
    poll_until(
        || locate_items(focal.as_ref()).iter().any(|item| item.id == wanted),
        PollPolicy::fixed(Duration::from_millis(250), FOCAL_ITEM_TIMEOUT),
    )
    .await
    .map_err(|t| anyhow!("post {} did not render ({:?})", wanted, t.elapsed))?;

    let item = locate_items(document.as_ref())
        .into_iter()
        .find(|item| item.id == wanted)
        .ok_or_else(|| anyhow!("post {} left the page", wanted))?;

    let action = build_action(config, Arc::clone(&document), settings);
    let succeeded = match action.run(&reference, &item.element).await {
        Ok(report) => {
            println!("{}", report.reply);
            println!();
            println!("Draft is in the reply box. Edit or send it in the browser, then press Enter here to close.");
            let end = hold_for_review(document.as_ref(), user_confirms(), REVIEW_CHECK_INTERVAL).await;
            info!(?end, "review finished");
            true
        }
        Err(e) => {
            eprintln!("{}", e.notice());
            false
        }
    };

    if let Err(e) = session.quit() {
        warn!(error = %e, "browser did not shut down cleanly");
    }
    Ok(succeeded)
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves on Enter or Ctrl-C.
async fn user_confirms() {
    // Plain thread: a blocked stdin read must not hold up runtime shutdown
    let (tx, enter) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = tx.send(());
    });

    tokio::select! {
        _ = enter => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

fn build_drafter(settings: Arc<dyn SettingsProvider>) -> Drafter {
    Drafter::new(
        Arc::new(ScrapeCreatorsClient::default()),
        Arc::new(GeminiClient::default()),
        settings,
    )
}

fn build_action(
    config: &AppConfig,
    document: Arc<dyn Document>,
    settings: Arc<dyn SettingsProvider>,
) -> ReplyAction {
    let compose = ComposeSurface::new(document, config.compose.clone());
    ReplyAction::new(build_drafter(settings), compose)
}
