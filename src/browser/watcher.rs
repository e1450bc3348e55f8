use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::browser::document::Document;

/// Delay that coalesces bursts of list mutations into one notification.
pub const LIST_CHANGE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Subscribe to changes of the rendered item list.
///
/// Polls the page's item count every `interval` and sends one notification
/// per settled change. The task ends when the receiver is dropped.
pub fn spawn_list_watcher(
    document: Arc<dyn Document>,
    interval: Duration,
) -> (mpsc::Receiver<()>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut last = document.item_count();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let count = document.item_count();
            if count == last {
                continue;
            }

            tokio::time::sleep(LIST_CHANGE_DEBOUNCE).await;
            last = document.item_count();
            trace!(count = last, "item list changed");

            // A pending notification already covers this change
            if let Err(mpsc::error::TrySendError::Closed(())) = tx.try_send(()) {
                break;
            }
        }
    });

    (rx, handle)
}
