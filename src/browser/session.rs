use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::document::{Document, ElementHandle, ItemNode, Marker, ScrollRegion};
use crate::browser::error::BridgeError;

pub const DEFAULT_BRIDGE_SCRIPT: &str = "bridge/timeline_bridge.js";

/// Request sent to the bridge over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BridgeRequest {
    Navigate { url: String },
    Items,
    ItemCount,
    Attached { handle: ElementHandle },
    Mark { handle: ElementHandle, marker: Marker },
    Unmark { handle: ElementHandle, marker: Marker },
    UnmarkAll { marker: Marker },
    Identity,
    Region { region: ScrollRegion },
    Scroll { region: ScrollRegion, dy: f64 },
    Viewport,
    OpenReply { handle: ElementHandle },
    ComposeReady,
    ComposeInsert { text: String },
    SubmitReady,
    Submit,
    Quit,
}

impl BridgeRequest {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeRequest::Navigate { .. } => "navigate",
            BridgeRequest::Items => "items",
            BridgeRequest::ItemCount => "item_count",
            BridgeRequest::Attached { .. } => "attached",
            BridgeRequest::Mark { .. } => "mark",
            BridgeRequest::Unmark { .. } => "unmark",
            BridgeRequest::UnmarkAll { .. } => "unmark_all",
            BridgeRequest::Identity => "identity",
            BridgeRequest::Region { .. } => "region",
            BridgeRequest::Scroll { .. } => "scroll",
            BridgeRequest::Viewport => "viewport",
            BridgeRequest::OpenReply { .. } => "open_reply",
            BridgeRequest::ComposeReady => "compose_ready",
            BridgeRequest::ComposeInsert { .. } => "compose_insert",
            BridgeRequest::SubmitReady => "submit_ready",
            BridgeRequest::Submit => "submit",
            BridgeRequest::Quit => "quit",
        }
    }
}

/// Response received from the bridge over stdout (one JSON line).
#[derive(Debug, Default, Deserialize)]
pub struct BridgeResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub items: Option<Vec<ItemNode>>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub value: Option<bool>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub offset: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

struct Pipes {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    closed: bool,
}

/// A persistent browser session backed by the timeline bridge script.
///
/// Launches a long-lived Node.js process that keeps a Chromium page open on
/// the timeline. Commands are sent as NDJSON over stdin, responses read from
/// stdout. The pipes sit behind a mutex so the session can be shared as a
/// [`Document`]; no lock is held across an await point.
pub struct BrowserSession {
    pipes: Mutex<Pipes>,
}

impl BrowserSession {
    /// Launch a new session by spawning the bridge script.
    pub fn launch(script: &str) -> Result<Self, BridgeError> {
        let mut child = Command::new("node")
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BridgeError::Spawn {
                script: script.into(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Io(format!("Failed to capture stdin of {}", script)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Io(format!("Failed to capture stdout of {}", script)))?;

        let mut reader = BufReader::new(stdout);

        // Wait for the ready signal
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| BridgeError::Io(format!("Failed to read ready signal: {}", e)))?;

        let response: BridgeResponse =
            serde_json::from_str(line.trim()).map_err(|e| BridgeError::JsonParse {
                context: "bridge ready signal".into(),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(BridgeError::Protocol {
                command: "launch".into(),
                error: "Did not receive ready signal from bridge".into(),
            });
        }

        Ok(BrowserSession {
            pipes: Mutex::new(Pipes {
                child,
                stdin,
                reader,
                closed: false,
            }),
        })
    }

    /// Send a request and read the response.
    fn send(&self, request: &BridgeRequest) -> Result<BridgeResponse, BridgeError> {
        let json = serde_json::to_string(request).map_err(|e| BridgeError::JsonSerialize {
            context: request.name().into(),
            source: e,
        })?;

        let mut pipes = self.pipes.lock().map_err(|_| BridgeError::Poisoned)?;
        if pipes.closed {
            return Err(BridgeError::Io("Bridge session already closed".into()));
        }

        writeln!(pipes.stdin, "{}", json)
            .map_err(|e| BridgeError::Io(format!("Failed to write to bridge stdin: {}", e)))?;
        pipes
            .stdin
            .flush()
            .map_err(|e| BridgeError::Io(format!("Failed to flush bridge stdin: {}", e)))?;

        let mut line = String::new();
        pipes
            .reader
            .read_line(&mut line)
            .map_err(|e| BridgeError::Io(format!("Failed to read from bridge stdout: {}", e)))?;

        if line.trim().is_empty() {
            return Err(BridgeError::Io(
                "Empty response from bridge (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| BridgeError::JsonParse {
            context: format!("{} response", request.name()),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&self, request: &BridgeRequest) -> Result<BridgeResponse, BridgeError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(BridgeError::Protocol {
                command: request.name().into(),
                error: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        Ok(response)
    }

    /// Document-side query: failures are logged and read as `None`.
    fn query(&self, request: BridgeRequest) -> Option<BridgeResponse> {
        match self.send_ok(&request) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(command = request.name(), error = %e, "bridge query failed");
                None
            }
        }
    }

    fn query_flag(&self, request: BridgeRequest) -> bool {
        self.query(request)
            .and_then(|r| r.value)
            .unwrap_or(false)
    }

    /// Navigate the page to a URL.
    pub fn navigate(&self, url: &str) -> Result<(), BridgeError> {
        self.send_ok(&BridgeRequest::Navigate { url: url.to_string() })?;
        debug!(url, "navigated");
        Ok(())
    }

    /// Quit the browser session.
    pub fn quit(&self) -> Result<(), BridgeError> {
        let request = BridgeRequest::Quit;
        // Best-effort quit, the process may already be gone
        let _ = self.send(&request);
        let mut pipes = self.pipes.lock().map_err(|_| BridgeError::Poisoned)?;
        if !pipes.closed {
            pipes.closed = true;
            let _ = pipes.child.wait();
        }
        Ok(())
    }
}

impl Document for BrowserSession {
    fn item_nodes(&self) -> Vec<ItemNode> {
        self.query(BridgeRequest::Items)
            .and_then(|r| r.items)
            .unwrap_or_default()
    }

    fn item_count(&self) -> usize {
        self.query(BridgeRequest::ItemCount)
            .and_then(|r| r.count)
            .unwrap_or(0)
    }

    fn is_attached(&self, handle: &ElementHandle) -> bool {
        self.query_flag(BridgeRequest::Attached { handle: handle.clone() })
    }

    fn set_marker(&self, handle: &ElementHandle, marker: Marker) {
        self.query(BridgeRequest::Mark { handle: handle.clone(), marker });
    }

    fn clear_marker(&self, handle: &ElementHandle, marker: Marker) {
        self.query(BridgeRequest::Unmark { handle: handle.clone(), marker });
    }

    fn clear_all_markers(&self, marker: Marker) {
        self.query(BridgeRequest::UnmarkAll { marker });
    }

    fn operating_handle(&self) -> Option<String> {
        self.query(BridgeRequest::Identity)
            .and_then(|r| r.handle)
            .map(|h| h.trim_start_matches('@').to_string())
            .filter(|h| !h.is_empty())
    }

    fn has_region(&self, region: ScrollRegion) -> bool {
        self.query_flag(BridgeRequest::Region { region })
    }

    fn scroll_by(&self, region: ScrollRegion, dy: f64) -> Option<f64> {
        self.query(BridgeRequest::Scroll { region, dy })
            .and_then(|r| r.offset)
    }

    fn viewport_height(&self) -> f64 {
        self.query(BridgeRequest::Viewport)
            .and_then(|r| r.height)
            .unwrap_or(0.0)
    }

    fn open_reply(&self, handle: &ElementHandle) -> bool {
        self.query_flag(BridgeRequest::OpenReply { handle: handle.clone() })
    }

    fn compose_ready(&self) -> bool {
        self.query_flag(BridgeRequest::ComposeReady)
    }

    fn insert_reply_text(&self, text: &str) -> bool {
        self.query_flag(BridgeRequest::ComposeInsert { text: text.to_string() })
    }

    fn submit_ready(&self) -> bool {
        self.query_flag(BridgeRequest::SubmitReady)
    }

    fn click_submit(&self) -> bool {
        self.query_flag(BridgeRequest::Submit)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Best-effort cleanup
        let _ = self.quit();
    }
}
