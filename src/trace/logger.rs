use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;

use crate::trace::trace::TraceEvent;

/// JSONL sink for scheduler decisions. Write failures are logged, never
/// returned to the controller.
pub struct TraceLogger {
    sink: Option<Mutex<LineWriter<File>>>,
}

impl TraceLogger {
    /// `trace_path` from the config file; unset means no trace.
    pub fn from_config(trace_path: Option<&str>) -> Self {
        trace_path.map_or_else(Self::disabled, Self::new)
    }

    /// Append to `path`, creating it and its parent directories. Tracing is
    /// disabled if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let sink = match open_append(path) {
            Ok(file) => Some(Mutex::new(LineWriter::new(file))),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open trace file, tracing disabled");
                None
            }
        };
        Self { sink }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(decision = %event.decision, error = %e, "trace event not serializable");
                return;
            }
        };

        let Ok(mut writer) = sink.lock() else {
            warn!(decision = %event.decision, "trace sink poisoned, event dropped");
            return;
        };
        if let Err(e) = writeln!(writer, "{}", line) {
            warn!(decision = %event.decision, item = ?event.item_id, error = %e, "trace event dropped");
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::session::Mode;
    use crate::timeline::item::ItemId;

    #[test]
    fn unset_path_disables_tracing() {
        assert!(!TraceLogger::from_config(None).is_enabled());
    }

    #[test]
    fn appends_one_line_per_event_under_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("trace.jsonl");
        let logger = TraceLogger::from_config(path.to_str());
        assert!(logger.is_enabled());

        logger.log(&TraceEvent::now(1, Mode::Running, 0, "start"));
        logger.log(&TraceEvent::now(2, Mode::Running, 0, "dispatched").with_item(&ItemId::new("42")));

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"item_id\":\"42\""));
    }
}
