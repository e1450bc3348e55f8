use thiserror::Error;

/// Failures talking to the Node bridge that owns the live browser page.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Bridge process failed to spawn
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the bridge's pipes failed
    #[error("Bridge I/O error: {0}")]
    Io(String),

    /// Bridge line was not valid JSON
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Request could not be serialized
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Bridge answered with ok=false, or without the expected payload
    #[error("Bridge command '{command}' failed: {error}")]
    Protocol { command: String, error: String },

    /// Internal lock poisoned by a panicking caller
    #[error("Bridge session lock poisoned")]
    Poisoned,
}
