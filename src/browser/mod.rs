pub mod document;
pub mod error;
pub mod session;
pub mod watcher;
