pub mod browser;
pub mod bulk;
pub mod cli;
pub mod reply;
pub mod settings;
pub mod timeline;
pub mod trace;
