pub mod controller;
pub mod error;
pub mod queue;
pub mod retry;
pub mod session;
pub mod stats;
pub mod viewport;
