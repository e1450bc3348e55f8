pub mod action;
pub mod compose;
pub mod error;
pub mod generate;
pub mod model;
pub mod scrape;
