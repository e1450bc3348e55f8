pub mod eligibility;
pub mod item;
pub mod locator;
