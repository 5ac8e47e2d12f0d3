//! Attribute List Library
//!
//! Headless front end for the attribute list engine.

pub mod headless;

// Re-export main entry points
pub use headless::runner::{run_headless, HeadlessOptions};
