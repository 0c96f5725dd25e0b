//! Output formatting module
//!
//! Provides output formats for test results, specs and suites.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
