//! Test execution engine
//!
//! Runs registered specs against a cluster with bounded parallelism.

mod runner;

pub use runner::{setup_failed, SpecRunner};
