//! Transformation module.
//!
//! This module turns decoded sheets into dashboard charts:
//! - Engine: one table + one category rule to sorted series
//! - Grouper: series split per scenario
//! - Pipeline: whole uploads, per-sheet outcomes and reports

pub mod engine;
pub mod grouper;
pub mod pipeline;

pub use engine::{list_scenarios, transform, Engine, TransformOptions, UnitScale};
pub use grouper::group_series;
pub use pipeline::*;
