//! Presentation-facing API module.
//!
//! Report types and the log stream a dashboard front end consumes.

pub mod logs;
pub mod types;

pub use logs::*;
pub use types::*;
