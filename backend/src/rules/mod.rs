//! Category rules and display labels
//!
//! This module provides:
//! - `rule`: what a rule can say (filters, key derivation, aggregation, chart hint)
//! - `labels`: code fragment → readable name lookup
//! - `registry`: the immutable category → rule registry and its JSON loading
//!
//! ## Example
//!
//! ```rust,ignore
//! use timesdash::rules::RuleRegistry;
//!
//! let registry = RuleRegistry::builtin();
//! let rule = registry.get("resmix").unwrap();
//! assert_eq!(rule.key.derive("RESHOUSE", "resmix").as_deref(), Some("RES"));
//! assert_eq!(registry.labels().resolve("RES"), "Residential");
//! ```

pub mod labels;
pub mod registry;
pub mod rule;

pub use labels::{LabelEntries, LabelTable};
pub use registry::{default_rules_json, RuleRegistry, RulesConfig, RULES_ENV};
pub use rule::{Aggregation, CategoryRule, ChartSpec, KeyDerivation, PeriodFilter, RowFilter};
