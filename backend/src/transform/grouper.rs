//! Group engine output per scenario.
//!
//! The engine returns one flat, sorted list of series. A presentation layer
//! that shows one scenario per tab wants them split:
//!
//! ```text
//! Flat series                         →  Grouped
//! ┌──────────────────────────────┐       ┌──────────────────────┐
//! │ Base    ELC [2020: 8]        │       │ Base                 │
//! │ Base    TRA [2020: 3]        │  →    │   ELC, TRA           │
//! │ NetZero ELC [2020: 1]        │       ├──────────────────────┤
//! └──────────────────────────────┘       │ NetZero              │
//!                                        │   ELC                │
//!                                        └──────────────────────┘
//! ```
//!
//! Tables without a `Scenario` column land under `None`.

use std::collections::BTreeMap;

use crate::models::Series;

/// Split series by scenario, keeping their relative order.
pub fn group_series(series: Vec<Series>) -> BTreeMap<Option<String>, Vec<Series>> {
    let mut groups: BTreeMap<Option<String>, Vec<Series>> = BTreeMap::new();
    for s in series {
        groups.entry(s.scenario.clone()).or_default().push(s);
    }
    groups
}
