//! Category transform engine
//!
//! Turns one observation table into chart-ready series using the rule
//! registered for its category. Pure: no I/O, no logging, and the input table
//! is never modified.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{TransformError, TransformResult};
use crate::models::{
    CellValue, ObservationTable, Series, SeriesPoint, COMMODITY, PERIOD, SCENARIO,
};
use crate::rules::{Aggregation, CategoryRule, RuleRegistry};

/// Unit conversion applied after aggregation. Values are read as kilotonnes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitScale {
    Kt,
    Mt,
    Gt,
}

impl UnitScale {
    fn divisor(self) -> f64 {
        match self {
            UnitScale::Kt => 1.0,
            UnitScale::Mt => 1_000.0,
            UnitScale::Gt => 1_000_000.0,
        }
    }

    pub fn apply(self, value: f64) -> f64 {
        value / self.divisor()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnitScale::Kt => "kt",
            UnitScale::Mt => "Mt",
            UnitScale::Gt => "Gt",
        }
    }
}

impl fmt::Display for UnitScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for UnitScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kt" => Ok(UnitScale::Kt),
            "mt" => Ok(UnitScale::Mt),
            "gt" => Ok(UnitScale::Gt),
            other => Err(format!(
                "Invalid unit scale: '{}'. Must be 'kt', 'mt' or 'gt'",
                other
            )),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Unit conversion applied to every aggregated value.
    #[serde(default)]
    pub unit_scale: Option<UnitScale>,

    /// Only keep rows of this scenario (requires a `Scenario` column).
    #[serde(default)]
    pub scenario: Option<String>,
}

impl TransformOptions {
    pub fn with_unit_scale(mut self, scale: UnitScale) -> Self {
        self.unit_scale = Some(scale);
        self
    }

    pub fn with_scenario(mut self, scenario: &str) -> Self {
        self.scenario = Some(scenario.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn finish(&self, aggregation: Aggregation) -> f64 {
        match aggregation {
            Aggregation::Sum => self.sum,
            Aggregation::Mean => self.sum / self.count as f64,
        }
    }
}

/// Group identity: scenario first so series of one scenario stay together.
type GroupKey = (Option<String>, String, i32);

/// Transform engine bound to a registry.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    registry: &'a RuleRegistry,
}

impl<'a> Engine<'a> {
    pub fn new(registry: &'a RuleRegistry) -> Self {
        Self { registry }
    }

    /// Engine over the built-in rules.
    pub fn builtin() -> Engine<'static> {
        Engine::new(RuleRegistry::builtin())
    }

    pub fn registry(&self) -> &'a RuleRegistry {
        self.registry
    }

    /// Transform `table` with the rule registered for `category`.
    ///
    /// Series come back sorted by scenario, then key; points by period.
    pub fn transform(
        &self,
        table: &ObservationTable,
        category: &str,
        options: &TransformOptions,
    ) -> TransformResult<Vec<Series>> {
        let rule = self
            .registry
            .get(category)
            .ok_or_else(|| TransformError::UnknownCategory(category.to_string()))?;

        if table.is_empty() {
            return Err(TransformError::EmptyResult(category.to_string()));
        }
        check_columns(table, rule, options)?;

        let groups = aggregate(table, rule, options)?;
        if groups.is_empty() {
            return Err(TransformError::EmptyResult(category.to_string()));
        }

        Ok(assemble(groups, rule, self.registry, options))
    }
}

/// Transform with the built-in registry.
pub fn transform(
    table: &ObservationTable,
    category: &str,
    options: &TransformOptions,
) -> TransformResult<Vec<Series>> {
    Engine::builtin().transform(table, category, options)
}

/// Distinct scenarios of a table, sorted. Empty when it has no `Scenario` column.
pub fn list_scenarios(table: &ObservationTable) -> Vec<String> {
    if !table.has_column(SCENARIO) {
        return Vec::new();
    }
    let scenarios: BTreeSet<String> = (0..table.len())
        .filter_map(|row| table.get(row, SCENARIO).to_key())
        .collect();
    scenarios.into_iter().collect()
}

fn check_columns(
    table: &ObservationTable,
    rule: &CategoryRule,
    options: &TransformOptions,
) -> TransformResult<()> {
    let scenario_column = options.scenario.as_ref().map(|_| SCENARIO);

    for column in rule.required_columns().into_iter().chain(scenario_column) {
        if !table.has_column(column) {
            return Err(TransformError::MissingColumn {
                table: table.name.clone(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Filter rows and accumulate values per (scenario, key, period).
fn aggregate(
    table: &ObservationTable,
    rule: &CategoryRule,
    options: &TransformOptions,
) -> TransformResult<BTreeMap<GroupKey, Accumulator>> {
    let row_filter = rule
        .row_filter
        .as_ref()
        .filter(|filter| table.has_column(&filter.column));
    let has_scenario = table.has_column(SCENARIO);

    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();

    for idx in 0..table.len() {
        if let Some(filter) = row_filter {
            if !filter.matches(table.get(idx, &filter.column)) {
                continue;
            }
        }

        let period = match table.get(idx, PERIOD).as_period() {
            Some(p) => p,
            None => continue,
        };
        if let Some(filter) = &rule.period_filter {
            if !filter.keeps(period) {
                continue;
            }
        }

        let scenario = if has_scenario {
            table.get(idx, SCENARIO).to_key()
        } else {
            None
        };
        if let Some(wanted) = &options.scenario {
            if scenario.as_deref() != Some(wanted.as_str()) {
                continue;
            }
        }

        let code = if rule.key.needs_code() {
            match table.get(idx, COMMODITY).to_key() {
                Some(code) => code,
                None => continue,
            }
        } else {
            String::new()
        };
        let key = match rule.key.derive(&code, &rule.category) {
            Some(key) => key,
            None => continue,
        };

        let value = match table.get(idx, &rule.value_column) {
            CellValue::Missing => continue,
            cell => cell.as_f64().ok_or_else(|| TransformError::InvalidValue {
                row: idx + 1,
                column: rule.value_column.clone(),
                value: cell.to_key().unwrap_or_default(),
            })?,
        };

        groups
            .entry((scenario, key, period))
            .or_default()
            .add(value);
    }

    Ok(groups)
}

/// Fold ordered groups into series, applying unit scale and labels.
fn assemble(
    groups: BTreeMap<GroupKey, Accumulator>,
    rule: &CategoryRule,
    registry: &RuleRegistry,
    options: &TransformOptions,
) -> Vec<Series> {
    let mut series: Vec<Series> = Vec::new();

    for ((scenario, key, period), acc) in groups {
        let mut value = acc.finish(rule.aggregation);
        if let Some(scale) = options.unit_scale {
            value = scale.apply(value);
        }
        let point = SeriesPoint { period, value };

        match series.last_mut() {
            Some(last) if last.key == key && last.scenario == scenario => last.points.push(point),
            _ => series.push(Series {
                label: registry.labels().resolve(&key).to_string(),
                key,
                scenario,
                shape: rule.chart.shape,
                points: vec![point],
            }),
        }
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChartShape;
    use crate::rules::{KeyDerivation, PeriodFilter, RowFilter, RulesConfig};

    fn table(name: &str, headers: &[&str], rows: &[&[&str]]) -> ObservationTable {
        let records: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
        ObservationTable::from_records(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            &records,
        )
    }

    fn registry(rules: Vec<CategoryRule>, labels: &[(&str, &str)]) -> RuleRegistry {
        RuleRegistry::from_config(RulesConfig {
            version: "1.0".into(),
            description: String::new(),
            rules,
            labels: crate::rules::LabelEntries(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        })
        .unwrap()
    }

    fn first_three() -> RuleRegistry {
        registry(
            vec![CategoryRule::new(
                "emission",
                KeyDerivation::first_n(3),
                ChartShape::Line,
            )],
            &[("ELC", "Electricity")],
        )
    }

    #[test]
    fn test_aggregates_by_derived_key() {
        let registry = first_three();
        let engine = Engine::new(&registry);
        let t = table(
            "emission",
            &["Commodity", "Period", "Pv"],
            &[&["ELC1", "2020", "5"], &["ELC2", "2020", "3"]],
        );

        let series = engine
            .transform(&t, "emission", &TransformOptions::default())
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].key, "ELC");
        assert_eq!(series[0].label, "Electricity");
        assert_eq!(series[0].points, vec![SeriesPoint { period: 2020, value: 8.0 }]);
    }

    #[test]
    fn test_output_is_sorted_and_deterministic() {
        let registry = first_three();
        let engine = Engine::new(&registry);
        let t = table(
            "emission",
            &["Commodity", "Period", "Pv"],
            &[
                &["TRA1", "2030", "1"],
                &["ELC1", "2025", "2"],
                &["TRA2", "2020", "3"],
                &["ELC2", "2020", "4"],
            ],
        );
        let options = TransformOptions::default();

        let first = engine.transform(&t, "emission", &options).unwrap();
        let second = engine.transform(&t, "emission", &options).unwrap();
        assert_eq!(first, second);

        let keys: Vec<&str> = first.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["ELC", "TRA"]);
        assert_eq!(first[0].periods(), vec![2020, 2025]);
        assert_eq!(first[1].periods(), vec![2020, 2030]);
    }

    #[test]
    fn test_row_order_does_not_change_result() {
        let registry = first_three();
        let engine = Engine::new(&registry);
        let forward = table(
            "emission",
            &["Commodity", "Period", "Pv"],
            &[&["ELC1", "2020", "1.5"], &["ELC2", "2020", "2.5"], &["IND1", "2020", "4"]],
        );
        let backward = table(
            "emission",
            &["Commodity", "Period", "Pv"],
            &[&["IND1", "2020", "4"], &["ELC2", "2020", "2.5"], &["ELC1", "2020", "1.5"]],
        );
        let options = TransformOptions::default();

        assert_eq!(
            engine.transform(&forward, "emission", &options).unwrap(),
            engine.transform(&backward, "emission", &options).unwrap()
        );
    }

    #[test]
    fn test_period_alignment_filter() {
        let registry = registry(
            vec![CategoryRule::new("eleccap", KeyDerivation::Total, ChartShape::Line)
                .with_period_filter(PeriodFilter::default())],
            &[],
        );
        let t = table(
            "eleccap",
            &["Period", "Pv"],
            &[&["2018", "1"], &["2020", "1"], &["2021", "1"], &["2025", "1"]],
        );

        let series = Engine::new(&registry)
            .transform(&t, "eleccap", &TransformOptions::default())
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].periods(), vec![2020, 2025]);
    }

    #[test]
    fn test_timeslice_filter_applied_before_aggregation() {
        let registry = registry(
            vec![CategoryRule::new("emission", KeyDerivation::first_n(3), ChartShape::Line)
                .with_row_filter(RowFilter::new("Timeslice", "ANNUAL"))],
            &[],
        );
        let t = table(
            "emission",
            &["Commodity", "Period", "Timeslice", "Pv"],
            &[
                &["ELC1", "2020", "ANNUAL", "10"],
                &["ELC1", "2020", "SUMMER", "4"],
                &["ELC1", "2020", "WINTER", "6"],
            ],
        );

        let series = Engine::new(&registry)
            .transform(&t, "emission", &TransformOptions::default())
            .unwrap();

        assert_eq!(series[0].value_at(2020), Some(10.0));
    }

    #[test]
    fn test_row_filter_skipped_without_column() {
        let registry = registry(
            vec![CategoryRule::new("emission", KeyDerivation::first_n(3), ChartShape::Line)
                .with_row_filter(RowFilter::new("Timeslice", "ANNUAL"))],
            &[],
        );
        let t = table(
            "emission",
            &["Commodity", "Period", "Pv"],
            &[&["ELC1", "2020", "1"], &["ELC2", "2020", "2"]],
        );

        let series = Engine::new(&registry)
            .transform(&t, "emission", &TransformOptions::default())
            .unwrap();

        assert_eq!(series[0].value_at(2020), Some(3.0));
    }

    #[test]
    fn test_suffix_strip_rule() {
        let registry = registry(
            vec![CategoryRule::new(
                "resmix",
                KeyDerivation::last_n_stripping(3, &["HOUSE"]),
                ChartShape::StackedBar,
            )],
            &[("RES", "Residential")],
        );
        let t = table(
            "resmix",
            &["Commodity", "Period", "Pv"],
            &[&["RESHOUSE", "2020", "7"], &["RESELC", "2020", "2"]],
        );

        let series = Engine::new(&registry)
            .transform(&t, "resmix", &TransformOptions::default())
            .unwrap();

        let keys: Vec<&str> = series.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["ELC", "RES"]);
        assert_eq!(series[1].label, "Residential");
        assert_eq!(series[1].shape, ChartShape::StackedBar);
    }

    #[test]
    fn test_label_fallback_is_identity() {
        let registry = first_three();
        let t = table("emission", &["Commodity", "Period", "Pv"], &[&["ZZZ9", "2020", "1"]]);

        let series = Engine::new(&registry)
            .transform(&t, "emission", &TransformOptions::default())
            .unwrap();

        assert_eq!(series[0].key, "ZZZ");
        assert_eq!(series[0].label, "ZZZ");
    }

    #[test]
    fn test_unit_scale_mt() {
        let registry = first_three();
        let t = table(
            "emission",
            &["Commodity", "Period", "Pv"],
            &[&["ELC1", "2020", "600"], &["ELC2", "2020", "400"]],
        );
        let options = TransformOptions::default().with_unit_scale(UnitScale::Mt);

        let series = Engine::new(&registry).transform(&t, "emission", &options).unwrap();

        assert_eq!(series[0].value_at(2020), Some(1.0));
    }

    #[test]
    fn test_mean_aggregation() {
        let registry = registry(
            vec![CategoryRule::new("co2price", KeyDerivation::Total, ChartShape::Line)
                .with_aggregation(Aggregation::Mean)],
            &[],
        );
        let t = table(
            "co2price",
            &["Region", "Period", "Pv"],
            &[&["A", "2030", "40"], &["B", "2030", "60"]],
        );

        let series = Engine::new(&registry)
            .transform(&t, "co2price", &TransformOptions::default())
            .unwrap();

        assert_eq!(series[0].key, "co2price");
        assert_eq!(series[0].value_at(2030), Some(50.0));
    }

    #[test]
    fn test_missing_commodity_column() {
        let registry = first_three();
        let t = table("emission", &["Period", "Pv"], &[&["2020", "1"]]);

        let result = Engine::new(&registry).transform(&t, "emission", &TransformOptions::default());

        assert_eq!(
            result,
            Err(TransformError::MissingColumn {
                table: "emission".into(),
                column: "Commodity".into(),
            })
        );
    }

    #[test]
    fn test_unknown_category() {
        let registry = first_three();
        let t = table("notes", &["Commodity", "Period", "Pv"], &[&["ELC", "2020", "1"]]);

        let result = Engine::new(&registry).transform(&t, "notes", &TransformOptions::default());

        assert_eq!(result, Err(TransformError::UnknownCategory("notes".into())));
    }

    #[test]
    fn test_everything_filtered_is_empty_result() {
        let registry = registry(
            vec![CategoryRule::new("eleccap", KeyDerivation::Total, ChartShape::Line)
                .with_period_filter(PeriodFilter::default())],
            &[],
        );
        let t = table("eleccap", &["Period", "Pv"], &[&["2021", "1"], &["2023", "1"]]);

        let result = Engine::new(&registry).transform(&t, "eleccap", &TransformOptions::default());

        assert_eq!(result, Err(TransformError::EmptyResult("eleccap".into())));
    }

    #[test]
    fn test_empty_table_is_empty_result() {
        let registry = first_three();
        let t = table("emission", &["Commodity", "Period", "Pv"], &[]);

        let result = Engine::new(&registry).transform(&t, "emission", &TransformOptions::default());

        assert_eq!(result, Err(TransformError::EmptyResult("emission".into())));
    }

    #[test]
    fn test_non_numeric_value_reported() {
        let registry = first_three();
        let t = table(
            "emission",
            &["Commodity", "Period", "Pv"],
            &[&["ELC1", "2020", "1"], &["ELC2", "2020", "lots"]],
        );

        let result = Engine::new(&registry).transform(&t, "emission", &TransformOptions::default());

        assert_eq!(
            result,
            Err(TransformError::InvalidValue {
                row: 2,
                column: "Pv".into(),
                value: "lots".into(),
            })
        );
    }

    #[test]
    fn test_missing_cells_are_skipped() {
        let registry = first_three();
        let t = table(
            "emission",
            &["Commodity", "Period", "Pv"],
            &[
                &["ELC1", "2020", "1"],
                &["", "2020", "50"],
                &["ELC2", "", "50"],
                &["ELC3", "2020", ""],
            ],
        );

        let series = Engine::new(&registry)
            .transform(&t, "emission", &TransformOptions::default())
            .unwrap();

        assert_eq!(series[0].points, vec![SeriesPoint { period: 2020, value: 1.0 }]);
    }

    #[test]
    fn test_scenarios_split_series() {
        let registry = first_three();
        let t = table(
            "emission",
            &["Scenario", "Commodity", "Period", "Pv"],
            &[
                &["NetZero", "ELC1", "2020", "1"],
                &["Base", "ELC1", "2020", "5"],
                &["Base", "ELC2", "2020", "5"],
            ],
        );

        let series = Engine::new(&registry)
            .transform(&t, "emission", &TransformOptions::default())
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].scenario.as_deref(), Some("Base"));
        assert_eq!(series[0].value_at(2020), Some(10.0));
        assert_eq!(series[1].scenario.as_deref(), Some("NetZero"));
        assert_eq!(series[1].value_at(2020), Some(1.0));
    }

    #[test]
    fn test_scenario_selection() {
        let registry = first_three();
        let t = table(
            "emission",
            &["Scenario", "Commodity", "Period", "Pv"],
            &[&["NetZero", "ELC1", "2020", "1"], &["Base", "ELC1", "2020", "5"]],
        );
        let options = TransformOptions::default().with_scenario("NetZero");

        let series = Engine::new(&registry).transform(&t, "emission", &options).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value_at(2020), Some(1.0));
    }

    #[test]
    fn test_scenario_selection_needs_column() {
        let registry = first_three();
        let t = table("emission", &["Commodity", "Period", "Pv"], &[&["ELC1", "2020", "1"]]);
        let options = TransformOptions::default().with_scenario("Base");

        let result = Engine::new(&registry).transform(&t, "emission", &options);

        assert!(matches!(result, Err(TransformError::MissingColumn { column, .. }) if column == "Scenario"));
    }

    #[test]
    fn test_input_table_untouched() {
        let registry = first_three();
        let t = table("emission", &["Commodity", "Period", "Pv"], &[&["ELC1", "2020", "1"]]);
        let before = t.clone();

        let _ = Engine::new(&registry).transform(&t, "emission", &TransformOptions::default());

        assert_eq!(t, before);
    }

    #[test]
    fn test_list_scenarios() {
        let t = table(
            "emission",
            &["Scenario", "Commodity"],
            &[&["NetZero", "A"], &["Base", "B"], &["Base", "C"]],
        );
        assert_eq!(list_scenarios(&t), vec!["Base", "NetZero"]);
    }

    #[test]
    fn test_unit_scale_parsing() {
        assert_eq!("MT".parse::<UnitScale>(), Ok(UnitScale::Mt));
        assert_eq!(" kt ".parse::<UnitScale>(), Ok(UnitScale::Kt));
        assert!("tonnes".parse::<UnitScale>().is_err());
    }

    #[test]
    fn test_builtin_engine_resmix() {
        let t = table(
            "resmix",
            &["Commodity", "Period", "Timeslice", "Pv"],
            &[
                &["RESHOUSE", "2020", "DAY", "1"],
                &["RESHOUSE", "2020", "NIGHT", "2"],
                &["RESELC", "2021", "ANNUAL", "9"],
            ],
        );

        let series = transform(&t, "resmix", &TransformOptions::default()).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "Residential");
        assert_eq!(series[0].value_at(2020), Some(3.0));
    }
}
