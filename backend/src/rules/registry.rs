//! Rule Registry - the fixed set of category rules and labels
//!
//! Built once from a declarative JSON document and shared read-only.
//! The built-in document is embedded at compile time from `config/`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use super::labels::{LabelEntries, LabelTable};
use super::rule::CategoryRule;
use crate::error::{RegistryError, RegistryResult};
use crate::validation::validate_rules_config;

/// Environment variable naming an alternative rules file.
pub const RULES_ENV: &str = "TIMESDASH_RULES";

const DEFAULT_RULES: &str = include_str!("../../config/default-rules.json");

static BUILTIN: Lazy<RuleRegistry> = Lazy::new(|| {
    RuleRegistry::from_json(DEFAULT_RULES).expect("Invalid embedded rules configuration")
});

/// Declarative form of the registry, as read from and written to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    pub rules: Vec<CategoryRule>,

    #[serde(default)]
    pub labels: LabelEntries,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Immutable mapping from category name to rule, plus the label lookup.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, CategoryRule>,
    labels: LabelTable,
}

impl RuleRegistry {
    /// The built-in registry, parsed once per process.
    pub fn builtin() -> &'static RuleRegistry {
        &BUILTIN
    }

    /// Build from a parsed configuration.
    ///
    /// Fails on a repeated category, a repeated label code, or an invalid rule.
    pub fn from_config(config: RulesConfig) -> RegistryResult<Self> {
        let mut rules = BTreeMap::new();
        for rule in config.rules {
            rule.validate()?;
            if rules.contains_key(&rule.category) {
                return Err(RegistryError::DuplicateCategory(rule.category));
            }
            rules.insert(rule.category.clone(), rule);
        }

        let labels = LabelTable::from_entries(config.labels.0)?;
        Ok(Self { rules, labels })
    }

    /// Parse, schema-check and build from a JSON document.
    pub fn from_json(json: &str) -> RegistryResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        validate_rules_config(&value).map_err(RegistryError::Schema)?;

        // Re-read from text: the `Value` above has already collapsed repeated label keys.
        let config: RulesConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Load the file named by `TIMESDASH_RULES` (a `.env` file is honoured),
    /// or the built-in rules when unset.
    pub fn from_env() -> RegistryResult<Self> {
        dotenvy::dotenv().ok();

        match env::var(RULES_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::builtin().clone()),
        }
    }

    pub fn get(&self, category: &str) -> Option<&CategoryRule> {
        self.rules.get(category)
    }

    /// Registered category names, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.values()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Declarative form of this registry.
    pub fn to_config(&self) -> RulesConfig {
        RulesConfig {
            version: default_version(),
            description: String::new(),
            rules: self.rules.values().cloned().collect(),
            labels: self.labels.entries(),
        }
    }
}

/// The embedded default configuration, as JSON text.
pub fn default_rules_json() -> &'static str {
    DEFAULT_RULES
}
