//! Quality gate configuration.

use serde::{Deserialize, Serialize};

use crate::types::Ruleset;

/// Configured rulesets, evaluated in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QualityGateConfig {
    pub rules: Vec<Ruleset>,
}

impl QualityGateConfig {
    pub fn new(rules: Vec<Ruleset>) -> Self {
        Self { rules }
    }

    /// A gate with no rulesets is "not configured".
    pub fn is_configured(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Every rule name referenced by any ruleset, in evaluation order.
    pub fn referenced_rules(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .flat_map(|ruleset| ruleset.entries.iter().map(|entry| entry.rule.as_str()))
    }
}
