// ==============================================================================
// epistasis.rs - Gene Interaction Rule Parser
// ==============================================================================
// Description: Loads multi-gene interaction rules and status severities
// Author: Matt Barham
// Created: 2025-12-15
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================

use super::{Parsed, ReferenceParseError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Risk tier attached to a fired interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// One alternative way a rule can fire
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EpistasisCondition {
    /// gene -> statuses that qualify
    pub required: BTreeMap<String, Vec<String>>,
    pub effect: String,
    pub risk_level: RiskLevel,
    pub mechanism: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpistasisRule {
    pub id: String,
    pub name: String,
    pub genes: Vec<String>,
    pub conditions: Vec<EpistasisCondition>,
}

#[derive(Debug, Clone, Default)]
pub struct EpistasisRuleSet {
    /// status -> severity weight in [0, 1]
    pub status_severity: HashMap<String, f64>,
    pub rules: Vec<EpistasisRule>,
}

// Elements are typed one at a time; a bad one is counted and dropped
#[derive(Debug, Deserialize)]
struct RawRuleSet {
    #[serde(default)]
    status_severity: HashMap<String, Value>,
    rules: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    id: String,
    name: String,
    #[serde(default)]
    genes: Vec<String>,
    conditions: Vec<Value>,
}

fn parse_condition(rule_id: &str, raw: Value) -> Option<EpistasisCondition> {
    match serde_json::from_value::<EpistasisCondition>(raw) {
        Ok(condition) if !condition.required.is_empty() => Some(condition),
        Ok(_) => {
            debug!("Epistasis rule '{}': condition requires no genes", rule_id);
            None
        }
        Err(e) => {
            debug!("Epistasis rule '{}': malformed condition: {}", rule_id, e);
            None
        }
    }
}

impl EpistasisRuleSet {
    /// Parse the rule JSON
    ///
    /// Malformed rules, malformed conditions (unknown risk level, empty
    /// `required` map) and severities outside [0, 1] are dropped and counted;
    /// rules left with no conditions are dropped as well.
    pub fn parse(path: impl AsRef<Path>) -> Result<Parsed<Self>, ReferenceParseError> {
        let file = File::open(path.as_ref())?;
        let raw: RawRuleSet = serde_json::from_reader(BufReader::new(file))?;
        let mut skipped_rows = 0;

        let mut status_severity = HashMap::new();
        for (status, value) in raw.status_severity {
            match value.as_f64().filter(|s| s.is_finite() && (0.0..=1.0).contains(s)) {
                Some(severity) => {
                    status_severity.insert(status, severity);
                }
                None => {
                    debug!("Epistasis severity for '{}' invalid: {}", status, value);
                    skipped_rows += 1;
                }
            }
        }

        let mut rules = Vec::new();
        for raw_rule in raw.rules {
            let raw_rule: RawRule = match serde_json::from_value(raw_rule) {
                Ok(rule) => rule,
                Err(e) => {
                    debug!("Malformed epistasis rule: {}", e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let total = raw_rule.conditions.len();
            let conditions: Vec<EpistasisCondition> = raw_rule
                .conditions
                .into_iter()
                .filter_map(|c| parse_condition(&raw_rule.id, c))
                .collect();
            skipped_rows += total - conditions.len();

            if conditions.is_empty() {
                debug!("Epistasis rule '{}' has no usable conditions", raw_rule.id);
                continue;
            }
            rules.push(EpistasisRule {
                id: raw_rule.id,
                name: raw_rule.name,
                genes: raw_rule.genes,
                conditions,
            });
        }

        if rules.is_empty() {
            return Err(ReferenceParseError::Empty);
        }

        info!(
            "Loaded {} epistasis rules ({} malformed entries skipped)",
            rules.len(),
            skipped_rows
        );

        Ok(Parsed {
            data: EpistasisRuleSet { status_severity, rules },
            skipped_rows,
        })
    }
}
