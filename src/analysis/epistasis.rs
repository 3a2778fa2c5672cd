// ==============================================================================
// epistasis.rs - Gene-Gene Interaction Detector
// ==============================================================================
// Description: Evaluates multi-gene rules against statuses produced by the
//              lifestyle interpreter, pharmacogene caller and APOE caller
// Author: Matt Barham
// Created: 2025-12-16
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// Severity per matched gene:
//   max(status severity, default 0.5) × (0.5 + 0.5·min(magnitude / 6, 1))
// Interaction severity is the geometric mean over the condition's genes.
// ==============================================================================

use super::apoe::{ApoeResult, APOE_GENE};
use super::lifestyle::LifestyleResult;
use super::pharmacogenes::PharmacogeneResult;
use super::AnalysisError;
use crate::parsers::lifestyle::MAX_MAGNITUDE;
use crate::parsers::{EpistasisCondition, EpistasisRuleSet, RiskLevel};
use crate::reference_data::DatabaseSlot;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

const DEFAULT_STATUS_SEVERITY: f64 = 0.5;
/// Magnitude assumed for sources that do not grade their calls
const DEFAULT_MAGNITUDE: u8 = 3;
const DOWNGRADE_BELOW: f64 = 0.3;
const UPGRADE_FROM: f64 = 0.7;

/// Statuses known for one gene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneStatus {
    pub statuses: BTreeSet<String>,
    pub magnitude: u8,
}

/// gene -> statuses gathered from every upstream caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBoard {
    genes: HashMap<String, GeneStatus>,
}

impl StatusBoard {
    /// Merge statuses from whichever upstream results are available
    pub fn collect(
        lifestyle: Option<&LifestyleResult>,
        pharmacogenes: Option<&PharmacogeneResult>,
        apoe: Option<&ApoeResult>,
    ) -> Self {
        let mut board = StatusBoard::default();

        if let Some(lifestyle) = lifestyle {
            for (gene, (statuses, magnitude)) in lifestyle.gene_statuses() {
                for status in statuses {
                    board.insert(&gene, status, magnitude);
                }
            }
        }
        if let Some(pgx) = pharmacogenes {
            for (gene, phenotype) in pgx.gene_phenotypes() {
                board.insert(&gene, phenotype, DEFAULT_MAGNITUDE);
            }
        }
        if let Some(key) = apoe.and_then(ApoeResult::status_key) {
            board.insert(APOE_GENE, key, DEFAULT_MAGNITUDE);
        }

        board
    }

    pub fn insert(&mut self, gene: &str, status: String, magnitude: u8) {
        let entry = self.genes.entry(gene.to_string()).or_default();
        entry.statuses.insert(status);
        entry.magnitude = entry.magnitude.max(magnitude);
    }

    pub fn get(&self, gene: &str) -> Option<&GeneStatus> {
        self.genes.get(gene)
    }

    pub fn has_data(&self, gene: &str) -> bool {
        self.genes.contains_key(gene)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub rule_id: String,
    pub name: String,
    /// gene -> qualifying statuses observed
    pub genes_involved: BTreeMap<String, Vec<String>>,
    pub effect: String,
    pub risk_level: RiskLevel,
    /// Risk level as written in the rule, before severity adjustment
    pub base_risk_level: RiskLevel,
    pub mechanism: String,
    pub recommendations: Vec<String>,
    pub severity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpistasisResult {
    /// High risk first, then descending severity
    pub interactions: Vec<Interaction>,
    pub rules_evaluated: usize,
    /// Rules skipped because a named gene had no status data
    pub not_evaluated: Vec<String>,
    pub genes_with_status: usize,
}

/// Apply the severity adjustment to a rule's base risk
pub fn adjust_risk(base: RiskLevel, severity: f64) -> RiskLevel {
    match base {
        RiskLevel::High if severity < DOWNGRADE_BELOW => RiskLevel::Moderate,
        RiskLevel::Moderate if severity >= UPGRADE_FROM => RiskLevel::High,
        other => other,
    }
}

fn gene_severity(status_severity: &HashMap<String, f64>, matched: &[String], magnitude: u8) -> f64 {
    let severity = matched
        .iter()
        .map(|s| status_severity.get(s).copied().unwrap_or(DEFAULT_STATUS_SEVERITY))
        .fold(f64::MIN, f64::max);
    let magnitude_factor = (f64::from(magnitude) / f64::from(MAX_MAGNITUDE)).min(1.0);
    severity * (0.5 + 0.5 * magnitude_factor)
}

/// Evaluate one condition; `None` unless every named gene has a qualifying status
fn evaluate_condition(
    condition: &EpistasisCondition,
    board: &StatusBoard,
    status_severity: &HashMap<String, f64>,
) -> Option<(BTreeMap<String, Vec<String>>, f64)> {
    let mut matched_genes = BTreeMap::new();
    let mut severities = Vec::new();

    for (gene, qualifying) in &condition.required {
        let status = board.get(gene)?;
        let overlap: Vec<String> = qualifying
            .iter()
            .filter(|s| status.statuses.contains(s.as_str()))
            .cloned()
            .collect();
        if overlap.is_empty() {
            return None;
        }
        severities.push(gene_severity(status_severity, &overlap, status.magnitude));
        matched_genes.insert(gene.clone(), overlap);
    }

    if severities.is_empty() {
        return None;
    }
    let product: f64 = severities.iter().product();
    let severity = product.powf(1.0 / severities.len() as f64);

    Some((matched_genes, severity))
}

/// Evaluate every rule against the status board
///
/// # Arguments
/// * `rules` - Interaction rules and the status-severity table
/// * `board` - Gene statuses from upstream callers
///
/// # Returns
/// * `EpistasisResult` - Fired interactions; a rule never fires on partial data
pub fn detect(rules: &EpistasisRuleSet, board: &StatusBoard) -> EpistasisResult {
    info!(
        "Evaluating {} interaction rules over {} genes with status data",
        rules.rules.len(),
        board.len()
    );

    let mut interactions = Vec::new();
    let mut not_evaluated = Vec::new();

    for rule in &rules.rules {
        let mut fired = false;
        for condition in &rule.conditions {
            if let Some((genes_involved, severity)) = evaluate_condition(condition, board, &rules.status_severity) {
                fired = true;
                let risk_level = adjust_risk(condition.risk_level, severity);
                debug!("{} fired (severity {:.2}, {:?})", rule.id, severity, risk_level);
                interactions.push(Interaction {
                    rule_id: rule.id.clone(),
                    name: rule.name.clone(),
                    genes_involved,
                    effect: condition.effect.clone(),
                    risk_level,
                    base_risk_level: condition.risk_level,
                    mechanism: condition.mechanism.clone(),
                    recommendations: condition.recommendations.clone(),
                    severity: (severity * 100.0).round() / 100.0,
                });
            }
        }

        let missing_data = rule
            .conditions
            .iter()
            .flat_map(|c| c.required.keys())
            .any(|gene| !board.has_data(gene));
        if !fired && missing_data {
            not_evaluated.push(rule.name.clone());
        }
    }

    interactions.sort_by(|a, b| {
        b.risk_level
            .cmp(&a.risk_level)
            .then_with(|| b.severity.total_cmp(&a.severity))
    });

    info!(
        "Interactions: {} fired, {} rules lacked data",
        interactions.len(),
        not_evaluated.len()
    );

    EpistasisResult {
        interactions,
        rules_evaluated: rules.rules.len() - not_evaluated.len(),
        not_evaluated,
        genes_with_status: board.len(),
    }
}

pub fn run(
    rules: &DatabaseSlot<EpistasisRuleSet>,
    lifestyle: Option<&LifestyleResult>,
    pharmacogenes: Option<&PharmacogeneResult>,
    apoe: Option<&ApoeResult>,
) -> Result<EpistasisResult, AnalysisError> {
    let loaded = rules.require("epistasis")?;
    let board = StatusBoard::collect(lifestyle, pharmacogenes, apoe);
    Ok(detect(&loaded.data, &board))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::EpistasisRule;

    fn condition(required: &[(&str, &[&str])], risk: RiskLevel) -> EpistasisCondition {
        EpistasisCondition {
            required: required
                .iter()
                .map(|(g, s)| (g.to_string(), s.iter().map(|x| x.to_string()).collect()))
                .collect(),
            effect: "effect".to_string(),
            risk_level: risk,
            mechanism: "mechanism".to_string(),
            recommendations: vec!["rec".to_string()],
        }
    }

    fn rules() -> EpistasisRuleSet {
        EpistasisRuleSet {
            status_severity: [("slow", 1.0), ("reduced", 0.5), ("poor", 1.0)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            rules: vec![
                EpistasisRule {
                    id: "mthfr_comt".to_string(),
                    name: "MTHFR + COMT".to_string(),
                    genes: vec!["MTHFR".to_string(), "COMT".to_string()],
                    conditions: vec![condition(
                        &[("MTHFR", &["reduced", "severely_reduced"]), ("COMT", &["slow"])],
                        RiskLevel::High,
                    )],
                },
                EpistasisRule {
                    id: "cyp_apoe".to_string(),
                    name: "CYP2C19 + APOE".to_string(),
                    genes: vec!["CYP2C19".to_string(), "APOE".to_string()],
                    conditions: vec![condition(&[("CYP2C19", &["poor"]), ("APOE", &["e3_e4"])], RiskLevel::Moderate)],
                },
            ],
        }
    }

    #[test]
    fn test_rule_requires_all_genes() {
        let mut board = StatusBoard::default();
        board.insert("MTHFR", "reduced".to_string(), 3);

        let result = detect(&rules(), &board);
        assert!(result.interactions.is_empty());
        assert!(result.not_evaluated.contains(&"MTHFR + COMT".to_string()));

        board.insert("COMT", "slow".to_string(), 3);
        let result = detect(&rules(), &board);
        assert_eq!(result.interactions.len(), 1);
        assert_eq!(result.interactions[0].rule_id, "mthfr_comt");
    }

    #[test]
    fn test_non_qualifying_status_does_not_fire() {
        let mut board = StatusBoard::default();
        board.insert("MTHFR", "normal".to_string(), 1);
        board.insert("COMT", "slow".to_string(), 3);

        let result = detect(&rules(), &board);
        assert!(result.interactions.is_empty());
        assert!(!result.not_evaluated.contains(&"MTHFR + COMT".to_string()));
    }

    #[test]
    fn test_severity_geometric_mean() {
        let mut board = StatusBoard::default();
        board.insert("MTHFR", "reduced".to_string(), 0);
        board.insert("COMT", "slow".to_string(), 0);

        let result = detect(&rules(), &board);
        let interaction = &result.interactions[0];
        // sqrt(0.25 × 0.5)
        assert!((interaction.severity - 0.35).abs() < 1e-9);
        assert_eq!(interaction.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_adjust_risk() {
        assert_eq!(adjust_risk(RiskLevel::High, 0.29), RiskLevel::Moderate);
        assert_eq!(adjust_risk(RiskLevel::High, 0.3), RiskLevel::High);
        assert_eq!(adjust_risk(RiskLevel::Moderate, 0.7), RiskLevel::High);
        assert_eq!(adjust_risk(RiskLevel::Low, 0.9), RiskLevel::Low);
    }

    #[test]
    fn test_cross_caller_rule_and_ordering() {
        let mut board = StatusBoard::default();
        board.insert("CYP2C19", "poor".to_string(), DEFAULT_MAGNITUDE);
        board.insert(APOE_GENE, "e3_e4".to_string(), DEFAULT_MAGNITUDE);
        board.insert("MTHFR", "reduced".to_string(), 6);
        board.insert("COMT", "slow".to_string(), 6);

        let result = detect(&rules(), &board);
        assert_eq!(result.interactions.len(), 2);
        assert_eq!(result.interactions[0].risk_level, RiskLevel::High);
        assert!(result.not_evaluated.is_empty());
        assert_eq!(result.rules_evaluated, 2);
    }
}
