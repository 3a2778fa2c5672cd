// ==============================================================================
// polypharmacy.rs - Combined Pharmacogenomic Risk Assessment
// ==============================================================================
// Description: Flags drug classes put at risk by several pharmacogene
//              statuses acting on the same pathway
// Author: Matt Barham
// Created: 2026-01-22
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// A rule fires only when every gene it names has at least one qualifying
// status on the board. Statuses come from the pharmacogene caller (metabolizer
// keys) and the lifestyle interpreter (curated statuses).
// ==============================================================================

use super::epistasis::StatusBoard;
use super::lifestyle::LifestyleResult;
use super::pharmacogenes::PharmacogeneResult;
use super::AnalysisError;
use crate::parsers::RiskLevel;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

struct PolypharmacyRule {
    id: &'static str,
    name: &'static str,
    /// gene -> statuses that qualify
    genes: &'static [(&'static str, &'static [&'static str])],
    drugs_affected: &'static [&'static str],
    severity: RiskLevel,
    warning: &'static str,
    action: &'static str,
}

const RULES: [PolypharmacyRule; 9] = [
    PolypharmacyRule {
        id: "warfarin_compound",
        name: "Warfarin Compound Sensitivity",
        genes: &[("CYP2C9", &["poor", "intermediate"]), ("VKORC1", &["sensitive", "highly_sensitive"])],
        drugs_affected: &["warfarin", "acenocoumarol"],
        severity: RiskLevel::High,
        warning: "Reduced CYP2C9 metabolism combined with increased VKORC1 sensitivity compounds warfarin \
                  sensitivity. Standard doses may cause dangerous bleeding; 50-80% dose reduction is typical.",
        action: "Use a dosing algorithm that incorporates both CYP2C9 and VKORC1 genotypes. Consider direct \
                 oral anticoagulants as alternatives. INR monitoring is critical.",
    },
    PolypharmacyRule {
        id: "opioid_sensitivity",
        name: "Opioid Response Complexity",
        genes: &[("CYP2D6", &["poor", "intermediate"]), ("OPRM1", &["altered", "significantly_altered"])],
        drugs_affected: &["codeine", "tramadol", "oxycodone", "hydrocodone"],
        severity: RiskLevel::High,
        warning: "Reduced CYP2D6 activity limits conversion of codeine and tramadol to active metabolites. \
                  With altered opioid receptor sensitivity, pain relief may be minimal or unpredictable.",
        action: "Avoid prodrug opioids that require CYP2D6 activation. Use morphine or non-opioid \
                 alternatives, titrated with pain specialist guidance.",
    },
    PolypharmacyRule {
        id: "ssri_sensitivity",
        name: "SSRI/Antidepressant Sensitivity",
        genes: &[("CYP2C19", &["poor", "intermediate"]), ("COMT", &["slow"])],
        drugs_affected: &["citalopram", "escitalopram", "sertraline", "amitriptyline"],
        severity: RiskLevel::Moderate,
        warning: "Slow CYP2C19 metabolism raises SSRI blood levels. Combined with slow COMT, serotonergic \
                  and activation side effects are more likely.",
        action: "Start SSRIs at half the standard dose and monitor for agitation or serotonergic symptoms. \
                 Consider bupropion or mirtazapine as alternatives.",
    },
    PolypharmacyRule {
        id: "statin_myopathy",
        name: "Statin Myopathy Risk",
        genes: &[("SLCO1B1", &["intermediate", "poor"])],
        drugs_affected: &["simvastatin", "atorvastatin", "rosuvastatin"],
        severity: RiskLevel::Moderate,
        warning: "Reduced SLCO1B1 transport raises statin blood levels and simvastatin myopathy risk 5-17x, \
                  higher still with concurrent CYP3A4 inhibitors.",
        action: "Avoid simvastatin above 20 mg. Prefer pravastatin or rosuvastatin and avoid concurrent \
                 CYP3A4 inhibitors. Check CK if muscle symptoms appear.",
    },
    PolypharmacyRule {
        id: "chemo_toxicity",
        name: "Chemotherapy Toxicity Risk",
        genes: &[("DPYD", &["poor", "intermediate"])],
        drugs_affected: &["5-fluorouracil", "capecitabine", "tegafur"],
        severity: RiskLevel::High,
        warning: "DPYD deficiency can cause fatal fluoropyrimidine toxicity. Partial deficiency still \
                  requires a 50% dose reduction.",
        action: "Intermediate metabolizers: reduce dose by 50%. Poor metabolizers: contraindicated; consider \
                 alternative regimens.",
    },
    PolypharmacyRule {
        id: "thiopurine_toxicity",
        name: "Thiopurine Myelosuppression Risk",
        genes: &[("TPMT", &["poor", "intermediate"])],
        drugs_affected: &["azathioprine", "6-mercaptopurine", "thioguanine"],
        severity: RiskLevel::High,
        warning: "TPMT deficiency leads to accumulation of cytotoxic thioguanine nucleotides and \
                  life-threatening myelosuppression.",
        action: "Intermediate metabolizers: reduce thiopurine dose by 30-50%. Poor metabolizers: reduce by \
                 90% or use an alternative. Monitor CBC weekly for the first 8 weeks.",
    },
    PolypharmacyRule {
        id: "cyp2d6_ultrarapid_codeine",
        name: "Ultrarapid CYP2D6 + Codeine Toxicity",
        genes: &[("CYP2D6", &["ultrarapid", "rapid"])],
        drugs_affected: &["codeine", "tramadol"],
        severity: RiskLevel::High,
        warning: "Ultrarapid CYP2D6 metabolism converts codeine to morphine too quickly, risking respiratory \
                  depression.",
        action: "Avoid codeine completely. Use morphine, NSAIDs or acetaminophen instead.",
    },
    PolypharmacyRule {
        id: "ppi_reduced_efficacy",
        name: "PPI Reduced Efficacy (Ultrarapid CYP2C19)",
        genes: &[("CYP2C19", &["ultrarapid", "rapid"])],
        drugs_affected: &["omeprazole", "lansoprazole", "pantoprazole"],
        severity: RiskLevel::Moderate,
        warning: "Rapid CYP2C19 clearance reduces proton pump inhibitor acid suppression and H. pylori \
                  eradication rates.",
        action: "Increase the PPI dose or switch to rabeprazole, which depends less on CYP2C19.",
    },
    PolypharmacyRule {
        id: "clopidogrel_resistance",
        name: "Clopidogrel Resistance (Poor CYP2C19)",
        genes: &[("CYP2C19", &["poor", "intermediate"])],
        drugs_affected: &["clopidogrel"],
        severity: RiskLevel::High,
        warning: "CYP2C19 activates clopidogrel. Reduced function lowers the antiplatelet effect and raises \
                  the risk of stent thrombosis.",
        action: "Use prasugrel or ticagrelor, which do not depend on CYP2C19.",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolypharmacyWarning {
    pub id: String,
    pub name: String,
    pub severity: RiskLevel,
    /// gene -> qualifying statuses observed
    pub matched_genes: BTreeMap<String, Vec<String>>,
    pub drugs_affected: Vec<String>,
    pub warning: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolypharmacyResult {
    /// High severity first, rule order within a tier
    pub warnings: Vec<PolypharmacyWarning>,
    pub total_warnings: usize,
    pub by_severity: SeverityCounts,
    pub genes_with_status: usize,
}

fn matched_genes(rule: &PolypharmacyRule, board: &StatusBoard) -> Option<BTreeMap<String, Vec<String>>> {
    let mut matched = BTreeMap::new();
    for (gene, qualifying) in rule.genes {
        let status = board.get(gene)?;
        let overlap: Vec<String> = qualifying
            .iter()
            .filter(|s| status.statuses.contains(**s))
            .map(|s| s.to_string())
            .collect();
        if overlap.is_empty() {
            return None;
        }
        matched.insert(gene.to_string(), overlap);
    }
    Some(matched)
}

/// Evaluate the built-in rules against the status board
pub fn assess(board: &StatusBoard) -> PolypharmacyResult {
    let mut warnings: Vec<PolypharmacyWarning> = RULES
        .iter()
        .filter_map(|rule| {
            let matched_genes = matched_genes(rule, board)?;
            debug!("Polypharmacy rule {} fired", rule.id);
            Some(PolypharmacyWarning {
                id: rule.id.to_string(),
                name: rule.name.to_string(),
                severity: rule.severity,
                matched_genes,
                drugs_affected: rule.drugs_affected.iter().map(|d| d.to_string()).collect(),
                warning: rule.warning.to_string(),
                action: rule.action.to_string(),
            })
        })
        .collect();
    warnings.sort_by(|a, b| b.severity.cmp(&a.severity));

    let mut by_severity = SeverityCounts::default();
    for warning in &warnings {
        match warning.severity {
            RiskLevel::High => by_severity.high += 1,
            RiskLevel::Moderate => by_severity.moderate += 1,
            RiskLevel::Low => by_severity.low += 1,
        }
    }

    info!(
        "Polypharmacy: {} warnings ({} high) over {} genes with status",
        warnings.len(),
        by_severity.high,
        board.len()
    );

    PolypharmacyResult {
        total_warnings: warnings.len(),
        warnings,
        by_severity,
        genes_with_status: board.len(),
    }
}

pub fn run(
    lifestyle: Option<&LifestyleResult>,
    pharmacogenes: Option<&PharmacogeneResult>,
) -> Result<PolypharmacyResult, AnalysisError> {
    if lifestyle.is_none() && pharmacogenes.is_none() {
        return Err(AnalysisError::MissingData(
            "pharmacogene and lifestyle statuses".to_string(),
        ));
    }
    let board = StatusBoard::collect(lifestyle, pharmacogenes, None);
    Ok(assess(&board))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(statuses: &[(&str, &str)]) -> StatusBoard {
        let mut board = StatusBoard::default();
        for (gene, status) in statuses {
            board.insert(gene, status.to_string(), 3);
        }
        board
    }

    #[test]
    fn test_multi_gene_rule_needs_every_gene() {
        let result = assess(&board(&[("CYP2C9", "intermediate")]));
        assert!(result.warnings.iter().all(|w| w.id != "warfarin_compound"));

        let result = assess(&board(&[("CYP2C9", "intermediate"), ("VKORC1", "highly_sensitive")]));
        let warfarin = result.warnings.iter().find(|w| w.id == "warfarin_compound").unwrap();
        assert_eq!(warfarin.matched_genes["VKORC1"], vec!["highly_sensitive".to_string()]);
        assert_eq!(warfarin.severity, RiskLevel::High);
    }

    #[test]
    fn test_high_severity_sorted_first() {
        let result = assess(&board(&[("CYP2C19", "poor"), ("COMT", "slow"), ("SLCO1B1", "poor")]));

        let ids: Vec<&str> = result.warnings.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["clopidogrel_resistance", "ssri_sensitivity", "statin_myopathy"]);
        assert_eq!(result.total_warnings, 3);
        assert_eq!(result.by_severity.high, 1);
        assert_eq!(result.by_severity.moderate, 2);
    }

    #[test]
    fn test_normal_statuses_fire_nothing() {
        let result = assess(&board(&[("CYP2C19", "normal"), ("CYP2D6", "normal"), ("VKORC1", "normal")]));
        assert!(result.warnings.is_empty());
        assert_eq!(result.genes_with_status, 3);
    }

    #[test]
    fn test_no_upstream_results_is_skipped() {
        let err = run(None, None).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingData(_)));
    }
}
