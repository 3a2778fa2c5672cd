// ==============================================================================
// lifestyle.rs - Lifestyle Variant Interpreter
// ==============================================================================
// Description: Looks up genotyped positions in the curated lifestyle table and
//              the PharmGKB drug-gene annotations
// Author: Matt Barham
// Created: 2025-12-02
// Modified: 2026-02-09
// Version: 1.1.0
// ==============================================================================

use super::{AnalysisError, ComponentOutcome};
use crate::genotype_converter::lookup_unordered;
use crate::models::GenomeModel;
use crate::parsers::{LifestyleTable, PharmGkbTable};
use crate::reference_data::DatabaseSlot;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Status reported when an observed genotype has no curated key
pub const NO_INTERPRETATION: &str = "no interpretation available";

/// PharmGKB evidence levels reported as findings
pub const REPORTED_EVIDENCE_LEVELS: [&str; 4] = ["1A", "1B", "2A", "2B"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifestyleFinding {
    pub variant_id: String,
    /// Curated entry key when it differs from the variant id ("rs4680_pain")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_key: Option<String>,
    pub gene: String,
    pub category: String,
    pub genotype: String,
    pub status: String,
    pub description: String,
    pub magnitude: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_frequency: Option<BTreeMap<String, f64>>,
}

impl LifestyleFinding {
    pub fn is_interpreted(&self) -> bool {
        self.status != NO_INTERPRETATION
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrugGeneFinding {
    pub variant_id: String,
    pub gene: String,
    pub drugs: String,
    pub genotype: String,
    pub annotation: String,
    pub level: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LifestyleSummary {
    pub analyzed_snps: usize,
    pub uninterpreted_snps: usize,
    pub high_impact: usize,
    pub moderate_impact: usize,
    pub low_impact: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifestyleResult {
    /// Sorted by descending magnitude
    pub findings: Vec<LifestyleFinding>,
    /// category -> finding variant ids in report order
    pub by_category: BTreeMap<String, Vec<String>>,
    pub summary: LifestyleSummary,
    pub drug_gene: ComponentOutcome<Vec<DrugGeneFinding>>,
}

impl LifestyleResult {
    /// gene -> interpreted statuses, with the highest magnitude seen per gene
    pub fn gene_statuses(&self) -> HashMap<String, (Vec<String>, u8)> {
        let mut statuses: HashMap<String, (Vec<String>, u8)> = HashMap::new();
        for finding in self.findings.iter().filter(|f| f.is_interpreted()) {
            let entry = statuses.entry(finding.gene.clone()).or_default();
            if !entry.0.contains(&finding.status) {
                entry.0.push(finding.status.clone());
            }
            entry.1 = entry.1.max(finding.magnitude);
        }
        statuses
    }
}

/// Interpret every curated entry whose variant is genotyped
///
/// # Arguments
/// * `genome` - Subject genotypes
/// * `table` - Curated lifestyle entries
/// * `pharmgkb` - Drug-gene annotations (may be missing)
///
/// # Returns
/// * `LifestyleResult` - One finding per genotyped entry; unknown genotype
///   combinations yield a "no interpretation available" finding
pub fn interpret(genome: &GenomeModel, table: &LifestyleTable, pharmgkb: &DatabaseSlot<PharmGkbTable>) -> LifestyleResult {
    info!("Interpreting {} curated lifestyle variants", table.len());

    let mut findings = Vec::new();
    let mut summary = LifestyleSummary::default();

    for entry in &table.entries {
        let Some(genotype) = genome.genotype(&entry.variant_id) else {
            continue;
        };

        let finding = match lookup_unordered(&entry.genotypes, &genotype) {
            Some(interp) => {
                summary.analyzed_snps += 1;
                match interp.magnitude {
                    m if m >= 3 => summary.high_impact += 1,
                    2 => summary.moderate_impact += 1,
                    1 => summary.low_impact += 1,
                    _ => {}
                }
                LifestyleFinding {
                    variant_id: entry.variant_id.clone(),
                    entry_key: (entry.key != entry.variant_id).then(|| entry.key.clone()),
                    gene: entry.gene.clone(),
                    category: entry.category.clone(),
                    genotype: genotype.to_string(),
                    status: interp.status.clone(),
                    description: interp.description.clone(),
                    magnitude: interp.magnitude,
                    note: entry.note.clone(),
                    population_frequency: entry.population_frequency.clone(),
                }
            }
            None => {
                summary.uninterpreted_snps += 1;
                LifestyleFinding {
                    variant_id: entry.variant_id.clone(),
                    entry_key: (entry.key != entry.variant_id).then(|| entry.key.clone()),
                    gene: entry.gene.clone(),
                    category: entry.category.clone(),
                    genotype: genotype.to_string(),
                    status: NO_INTERPRETATION.to_string(),
                    description: format!("Genotype {} is not in the curated table", genotype),
                    magnitude: 0,
                    note: entry.note.clone(),
                    population_frequency: entry.population_frequency.clone(),
                }
            }
        };
        findings.push(finding);
    }

    // Stable sort keeps table order within a magnitude
    findings.sort_by(|a, b| b.magnitude.cmp(&a.magnitude));

    let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for finding in findings.iter().filter(|f| f.is_interpreted()) {
        by_category
            .entry(finding.category.clone())
            .or_default()
            .push(finding.entry_key.clone().unwrap_or_else(|| finding.variant_id.clone()));
    }

    let drug_gene: ComponentOutcome<Vec<DrugGeneFinding>> = pharmgkb
        .require("pharmgkb")
        .map(|loaded| drug_gene_findings(genome, &loaded.data))
        .into();

    info!(
        "Lifestyle interpretation: {} findings ({} high impact, {} uninterpreted)",
        summary.analyzed_snps, summary.high_impact, summary.uninterpreted_snps
    );

    LifestyleResult {
        findings,
        by_category,
        summary,
        drug_gene,
    }
}

/// PharmGKB findings at reported evidence levels, sorted by level
pub fn drug_gene_findings(genome: &GenomeModel, table: &PharmGkbTable) -> Vec<DrugGeneFinding> {
    let mut findings: Vec<DrugGeneFinding> = table
        .annotations
        .iter()
        .filter(|ann| REPORTED_EVIDENCE_LEVELS.contains(&ann.level.as_str()))
        .filter_map(|ann| {
            let genotype = genome.genotype(&ann.variant_id)?;
            let annotation = lookup_unordered(&ann.genotypes, &genotype)?;
            Some(DrugGeneFinding {
                variant_id: ann.variant_id.clone(),
                gene: ann.gene.clone(),
                drugs: ann.drugs.clone(),
                genotype: genotype.to_string(),
                annotation: annotation.clone(),
                level: ann.level.clone(),
                category: ann.category.clone(),
            })
        })
        .collect();

    findings.sort_by(|a, b| a.level.cmp(&b.level));
    info!("Found {} drug-gene interactions", findings.len());
    findings
}

/// Require the lifestyle table, then interpret
pub fn run(
    genome: &GenomeModel,
    table: &DatabaseSlot<LifestyleTable>,
    pharmgkb: &DatabaseSlot<PharmGkbTable>,
) -> Result<LifestyleResult, AnalysisError> {
    let loaded = table.require("lifestyle")?;
    Ok(interpret(genome, &loaded.data, pharmgkb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genotype, GenotypeCall};
    use crate::parsers::{DrugGeneAnnotation, GenotypeInterpretation, LifestyleEntry};

    fn genome(calls: &[(&str, &str)]) -> GenomeModel {
        GenomeModel::from_calls(calls.iter().enumerate().map(|(i, (id, gt))| GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: "1".to_string(),
            position: i as u64 + 1,
            genotype: Genotype::parse(gt).unwrap(),
        }))
        .0
    }

    fn entry(key: &str, gene: &str, genotypes: &[(&str, &str, u8)]) -> LifestyleEntry {
        LifestyleEntry {
            key: key.to_string(),
            variant_id: key.split('_').next().unwrap().to_string(),
            gene: gene.to_string(),
            category: "Methylation".to_string(),
            genotypes: genotypes
                .iter()
                .map(|(gt, status, magnitude)| {
                    (
                        gt.to_string(),
                        GenotypeInterpretation {
                            status: status.to_string(),
                            description: format!("{} {}", gene, status),
                            magnitude: *magnitude,
                        },
                    )
                })
                .collect(),
            note: None,
            population_frequency: None,
        }
    }

    fn table() -> LifestyleTable {
        LifestyleTable {
            entries: vec![
                entry("rs1801133", "MTHFR", &[("GG", "normal", 0), ("AG", "reduced", 2), ("AA", "severely_reduced", 3)]),
                entry("rs4680", "COMT", &[("GG", "fast", 2), ("AG", "intermediate", 1), ("AA", "slow", 3)]),
                entry("rs4680_pain", "COMT", &[("AA", "high_sensitivity", 2)]),
            ],
        }
    }

    #[test]
    fn test_order_insensitive_lookup() {
        let missing = DatabaseSlot::Missing(Default::default());
        let ag = interpret(&genome(&[("rs1801133", "AG")]), &table(), &missing);
        let ga = interpret(&genome(&[("rs1801133", "GA")]), &table(), &missing);

        assert_eq!(ag.findings[0].status, "reduced");
        assert_eq!(ag.findings[0].status, ga.findings[0].status);
        assert_eq!(ag.findings[0].magnitude, ga.findings[0].magnitude);
        assert_eq!(ag.findings[0].description, ga.findings[0].description);
    }

    #[test]
    fn test_unknown_genotype_is_reported_not_failed() {
        let missing = DatabaseSlot::Missing(Default::default());
        let result = interpret(&genome(&[("rs1801133", "CT")]), &table(), &missing);

        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].status, NO_INTERPRETATION);
        assert_eq!(result.summary.uninterpreted_snps, 1);
        assert!(result.gene_statuses().is_empty());
    }

    #[test]
    fn test_summary_and_sorting() {
        let missing = DatabaseSlot::Missing(Default::default());
        let result = interpret(&genome(&[("rs1801133", "AG"), ("rs4680", "AA")]), &table(), &missing);

        assert_eq!(result.findings.len(), 3);
        assert_eq!(result.findings[0].status, "slow");
        assert_eq!(result.findings[2].entry_key.as_deref(), Some("rs4680_pain"));
        assert_eq!(result.summary.high_impact, 1);
        assert_eq!(result.summary.moderate_impact, 2);
        assert!(result.drug_gene.is_skipped());

        let statuses = result.gene_statuses();
        assert_eq!(statuses["COMT"].0, vec!["slow".to_string(), "high_sensitivity".to_string()]);
        assert_eq!(statuses["COMT"].1, 3);
    }

    #[test]
    fn test_drug_gene_levels() {
        let mut genotypes = HashMap::new();
        genotypes.insert("AG".to_string(), "Reduced clopidogrel response".to_string());
        let table = PharmGkbTable {
            annotations: vec![
                DrugGeneAnnotation {
                    variant_id: "rs4244285".to_string(),
                    gene: "CYP2C19".to_string(),
                    drugs: "clopidogrel".to_string(),
                    phenotype: String::new(),
                    level: "1A".to_string(),
                    category: "Efficacy".to_string(),
                    genotypes: genotypes.clone(),
                },
                DrugGeneAnnotation {
                    variant_id: "rs1".to_string(),
                    gene: "X".to_string(),
                    drugs: "x".to_string(),
                    phenotype: String::new(),
                    level: "3".to_string(),
                    category: "Other".to_string(),
                    genotypes,
                },
            ],
        };

        let findings = drug_gene_findings(&genome(&[("rs4244285", "GA"), ("rs1", "AG")]), &table);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].annotation, "Reduced clopidogrel response");
    }
}
