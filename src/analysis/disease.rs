// ==============================================================================
// disease.rs - Disease Variant Classifier
// ==============================================================================
// Description: Cross-references the genome against the clinical registry with
//              SNV filtering and zygosity/inheritance-aware classification
// Author: Matt Barham
// Created: 2025-12-01
// Modified: 2026-02-09
// Version: 1.2.0
// ==============================================================================
// Classification:
//   hom-alt + pathogenic/likely pathogenic            → affected
//   het + pathogenic/likely pathogenic + recessive    → carrier
//   het + pathogenic/likely pathogenic + dominant     → affected
//   het + pathogenic/likely pathogenic + unknown      → risk_factor
//   risk factor / drug response / protective          → same-named class
//   benign, likely benign, uncertain, conflicting     → excluded
//   hom-ref                                           → no finding
// ==============================================================================

use super::acmg::{self, AcmgReport};
use super::AnalysisError;
use crate::genotype_converter::{zygosity, GenotypeConversionError};
use crate::models::{ClinicalSignificance, GenomeModel, InheritancePattern, Zygosity};
use crate::parsers::{ClinVarRegistry, ClinicalVariantRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseClassification {
    Affected,
    Carrier,
    RiskFactor,
    DrugResponse,
    Protective,
}

impl DiseaseClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiseaseClassification::Affected => "affected",
            DiseaseClassification::Carrier => "carrier",
            DiseaseClassification::RiskFactor => "risk_factor",
            DiseaseClassification::DrugResponse => "drug_response",
            DiseaseClassification::Protective => "protective",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseFinding {
    pub variant_id: Option<String>,
    pub gene: String,
    pub condition: String,
    pub classification: DiseaseClassification,
    pub zygosity: Zygosity,
    pub clinical_significance: ClinicalSignificance,
    pub inheritance: InheritancePattern,
    pub review_confidence: u8,
    pub chromosome: String,
    pub position: u64,
    pub genotype: String,
    pub reference_allele: String,
    pub alternate_allele: String,
    pub hgvs_p: String,
    pub acmg_actionable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiseaseStats {
    pub records_scanned: usize,
    pub positions_matched: usize,
    pub indels_skipped: usize,
    pub allele_mismatches: usize,
    /// Registry positions genotyped as no-call ("no information")
    pub no_calls: usize,
    pub excluded_significance: usize,
    pub pathogenic: usize,
    pub likely_pathogenic: usize,
}

/// Carrier findings grouped by gene
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierGene {
    pub gene: String,
    pub variant_count: usize,
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseResult {
    pub findings: Vec<DiseaseFinding>,
    pub carriers: Vec<CarrierGene>,
    pub acmg: AcmgReport,
    pub stats: DiseaseStats,
}

/// Classification for one record given the observed zygosity
///
/// # Returns
/// * `Some(class)` - A reportable finding
/// * `None` - Excluded significance or homozygous reference
pub fn classify(
    significance: ClinicalSignificance,
    inheritance: InheritancePattern,
    zygosity: Zygosity,
) -> Option<DiseaseClassification> {
    use ClinicalSignificance as Sig;

    if zygosity == Zygosity::HomozygousReference {
        return None;
    }

    match significance {
        Sig::Pathogenic | Sig::LikelyPathogenic => Some(match (zygosity, inheritance) {
            (Zygosity::HomozygousAlternate, _) => DiseaseClassification::Affected,
            (_, InheritancePattern::Recessive) => DiseaseClassification::Carrier,
            (_, InheritancePattern::Dominant) => DiseaseClassification::Affected,
            (_, InheritancePattern::Unknown) => DiseaseClassification::RiskFactor,
        }),
        Sig::RiskFactor => Some(DiseaseClassification::RiskFactor),
        Sig::DrugResponse => Some(DiseaseClassification::DrugResponse),
        Sig::Protective => Some(DiseaseClassification::Protective),
        Sig::Benign | Sig::LikelyBenign | Sig::Uncertain | Sig::Conflicting => None,
    }
}

/// Classify every registry record whose position is genotyped
///
/// # Arguments
/// * `genome` - Subject genotypes
/// * `registry` - Clinical variant registry
///
/// # Returns
/// * `Ok(DiseaseResult)` - Findings in registry order (no positional dedup)
/// * `Err(AnalysisError::InvariantViolation)` - Genome index inconsistent, or a
///   record with non-nucleotide alleles
pub fn classify_variants(genome: &GenomeModel, registry: &ClinVarRegistry) -> Result<DiseaseResult, AnalysisError> {
    info!("Classifying genome against {} registry records", registry.len());

    let mut stats = DiseaseStats::default();
    let mut findings = Vec::new();

    for record in &registry.records {
        stats.records_scanned += 1;

        let Some(call) = genome.call_at(&record.chromosome, record.position)? else {
            continue;
        };
        stats.positions_matched += 1;

        if !record.is_snv() {
            stats.indels_skipped += 1;
            continue;
        }

        let observed = match zygosity(&call.genotype, &record.reference_allele, &record.alternate_allele) {
            Ok(z) => z,
            Err(GenotypeConversionError::NoCall) => {
                stats.no_calls += 1;
                continue;
            }
            Err(GenotypeConversionError::AllelesMismatch { genotype, .. }) => {
                debug!(
                    "{}:{} genotype {} matches neither {} nor {}",
                    record.chromosome, record.position, genotype, record.reference_allele, record.alternate_allele
                );
                stats.allele_mismatches += 1;
                continue;
            }
            Err(e) => {
                // Registry loading admits only ACGT alleles, so this record was built elsewhere
                return Err(AnalysisError::InvariantViolation(format!(
                    "{}:{}: record bypassed registry validation: {}",
                    record.chromosome, record.position, e
                )))
            }
        };

        let Some(classification) = classify(record.clinical_significance, record.inheritance, observed) else {
            if observed != Zygosity::HomozygousReference {
                stats.excluded_significance += 1;
            }
            continue;
        };

        match record.clinical_significance {
            ClinicalSignificance::Pathogenic => stats.pathogenic += 1,
            ClinicalSignificance::LikelyPathogenic => stats.likely_pathogenic += 1,
            _ => {}
        }

        findings.push(build_finding(record, call.variant_id.clone(), call.genotype.to_string(), classification, observed));
    }

    let carriers = group_carriers(&findings);
    let acmg = acmg::screen(&findings);

    info!(
        "Disease classification: {} findings ({} pathogenic, {} likely pathogenic, {} indels skipped)",
        findings.len(),
        stats.pathogenic,
        stats.likely_pathogenic,
        stats.indels_skipped
    );

    Ok(DiseaseResult {
        findings,
        carriers,
        acmg,
        stats,
    })
}

fn build_finding(
    record: &ClinicalVariantRecord,
    genome_id: Option<String>,
    genotype: String,
    classification: DiseaseClassification,
    zygosity: Zygosity,
) -> DiseaseFinding {
    let acmg_actionable = record.clinical_significance.is_pathogenic()
        && matches!(
            classification,
            DiseaseClassification::Affected | DiseaseClassification::Carrier
        )
        && acmg::is_actionable_gene(&record.gene);

    DiseaseFinding {
        variant_id: genome_id.or_else(|| record.variant_id.clone()),
        gene: record.gene.clone(),
        condition: record.condition.clone(),
        classification,
        zygosity,
        clinical_significance: record.clinical_significance,
        inheritance: record.inheritance,
        review_confidence: record.review_confidence,
        chromosome: record.chromosome.clone(),
        position: record.position,
        genotype,
        reference_allele: record.reference_allele.clone(),
        alternate_allele: record.alternate_allele.clone(),
        hgvs_p: record.hgvs_p.clone(),
        acmg_actionable,
    }
}

fn group_carriers(findings: &[DiseaseFinding]) -> Vec<CarrierGene> {
    let mut by_gene: BTreeMap<&str, (usize, Vec<String>)> = BTreeMap::new();

    for finding in findings
        .iter()
        .filter(|f| f.classification == DiseaseClassification::Carrier)
    {
        let entry = by_gene.entry(finding.gene.as_str()).or_default();
        entry.0 += 1;
        let condition = finding
            .condition
            .split(';')
            .next()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Unknown condition")
            .to_string();
        if !entry.1.contains(&condition) {
            entry.1.push(condition);
        }
    }

    by_gene
        .into_iter()
        .map(|(gene, (variant_count, conditions))| CarrierGene {
            gene: gene.to_string(),
            variant_count,
            conditions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genotype, GenotypeCall};

    fn genome(calls: &[(&str, &str, u64, &str)]) -> GenomeModel {
        GenomeModel::from_calls(calls.iter().map(|(id, chrom, pos, gt)| GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: chrom.to_string(),
            position: *pos,
            genotype: Genotype::parse(gt).unwrap(),
        }))
        .0
    }

    fn record(
        chrom: &str,
        pos: u64,
        ref_allele: &str,
        alt_allele: &str,
        significance: ClinicalSignificance,
        inheritance: InheritancePattern,
        gene: &str,
    ) -> ClinicalVariantRecord {
        ClinicalVariantRecord {
            variant_id: None,
            chromosome: chrom.to_string(),
            position: pos,
            reference_allele: ref_allele.to_string(),
            alternate_allele: alt_allele.to_string(),
            clinical_significance: significance,
            significance_text: String::new(),
            condition: format!("{} condition;other", gene),
            inheritance,
            review_confidence: 2,
            review_status: String::new(),
            gene: gene.to_string(),
            hgvs_p: String::new(),
            hgvs_c: String::new(),
            molecular_consequence: String::new(),
        }
    }

    #[test]
    fn test_classify_table() {
        use ClinicalSignificance as Sig;
        use InheritancePattern as Inh;
        use Zygosity::*;

        assert_eq!(classify(Sig::Pathogenic, Inh::Recessive, HomozygousAlternate), Some(DiseaseClassification::Affected));
        assert_eq!(classify(Sig::Pathogenic, Inh::Recessive, Heterozygous), Some(DiseaseClassification::Carrier));
        assert_eq!(classify(Sig::LikelyPathogenic, Inh::Dominant, Heterozygous), Some(DiseaseClassification::Affected));
        assert_eq!(classify(Sig::Pathogenic, Inh::Unknown, Heterozygous), Some(DiseaseClassification::RiskFactor));
        assert_eq!(classify(Sig::RiskFactor, Inh::Unknown, HomozygousAlternate), Some(DiseaseClassification::RiskFactor));
        assert_eq!(classify(Sig::DrugResponse, Inh::Unknown, Heterozygous), Some(DiseaseClassification::DrugResponse));
        assert_eq!(classify(Sig::Protective, Inh::Unknown, Heterozygous), Some(DiseaseClassification::Protective));
        assert_eq!(classify(Sig::Benign, Inh::Dominant, HomozygousAlternate), None);
        assert_eq!(classify(Sig::Uncertain, Inh::Dominant, HomozygousAlternate), None);
        assert_eq!(classify(Sig::Conflicting, Inh::Dominant, HomozygousAlternate), None);
        assert_eq!(classify(Sig::Pathogenic, Inh::Dominant, HomozygousReference), None);
    }

    #[test]
    fn test_indel_records_never_produce_findings() {
        let genome = genome(&[("rs80357906", "17", 41245466, "AG")]);
        let registry = ClinVarRegistry::from_records(vec![
            record("17", 41245466, "AG", "A", ClinicalSignificance::Pathogenic, InheritancePattern::Dominant, "BRCA1"),
            record("17", 41245466, "A", "AG", ClinicalSignificance::Pathogenic, InheritancePattern::Dominant, "BRCA1"),
        ]);

        let result = classify_variants(&genome, &registry).unwrap();
        assert!(result.findings.is_empty());
        assert_eq!(result.stats.indels_skipped, 2);
    }

    #[test]
    fn test_carrier_and_acmg_flag() {
        let genome = genome(&[
            ("rs1", "7", 100, "GA"),
            ("rs2", "17", 200, "GA"),
            ("rs3", "1", 300, "CC"),
        ]);
        let registry = ClinVarRegistry::from_records(vec![
            record("7", 100, "G", "A", ClinicalSignificance::Pathogenic, InheritancePattern::Recessive, "CFTR"),
            record("17", 200, "G", "A", ClinicalSignificance::LikelyPathogenic, InheritancePattern::Dominant, "BRCA1"),
            record("1", 300, "C", "T", ClinicalSignificance::Pathogenic, InheritancePattern::Dominant, "LDLR"),
        ]);

        let result = classify_variants(&genome, &registry).unwrap();
        assert_eq!(result.findings.len(), 2);

        let cftr = &result.findings[0];
        assert_eq!(cftr.classification, DiseaseClassification::Carrier);
        assert_eq!(cftr.variant_id.as_deref(), Some("rs1"));
        assert!(!cftr.acmg_actionable);

        let brca1 = &result.findings[1];
        assert_eq!(brca1.classification, DiseaseClassification::Affected);
        assert!(brca1.acmg_actionable);
        assert_eq!(result.acmg.findings.len(), 1);

        assert_eq!(result.carriers.len(), 1);
        assert_eq!(result.carriers[0].gene, "CFTR");
        assert_eq!(result.carriers[0].conditions, vec!["CFTR condition".to_string()]);
    }

    #[test]
    fn test_conflicting_records_at_same_position_all_retained() {
        let genome = genome(&[("rs1", "1", 100, "TT")]);
        let registry = ClinVarRegistry::from_records(vec![
            record("1", 100, "C", "T", ClinicalSignificance::RiskFactor, InheritancePattern::Unknown, "X"),
            record("1", 100, "C", "T", ClinicalSignificance::Protective, InheritancePattern::Unknown, "X"),
            record("1", 100, "C", "T", ClinicalSignificance::Benign, InheritancePattern::Unknown, "X"),
        ]);

        let result = classify_variants(&genome, &registry).unwrap();
        assert_eq!(result.findings.len(), 2);
        assert_eq!(result.stats.excluded_significance, 1);
    }

    #[test]
    fn test_allele_mismatch_is_counted() {
        let genome = genome(&[("rs1", "1", 100, "GG")]);
        let registry = ClinVarRegistry::from_records(vec![record(
            "1",
            100,
            "C",
            "T",
            ClinicalSignificance::Pathogenic,
            InheritancePattern::Dominant,
            "X",
        )]);

        let result = classify_variants(&genome, &registry).unwrap();
        assert!(result.findings.is_empty());
        assert_eq!(result.stats.allele_mismatches, 1);
    }

    #[test]
    fn test_no_call_position_is_skipped_not_fatal() {
        let (genome, _) = GenomeModel::from_calls(vec![
            GenotypeCall {
                variant_id: Some("rs1".to_string()),
                chromosome: "1".to_string(),
                position: 100,
                genotype: Genotype::no_call(),
            },
            GenotypeCall {
                variant_id: Some("rs2".to_string()),
                chromosome: "17".to_string(),
                position: 200,
                genotype: Genotype::parse("GA").unwrap(),
            },
        ]);
        let registry = ClinVarRegistry::from_records(vec![
            record("1", 100, "C", "T", ClinicalSignificance::Pathogenic, InheritancePattern::Dominant, "LDLR"),
            record("17", 200, "G", "A", ClinicalSignificance::Pathogenic, InheritancePattern::Dominant, "BRCA1"),
        ]);

        let result = classify_variants(&genome, &registry).unwrap();
        assert_eq!(result.stats.no_calls, 1);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].gene, "BRCA1");
        assert_eq!(result.findings[0].classification, DiseaseClassification::Affected);
    }

    #[test]
    fn test_alt_with_third_base_is_reported() {
        let genome = genome(&[("rs1", "13", 500, "GA")]);
        let registry = ClinVarRegistry::from_records(vec![record(
            "13",
            500,
            "C",
            "A",
            ClinicalSignificance::Pathogenic,
            InheritancePattern::Recessive,
            "BRCA2",
        )]);

        let result = classify_variants(&genome, &registry).unwrap();
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].zygosity, Zygosity::Heterozygous);
        assert_eq!(result.findings[0].classification, DiseaseClassification::Carrier);
    }

    #[test]
    fn test_non_nucleotide_record_is_invariant_violation() {
        let genome = genome(&[("rs1", "1", 100, "AA")]);
        let registry = ClinVarRegistry::from_records(vec![record(
            "1",
            100,
            "N",
            "A",
            ClinicalSignificance::Pathogenic,
            InheritancePattern::Dominant,
            "LDLR",
        )]);

        let err = classify_variants(&genome, &registry).unwrap_err();
        assert!(matches!(err, AnalysisError::InvariantViolation(_)));
        assert!(err.to_string().contains("1:100"));
    }
}
