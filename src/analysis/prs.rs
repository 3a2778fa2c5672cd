// ==============================================================================
// prs.rs - Polygenic Risk Calculator
// ==============================================================================
// Description: Weighted risk-allele summation mapped to a population
//              percentile through a normal approximation
// Author: Matt Barham
// Created: 2025-12-06
// Modified: 2026-02-09
// Version: 1.1.0
// ==============================================================================

use super::ancestry::AncestryResult;
use super::AnalysisError;
use crate::models::{Confidence, GenomeModel};
use crate::parsers::{PolygenicModel, PrsVariant};
use crate::reference_data::DatabaseSlot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Non-European fraction above which European-derived weights are caveated
pub const NON_EUROPEAN_CAVEAT_THRESHOLD: f64 = 0.4;
const MAX_CONTRIBUTING_SNPS: usize = 10;
const PERCENTILE_FLOOR: f64 = 0.1;
const PERCENTILE_CEILING: f64 = 99.9;
const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Low,
    Average,
    Elevated,
    High,
}

/// Map a percentile to its category: <20 low, <80 average, <95 elevated
pub fn risk_category(percentile: f64) -> RiskCategory {
    if percentile < 20.0 {
        RiskCategory::Low
    } else if percentile < 80.0 {
        RiskCategory::Average
    } else if percentile < 95.0 {
        RiskCategory::Elevated
    } else {
        RiskCategory::High
    }
}

/// Error function, Abramowitz & Stegun 7.1.26 (|ε| < 1.5e-7)
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}

/// Standard normal CDF
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributingSnp {
    pub variant_id: String,
    pub gene: String,
    pub genotype: String,
    pub risk_allele: char,
    pub risk_allele_count: u8,
    pub log_odds_ratio: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrsResult {
    pub model_id: String,
    pub name: String,
    pub reference: String,
    pub raw_score: f64,
    pub reference_mean: f64,
    pub reference_sd: f64,
    pub z_score: f64,
    /// In [0.1, 99.9]
    pub percentile: f64,
    pub ci_95_lower: f64,
    pub ci_95_upper: f64,
    pub risk_category: RiskCategory,
    pub snps_found: usize,
    pub snps_total: usize,
    pub confidence: Confidence,
    pub ancestry_applicable: bool,
    pub ancestry_caveat: Option<String>,
    pub contributing_snps: Vec<ContributingSnp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrsReport {
    pub scores: Vec<PrsResult>,
    pub non_european_fraction: Option<f64>,
}

/// High when at least 80% of model SNPs were genotyped, moderate from 50%
fn coverage_confidence(found: usize, total: usize) -> Confidence {
    if total == 0 {
        return Confidence::Low;
    }
    let coverage = found as f64 / total as f64;
    if coverage >= 0.8 {
        Confidence::High
    } else if coverage >= 0.5 {
        Confidence::Moderate
    } else {
        Confidence::Low
    }
}

fn ancestry_caveat(non_european: f64) -> String {
    format!(
        "{:.0}% non-European ancestry estimated; effect sizes were derived in European cohorts \
         and may not transfer. The percentile is reported unadjusted.",
        non_european * 100.0
    )
}

/// Score one model against the genome
///
/// # Arguments
/// * `genome` - Subject genotypes
/// * `model` - Model weights and frequencies
/// * `non_european` - Estimated non-European fraction, if ancestry ran
///
/// # Returns
/// * `PrsResult` - Score, percentile and category. The percentile does not
///   depend on `non_european`; only the caveat fields do.
pub fn score_model(genome: &GenomeModel, model: &PolygenicModel, non_european: Option<f64>) -> PrsResult {
    let mut seen = HashSet::new();
    let unique: Vec<&PrsVariant> = model
        .variants
        .iter()
        .filter(|snp| seen.insert(snp.variant_id.as_str()))
        .collect();

    let mut raw_score = 0.0;
    let mut found: Vec<&PrsVariant> = Vec::new();
    let mut contributing = Vec::new();

    for snp in &unique {
        let Some(genotype) = genome.genotype(&snp.variant_id) else {
            continue;
        };
        let count = genotype.count_allele(snp.risk_allele);
        let contribution = f64::from(count) * snp.log_odds_ratio;
        raw_score += contribution;
        found.push(snp);

        if count > 0 {
            contributing.push(ContributingSnp {
                variant_id: snp.variant_id.clone(),
                gene: snp.gene.clone(),
                genotype: genotype.to_string(),
                risk_allele: snp.risk_allele,
                risk_allele_count: count,
                log_odds_ratio: snp.log_odds_ratio,
                contribution,
            });
        }
    }

    let distribution = PolygenicModel::reference_distribution(found.iter().copied());
    let n = found.len();

    let (z_score, percentile, ci_95_lower, ci_95_upper) = if n > 0 && distribution.sd > 0.0 {
        let z = (raw_score - distribution.mean) / distribution.sd;
        let se = if n > 1 {
            distribution.sd / (n as f64).sqrt()
        } else {
            distribution.sd
        };
        let z_se = se / distribution.sd;
        let percentile = (normal_cdf(z) * 100.0).clamp(PERCENTILE_FLOOR, PERCENTILE_CEILING);
        let lower = (normal_cdf(z - Z_95 * z_se) * 100.0).clamp(PERCENTILE_FLOOR, PERCENTILE_CEILING);
        let upper = (normal_cdf(z + Z_95 * z_se) * 100.0).clamp(PERCENTILE_FLOOR, PERCENTILE_CEILING);
        (z, percentile, lower, upper)
    } else {
        (0.0, 50.0, 50.0, 50.0)
    };

    contributing.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
    contributing.truncate(MAX_CONTRIBUTING_SNPS);

    let caveated = non_european.filter(|f| *f > NON_EUROPEAN_CAVEAT_THRESHOLD);

    debug!(
        "{}: raw {:.4}, z {:.2}, percentile {:.1} ({}/{} SNPs)",
        model.id,
        raw_score,
        z_score,
        percentile,
        n,
        unique.len()
    );

    PrsResult {
        model_id: model.id.clone(),
        name: model.name.clone(),
        reference: model.reference.clone(),
        raw_score,
        reference_mean: distribution.mean,
        reference_sd: distribution.sd,
        z_score,
        percentile,
        ci_95_lower,
        ci_95_upper,
        risk_category: risk_category(percentile),
        snps_found: n,
        snps_total: unique.len(),
        confidence: coverage_confidence(n, unique.len()),
        ancestry_applicable: caveated.is_none(),
        ancestry_caveat: caveated.map(ancestry_caveat),
        contributing_snps: contributing,
    }
}

/// Score every model
pub fn calculate(genome: &GenomeModel, models: &[PolygenicModel], ancestry: Option<&AncestryResult>) -> PrsReport {
    info!("Scoring {} polygenic models", models.len());

    let non_european = ancestry
        .filter(|a| a.markers_found > 0)
        .map(AncestryResult::non_european_fraction);
    let scores: Vec<PrsResult> = models
        .iter()
        .map(|model| score_model(genome, model, non_european))
        .collect();

    let elevated = scores
        .iter()
        .filter(|s| s.risk_category >= RiskCategory::Elevated)
        .count();
    info!("Polygenic scoring complete: {} models, {} elevated or high", scores.len(), elevated);

    PrsReport {
        scores,
        non_european_fraction: non_european,
    }
}

pub fn run(
    genome: &GenomeModel,
    models: &DatabaseSlot<Vec<PolygenicModel>>,
    ancestry: Option<&AncestryResult>,
) -> Result<PrsReport, AnalysisError> {
    let loaded = models.require("prs_models")?;
    Ok(calculate(genome, &loaded.data, ancestry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genotype, GenotypeCall, Superpopulation};
    use std::collections::BTreeMap;

    fn snp(id: &str, allele: char, beta: f64, freq: f64) -> PrsVariant {
        PrsVariant {
            variant_id: id.to_string(),
            gene: "GENE".to_string(),
            risk_allele: allele,
            log_odds_ratio: beta,
            eur_frequency: freq,
        }
    }

    fn model() -> PolygenicModel {
        PolygenicModel {
            id: "t2d".to_string(),
            name: "Type 2 Diabetes".to_string(),
            reference: "test".to_string(),
            variants: vec![
                snp("rs7903146", 'T', 0.31, 0.3),
                snp("rs1801282", 'C', 0.14, 0.88),
                snp("rs5219", 'T', 0.10, 0.37),
                snp("rs13266634", 'C', 0.12, 0.7),
            ],
        }
    }

    fn genome(calls: &[(&str, &str)]) -> GenomeModel {
        GenomeModel::from_calls(calls.iter().enumerate().map(|(i, (id, gt))| GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: "10".to_string(),
            position: i as u64 + 1,
            genotype: Genotype::parse(gt).unwrap(),
        }))
        .0
    }

    fn ancestry_with_eur(eur: f64) -> AncestryResult {
        let rest = (1.0 - eur) / 4.0;
        let proportions: BTreeMap<Superpopulation, f64> = Superpopulation::ALL
            .into_iter()
            .map(|p| (p, if p == Superpopulation::EUR { eur } else { rest }))
            .collect();
        AncestryResult {
            proportions,
            log_likelihoods: BTreeMap::new(),
            markers_found: 30,
            markers_tested: 50,
            confidence: Confidence::Moderate,
            top_ancestry: "European".to_string(),
            top_population: Some(Superpopulation::EUR),
            details: Vec::new(),
        }
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn test_risk_category_thresholds() {
        assert_eq!(risk_category(0.1), RiskCategory::Low);
        assert_eq!(risk_category(19.99), RiskCategory::Low);
        assert_eq!(risk_category(20.0), RiskCategory::Average);
        assert_eq!(risk_category(79.9), RiskCategory::Average);
        assert_eq!(risk_category(80.0), RiskCategory::Elevated);
        assert_eq!(risk_category(95.0), RiskCategory::High);

        let mut last = RiskCategory::Low;
        for i in 0..=1000 {
            let category = risk_category(i as f64 / 10.0);
            assert!(category >= last);
            last = category;
        }
    }

    #[test]
    fn test_score_sums_weighted_counts() {
        let genome = genome(&[("rs7903146", "TT"), ("rs1801282", "CG"), ("rs5219", "CC")]);
        let result = score_model(&genome, &model(), None);

        assert!((result.raw_score - (2.0 * 0.31 + 0.14)).abs() < 1e-12);
        assert_eq!(result.snps_found, 3);
        assert_eq!(result.snps_total, 4);
        assert!(result.percentile >= 0.1 && result.percentile <= 99.9);
        assert!(result.ci_95_lower <= result.percentile && result.percentile <= result.ci_95_upper);
        assert_eq!(result.contributing_snps.len(), 2);
        assert_eq!(result.contributing_snps[0].variant_id, "rs7903146");
        assert_eq!(result.risk_category, risk_category(result.percentile));
    }

    #[test]
    fn test_no_snps_found_is_median() {
        let result = score_model(&genome(&[("rs1", "AA")]), &model(), None);
        assert_eq!(result.snps_found, 0);
        assert_eq!(result.percentile, 50.0);
        assert_eq!(result.z_score, 0.0);
        assert_eq!(result.risk_category, RiskCategory::Average);
    }

    #[test]
    fn test_ancestry_caveat_does_not_move_percentile() {
        let genome = genome(&[("rs7903146", "CT"), ("rs1801282", "CC"), ("rs5219", "TT")]);

        let above = calculate(&genome, &[model()], Some(&ancestry_with_eur(0.59)));
        let below = calculate(&genome, &[model()], Some(&ancestry_with_eur(0.61)));

        let above = &above.scores[0];
        let below = &below.scores[0];
        assert!(above.ancestry_caveat.is_some());
        assert!(!above.ancestry_applicable);
        assert!(below.ancestry_caveat.is_none());
        assert!(below.ancestry_applicable);
        assert_eq!(above.percentile, below.percentile);
        assert_eq!(above.risk_category, below.risk_category);
    }

    #[test]
    fn test_duplicate_rsid_counted_once() {
        let mut m = model();
        m.variants.push(snp("rs7903146", 'T', 0.31, 0.3));
        let result = score_model(&genome(&[("rs7903146", "TT")]), &m, None);
        assert_eq!(result.snps_total, 4);
        assert!((result.raw_score - 0.62).abs() < 1e-12);
    }
}
