// ==============================================================================
// thyroid.rs - Thyroid Genetics Profile
// ==============================================================================
// Description: Autoimmune thyroid risk, T4-to-T3 conversion and thyroid
//              cancer susceptibility from five single-variant markers
// Author: Matt Barham
// Created: 2026-01-24
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// Each marker scores 0-2 by risk-allele copies. A domain's level is the mean
// of its scores: >= 1.5 elevated, >= 0.8 moderate, otherwise average.
// ==============================================================================

use super::AnalysisError;
use crate::models::GenomeModel;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub const AUTOIMMUNE: &str = "autoimmune_risk";
pub const CONVERSION: &str = "conversion_efficiency";
pub const CANCER: &str = "cancer_risk";

struct ThyroidMarker {
    variant_id: &'static str,
    gene: &'static str,
    allele: char,
    domain: &'static str,
    /// Findings for 2, 1 and 0 copies of `allele`
    findings: [&'static str; 3],
}

const MARKERS: [ThyroidMarker; 5] = [
    ThyroidMarker {
        variant_id: "rs965513",
        gene: "FOXE1",
        allele: 'A',
        domain: CANCER,
        findings: [
            "Higher thyroid cancer risk",
            "Moderate thyroid cancer risk",
            "Average thyroid cancer risk",
        ],
    },
    ThyroidMarker {
        variant_id: "rs2071403",
        gene: "TPO",
        allele: 'C',
        domain: AUTOIMMUNE,
        findings: [
            "Higher autoimmune thyroid risk",
            "Moderate autoimmune thyroid risk",
            "Average autoimmune thyroid risk",
        ],
    },
    ThyroidMarker {
        variant_id: "rs179247",
        gene: "TSHR",
        allele: 'A',
        domain: AUTOIMMUNE,
        findings: [
            "Higher Graves' disease susceptibility",
            "Moderate Graves' disease susceptibility",
            "Average Graves' disease susceptibility",
        ],
    },
    ThyroidMarker {
        variant_id: "rs11206244",
        gene: "DIO1",
        allele: 'T',
        domain: CONVERSION,
        findings: [
            "Impaired T4-to-T3 conversion (DIO1)",
            "Reduced T4-to-T3 conversion (DIO1)",
            "Normal T4-to-T3 conversion (DIO1)",
        ],
    },
    ThyroidMarker {
        variant_id: "rs225014",
        gene: "DIO2",
        allele: 'T',
        domain: CONVERSION,
        findings: [
            "Slower T4-to-T3 conversion (DIO2 Ala/Ala)",
            "Reduced T4-to-T3 conversion (DIO2 Thr/Ala)",
            "Normal T4-to-T3 conversion (DIO2 Thr/Thr)",
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThyroidMarkerResult {
    pub variant_id: String,
    pub gene: String,
    pub genotype: String,
    pub finding: String,
    pub domain: String,
    pub severity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainRisk {
    /// "elevated", "moderate", "average", or "unknown" without markers
    pub level: String,
    pub genes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThyroidProfile {
    pub risk_profile: BTreeMap<String, DomainRisk>,
    pub markers_found: usize,
    pub markers_tested: usize,
    pub gene_results: Vec<ThyroidMarkerResult>,
    pub summary: String,
    pub recommendations: Vec<String>,
}

impl ThyroidProfile {
    fn level(&self, domain: &str) -> &str {
        self.risk_profile.get(domain).map(|d| d.level.as_str()).unwrap_or("unknown")
    }
}

fn domain_level(scores: &[u8]) -> &'static str {
    if scores.is_empty() {
        return "unknown";
    }
    let mean = scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64;
    if mean >= 1.5 {
        "elevated"
    } else if mean >= 0.8 {
        "moderate"
    } else {
        "average"
    }
}

fn summarize(profile: &ThyroidProfile) -> String {
    if profile.markers_found == 0 {
        return "No thyroid-related markers available in genotype data.".to_string();
    }

    let mut parts = Vec::new();
    match profile.level(AUTOIMMUNE) {
        "elevated" => parts.push("elevated autoimmune thyroid risk (Hashimoto's/Graves')"),
        "moderate" => parts.push("moderate autoimmune thyroid risk"),
        _ => {}
    }
    match profile.level(CONVERSION) {
        "elevated" => parts.push("impaired T4-to-T3 conversion"),
        "moderate" => parts.push("mildly reduced T4-to-T3 conversion"),
        _ => {}
    }
    match profile.level(CANCER) {
        "elevated" => parts.push("elevated thyroid cancer susceptibility"),
        "moderate" => parts.push("moderate thyroid cancer susceptibility"),
        _ => {}
    }

    if parts.is_empty() {
        "Thyroid genetic profile appears average across all tested markers.".to_string()
    } else {
        format!("Thyroid genetic profile shows: {}.", parts.join("; "))
    }
}

fn recommendations(profile: &ThyroidProfile) -> Vec<String> {
    let flagged = |domain: &str| matches!(profile.level(domain), "elevated" | "moderate");
    let mut recs: Vec<&str> = Vec::new();

    if flagged(AUTOIMMUNE) {
        recs.extend([
            "Monitor thyroid function annually (TSH, free T4, anti-TPO antibodies).",
            "Ensure adequate selenium intake; avoid excess iodine supplementation.",
        ]);
    }
    if flagged(CONVERSION) {
        recs.extend([
            "If hypothyroid, discuss combination T4/T3 therapy; deiodinase variants may impair T4-only response.",
            "Monitor free T3 as well as TSH and free T4.",
        ]);
    }
    if flagged(CANCER) {
        recs.push("Discuss thyroid ultrasound screening, especially with a family history of thyroid cancer.");
    }
    if recs.is_empty() && profile.markers_found > 0 {
        recs.push("No specific thyroid interventions indicated by the markers tested.");
    }
    recs.into_iter().map(str::to_string).collect()
}

/// Profile thyroid genetics across the three domains
pub fn profile(genome: &GenomeModel) -> ThyroidProfile {
    let mut gene_results = Vec::new();
    let mut scores: BTreeMap<&str, Vec<u8>> = BTreeMap::new();
    let mut genes: BTreeMap<&str, Vec<String>> = BTreeMap::new();

    for marker in &MARKERS {
        let Some(genotype) = genome.genotype(marker.variant_id) else {
            continue;
        };
        let severity = genotype.count_allele(marker.allele).min(2);
        scores.entry(marker.domain).or_default().push(severity);
        genes.entry(marker.domain).or_default().push(marker.gene.to_string());
        gene_results.push(ThyroidMarkerResult {
            variant_id: marker.variant_id.to_string(),
            gene: marker.gene.to_string(),
            genotype: genotype.to_string(),
            finding: marker.findings[2 - usize::from(severity)].to_string(),
            domain: marker.domain.to_string(),
            severity,
        });
    }

    let risk_profile = [AUTOIMMUNE, CONVERSION, CANCER]
        .into_iter()
        .map(|domain| {
            let risk = DomainRisk {
                level: domain_level(scores.get(domain).map(Vec::as_slice).unwrap_or(&[])).to_string(),
                genes: genes.remove(domain).unwrap_or_default(),
            };
            (domain.to_string(), risk)
        })
        .collect();

    let mut profile = ThyroidProfile {
        risk_profile,
        markers_found: gene_results.len(),
        markers_tested: MARKERS.len(),
        gene_results,
        summary: String::new(),
        recommendations: Vec::new(),
    };
    profile.summary = summarize(&profile);
    profile.recommendations = recommendations(&profile);

    info!(
        "Thyroid profile: autoimmune {}, conversion {}, cancer {} ({}/{} markers)",
        profile.level(AUTOIMMUNE),
        profile.level(CONVERSION),
        profile.level(CANCER),
        profile.markers_found,
        profile.markers_tested
    );
    profile
}

pub fn run(genome: &GenomeModel) -> Result<ThyroidProfile, AnalysisError> {
    Ok(profile(genome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genotype, GenotypeCall};

    fn genome(calls: &[(&str, &str)]) -> GenomeModel {
        GenomeModel::from_calls(calls.iter().enumerate().map(|(i, (id, gt))| GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: "14".to_string(),
            position: 80_000_000 + i as u64,
            genotype: Genotype::parse(gt).unwrap(),
        }))
        .0
    }

    #[test]
    fn test_domain_level_bands() {
        assert_eq!(domain_level(&[2, 1]), "elevated");
        assert_eq!(domain_level(&[1, 1]), "moderate");
        assert_eq!(domain_level(&[1, 0]), "average");
        assert_eq!(domain_level(&[]), "unknown");
    }

    #[test]
    fn test_conversion_domain_from_both_deiodinases() {
        let result = profile(&genome(&[("rs11206244", "TT"), ("rs225014", "CT"), ("rs2071403", "TT")]));

        assert_eq!(result.level(CONVERSION), "elevated");
        assert_eq!(result.risk_profile[CONVERSION].genes, vec!["DIO1", "DIO2"]);
        assert_eq!(result.level(AUTOIMMUNE), "average");
        assert_eq!(result.level(CANCER), "unknown");
        assert!(result.summary.contains("impaired T4-to-T3"));
        assert!(result.recommendations.iter().any(|r| r.contains("T4/T3")));
    }

    #[test]
    fn test_average_profile() {
        let result = profile(&genome(&[("rs965513", "GG"), ("rs179247", "GG")]));
        assert_eq!(result.markers_found, 2);
        assert!(result.summary.contains("average"));
        assert_eq!(result.recommendations.len(), 1);
    }
}
