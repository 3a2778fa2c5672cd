// ==============================================================================
// apoe.rs - APOE Haplotype Caller
// ==============================================================================
// Description: APOE epsilon genotype from rs429358 + rs7412
// Author: Matt Barham
// Created: 2025-12-14
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
//   rs429358  rs7412   epsilon
//   T         T        e2
//   T         C        e3
//   C         C        e4
//   C         T        not observed
// Calls are unphased, so every pairing of the two genotypes is tried.
// ==============================================================================

use super::AnalysisError;
use crate::models::{Confidence, GenomeModel, Genotype};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const RS429358: &str = "rs429358";
pub const RS7412: &str = "rs7412";
pub const UNDETERMINED: &str = "undetermined";
/// Gene name used as the interaction-rule status source
pub const APOE_GENE: &str = "APOE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Epsilon {
    E2,
    E3,
    E4,
}

impl Epsilon {
    fn from_alleles(a358: char, a7412: char) -> Option<Self> {
        match (a358, a7412) {
            ('T', 'T') => Some(Epsilon::E2),
            ('T', 'C') => Some(Epsilon::E3),
            ('C', 'C') => Some(Epsilon::E4),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Epsilon::E2 => "e2",
            Epsilon::E3 => "e3",
            Epsilon::E4 => "e4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApoeRisk {
    Reduced,
    Average,
    Moderate,
    Elevated,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApoeResult {
    /// "e3/e4", or "undetermined"
    pub apoe_type: String,
    pub alleles: Option<[Epsilon; 2]>,
    pub risk_level: Option<ApoeRisk>,
    pub alzheimer_odds_ratio: Option<f64>,
    pub description: String,
    pub confidence: Confidence,
    pub details: Vec<String>,
}

impl ApoeResult {
    /// Status key for interaction rules ("e3_e4")
    pub fn status_key(&self) -> Option<String> {
        self.alleles
            .map(|[a, b]| format!("{}_{}", a.as_str(), b.as_str()))
    }
}

/// Decode a pair of unphased genotypes into sorted epsilon alleles
pub fn decode(rs429358: Genotype, rs7412: Genotype) -> Option<[Epsilon; 2]> {
    let (a1, a2) = rs429358.alleles()?;
    let (b1, b2) = rs7412.alleles()?;

    for (first, second) in [((a1, b1), (a2, b2)), ((a1, b2), (a2, b1))] {
        if let (Some(x), Some(y)) = (
            Epsilon::from_alleles(first.0, first.1),
            Epsilon::from_alleles(second.0, second.1),
        ) {
            let mut pair = [x, y];
            pair.sort();
            return Some(pair);
        }
    }
    None
}

fn risk_info(pair: [Epsilon; 2]) -> (ApoeRisk, f64, &'static str) {
    use Epsilon::*;
    match pair {
        [E2, E2] => (
            ApoeRisk::Reduced,
            0.6,
            "Lowest Alzheimer's risk. May raise cardiovascular risk (type III hyperlipoproteinemia).",
        ),
        [E2, E3] => (ApoeRisk::Reduced, 0.6, "Below-average Alzheimer's risk. One protective e2 allele."),
        [E3, E3] => (ApoeRisk::Average, 1.0, "Most common genotype. Average Alzheimer's risk."),
        [E3, E4] => (
            ApoeRisk::Elevated,
            2.8,
            "One e4 allele raises Alzheimer's risk roughly 2-3x. Exercise, sleep and cardiovascular health may mitigate risk.",
        ),
        [E2, E4] => (
            ApoeRisk::Moderate,
            1.2,
            "One risk allele (e4) and one protective allele (e2). Net risk near average.",
        ),
        [E4, E4] => (
            ApoeRisk::High,
            12.0,
            "Highest genetic risk for late-onset Alzheimer's (~12x). Cardiovascular and lifestyle optimization recommended.",
        ),
        // Unsorted pairs
        [a, b] => risk_info([b, a]),
    }
}

fn undetermined(description: String, details: Vec<String>) -> ApoeResult {
    ApoeResult {
        apoe_type: UNDETERMINED.to_string(),
        alleles: None,
        risk_level: None,
        alzheimer_odds_ratio: None,
        description,
        confidence: Confidence::Low,
        details,
    }
}

/// Call the APOE haplotype
///
/// # Returns
/// * `ApoeResult` - "undetermined" at low confidence when either SNP is
///   missing or the combination cannot be phased
pub fn call(genome: &GenomeModel) -> ApoeResult {
    let g358 = genome.genotype(RS429358);
    let g7412 = genome.genotype(RS7412);

    let mut details = Vec::new();
    if let Some(gt) = g358 {
        details.push(format!("{}: {}", RS429358, gt));
    }
    if let Some(gt) = g7412 {
        details.push(format!("{}: {}", RS7412, gt));
    }

    let (Some(g358), Some(g7412)) = (g358, g7412) else {
        warn!("APOE undetermined: {} and {} both required", RS429358, RS7412);
        return undetermined(
            format!("Insufficient data: both {} and {} are needed.", RS429358, RS7412),
            details,
        );
    };

    let Some(pair) = decode(g358, g7412) else {
        warn!("APOE undetermined: unexpected combination {}={}, {}={}", RS429358, g358, RS7412, g7412);
        return undetermined(
            format!("Unexpected genotype combination: {}={}, {}={}.", RS429358, g358, RS7412, g7412),
            details,
        );
    };

    let (risk, odds_ratio, description) = risk_info(pair);
    let apoe_type = format!("{}/{}", pair[0].as_str(), pair[1].as_str());
    info!("APOE {} (Alzheimer OR {:.1})", apoe_type, odds_ratio);

    ApoeResult {
        apoe_type,
        alleles: Some(pair),
        risk_level: Some(risk),
        alzheimer_odds_ratio: Some(odds_ratio),
        description: description.to_string(),
        confidence: Confidence::High,
        details,
    }
}

pub fn run(genome: &GenomeModel) -> Result<ApoeResult, AnalysisError> {
    Ok(call(genome))
}
