// ==============================================================================
// blood_type.rs - ABO / Rh Blood Type Caller
// ==============================================================================
// Description: Blood group prediction from three proxy SNPs
// Author: Matt Barham
// Created: 2025-12-14
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// rs505922  (C/T) ABO O-allele proxy, T = O
// rs8176746 (C/T) B antigen, T = B
// rs590787  (C/T) RhD proxy, TT = Rh negative
// ==============================================================================

use super::AnalysisError;
use crate::models::{Confidence, GenomeModel, Genotype};
use serde::Serialize;
use tracing::info;

pub const ABO_O_PROXY: &str = "rs505922";
pub const ABO_B_ALLELE: &str = "rs8176746";
pub const RH_PROXY: &str = "rs590787";
pub const UNDETERMINED: &str = "undetermined";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodTypeResult {
    /// "A+", "O?", "?-", or "undetermined"
    pub blood_type: String,
    pub abo: Option<String>,
    pub rh: Option<char>,
    pub confidence: Confidence,
    pub variants_found: usize,
    pub details: Vec<String>,
}

fn abo_group(o_proxy: Option<Genotype>, b_allele: Option<Genotype>) -> Option<&'static str> {
    let b_copies = b_allele.map(|gt| gt.count_allele('T')).unwrap_or(0);
    let has_b = b_copies > 0;

    match o_proxy.map(|gt| gt.count_allele('T')) {
        Some(2) | Some(1) if has_b => Some("B"),
        Some(2) => Some("O"),
        Some(1) => Some("A"),
        Some(_) if b_copies == 2 => Some("B"),
        Some(_) if has_b => Some("AB"),
        Some(_) => Some("A"),
        None if has_b => Some("B"),
        None => None,
    }
}

/// Predict ABO group and Rh factor
///
/// # Returns
/// * `BloodTypeResult` - High confidence with all three proxies, moderate
///   with one or two, "undetermined" with none
pub fn predict(genome: &GenomeModel) -> BloodTypeResult {
    let o_proxy = genome.genotype(ABO_O_PROXY);
    let b_allele = genome.genotype(ABO_B_ALLELE);
    let rh_proxy = genome.genotype(RH_PROXY);

    let mut details = Vec::new();
    if let Some(gt) = o_proxy {
        details.push(format!("{} (ABO O proxy): {}", ABO_O_PROXY, gt));
    }
    if let Some(gt) = b_allele {
        details.push(format!("{} (B allele): {}", ABO_B_ALLELE, gt));
    }
    if let Some(gt) = rh_proxy {
        details.push(format!("{} (Rh proxy): {}", RH_PROXY, gt));
    }
    let variants_found = details.len();

    let abo = abo_group(o_proxy, b_allele);
    let rh = rh_proxy.map(|gt| if gt.count_allele('T') == 2 { '-' } else { '+' });

    let blood_type = match (abo, rh) {
        (Some(abo), Some(rh)) => format!("{}{}", abo, rh),
        (Some(abo), None) => format!("{}?", abo),
        (None, Some(rh)) => format!("?{}", rh),
        (None, None) => UNDETERMINED.to_string(),
    };
    let confidence = Confidence::from_count(variants_found, 3, 1);

    info!("Blood type: {} ({} confidence)", blood_type, confidence.as_str());

    BloodTypeResult {
        blood_type,
        abo: abo.map(str::to_string),
        rh,
        confidence,
        variants_found,
        details,
    }
}

pub fn run(genome: &GenomeModel) -> Result<BloodTypeResult, AnalysisError> {
    Ok(predict(genome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenotypeCall;

    fn genome(calls: &[(&str, &str)]) -> GenomeModel {
        GenomeModel::from_calls(calls.iter().enumerate().map(|(i, (id, gt))| GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: "9".to_string(),
            position: 136_000_000 + i as u64,
            genotype: Genotype::parse(gt).unwrap(),
        }))
        .0
    }

    #[test]
    fn test_full_call() {
        let result = predict(&genome(&[(ABO_O_PROXY, "TT"), (ABO_B_ALLELE, "CC"), (RH_PROXY, "CT")]));
        assert_eq!(result.blood_type, "O+");
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.details.len(), 3);
    }

    #[test]
    fn test_ab_and_rh_negative() {
        let result = predict(&genome(&[(ABO_O_PROXY, "CC"), (ABO_B_ALLELE, "CT"), (RH_PROXY, "TT")]));
        assert_eq!(result.blood_type, "AB-");
    }

    #[test]
    fn test_partial_data_is_moderate() {
        let result = predict(&genome(&[(ABO_O_PROXY, "CT")]));
        assert_eq!(result.blood_type, "A?");
        assert_eq!(result.confidence, Confidence::Moderate);
    }

    #[test]
    fn test_no_data_is_undetermined() {
        let result = predict(&genome(&[("rs1", "AA")]));
        assert_eq!(result.blood_type, UNDETERMINED);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.variants_found, 0);
    }
}
