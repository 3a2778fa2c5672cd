// ==============================================================================
// alcohol.rs - Alcohol Metabolism Profile
// ==============================================================================
// Description: Ethanol clearance speed, flush reaction and alcohol-related
//              cancer risk from ADH1B, ALDH2 and CYP2E1
// Author: Matt Barham
// Created: 2026-01-24
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// rs1229984 (ADH1B Arg48His)  T = hyperactive ADH1B, faster acetaldehyde build-up
// rs671     (ALDH2 Glu504Lys) A = inactive ALDH2, flush reaction
// rs2031920 (CYP2E1)          T = reduced MEOS activity
// Cancer score is the sum of per-marker modifiers: >= 3 high, >= 1 elevated.
// ==============================================================================

use super::AnalysisError;
use crate::models::GenomeModel;
use serde::Serialize;
use tracing::info;

/// (finding, description, profile contribution, cancer modifier)
type Outcome = (&'static str, &'static str, &'static str, i8);

struct AlcoholMarker {
    variant_id: &'static str,
    gene: &'static str,
    allele: char,
    /// Outcomes for 2, 1 and 0 copies of `allele`
    outcomes: [Outcome; 3],
}

const ADH1B: AlcoholMarker = AlcoholMarker {
    variant_id: "rs1229984",
    gene: "ADH1B",
    allele: 'T',
    outcomes: [
        (
            "Very fast ethanol metabolism",
            "TT (His/His): hyperactive ADH1B produces acetaldehyde about 40x faster, protective against alcohol dependence.",
            "very_fast",
            1,
        ),
        (
            "Fast ethanol metabolism",
            "CT (Arg/His): one hyperactive ADH1B allele, faster than average ethanol-to-acetaldehyde conversion.",
            "fast",
            0,
        ),
        (
            "Normal ethanol metabolism",
            "CC (Arg/Arg): standard ADH1B activity.",
            "normal",
            0,
        ),
    ],
};

const ALDH2: AlcoholMarker = AlcoholMarker {
    variant_id: "rs671",
    gene: "ALDH2",
    allele: 'A',
    outcomes: [
        (
            "Very reduced acetaldehyde clearance (severe flush)",
            "AA (Lys/Lys): near-complete ALDH2 deficiency. Severe flushing with small amounts of alcohol and sharply elevated esophageal cancer risk if alcohol is consumed.",
            "severe",
            3,
        ),
        (
            "Reduced acetaldehyde clearance (mild flush)",
            "GA (Glu/Lys): ALDH2 activity reduced by 60-70%. Drinking despite the flush raises esophageal and head/neck cancer risk.",
            "mild",
            2,
        ),
        (
            "Normal acetaldehyde clearance (no flush)",
            "GG (Glu/Glu): fully functional ALDH2.",
            "none",
            0,
        ),
    ],
};

const CYP2E1: AlcoholMarker = AlcoholMarker {
    variant_id: "rs2031920",
    gene: "CYP2E1",
    allele: 'T',
    outcomes: [
        (
            "Reduced CYP2E1 metabolism",
            "TT: reduced CYP2E1 transcription and lower alternative ethanol oxidation.",
            "reduced",
            -1,
        ),
        (
            "Reduced CYP2E1 metabolism",
            "CT: mildly reduced CYP2E1 activity.",
            "reduced",
            0,
        ),
        (
            "Normal CYP2E1 metabolism",
            "CC: standard CYP2E1 expression.",
            "normal",
            0,
        ),
    ],
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlcoholMarkerResult {
    pub variant_id: String,
    pub gene: String,
    pub genotype: String,
    pub finding: String,
    pub description: String,
    pub contribution: String,
    pub cancer_modifier: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlcoholProfile {
    /// "slow", "normal" or "fast"
    pub metabolism_speed: String,
    /// "none", "mild", "severe", or "unknown" without rs671
    pub flush_risk: String,
    /// "average", "elevated" or "high"
    pub cancer_risk: String,
    pub markers_found: usize,
    pub markers_tested: usize,
    pub gene_results: Vec<AlcoholMarkerResult>,
    pub summary: String,
    pub recommendations: Vec<String>,
}

fn assess(genome: &GenomeModel, marker: &AlcoholMarker) -> Option<AlcoholMarkerResult> {
    let genotype = genome.genotype(marker.variant_id)?;
    let copies = usize::from(genotype.count_allele(marker.allele)).min(2);
    let (finding, description, contribution, cancer_modifier) = marker.outcomes[2 - copies];

    Some(AlcoholMarkerResult {
        variant_id: marker.variant_id.to_string(),
        gene: marker.gene.to_string(),
        genotype: genotype.to_string(),
        finding: finding.to_string(),
        description: description.to_string(),
        contribution: contribution.to_string(),
        cancer_modifier,
    })
}

fn summarize(speed: &str, flush: &str, cancer: &str, markers_found: usize) -> String {
    if markers_found == 0 {
        return "No alcohol metabolism markers available in genotype data.".to_string();
    }

    let mut parts = Vec::new();
    match speed {
        "fast" => parts.push("fast ethanol-to-acetaldehyde conversion (ADH1B)"),
        "slow" => parts.push("slower ethanol metabolism"),
        _ => {}
    }
    match flush {
        "severe" => parts.push("severe alcohol flush reaction (ALDH2 deficiency)"),
        "mild" => parts.push("mild alcohol flush risk (ALDH2 partial deficiency)"),
        _ => {}
    }
    match cancer {
        "high" => parts.push("high alcohol-related cancer risk"),
        "elevated" => parts.push("elevated alcohol-related cancer risk"),
        _ => {}
    }

    if parts.is_empty() {
        "Alcohol metabolism profile is typical; no notable variants affecting alcohol processing.".to_string()
    } else {
        format!("Alcohol metabolism profile shows: {}.", parts.join("; "))
    }
}

fn recommendations(speed: &str, flush: &str, cancer: &str, markers_found: usize) -> Vec<String> {
    let mut recs: Vec<&str> = Vec::new();
    match flush {
        "severe" => recs.extend([
            "ALDH2 deficiency detected: strongly consider avoiding alcohol entirely.",
            "Even small amounts of alcohol cause toxic acetaldehyde accumulation, raising esophageal cancer risk up to 10x.",
            "Do not take ALDH-inhibiting medications (e.g. disulfiram) without medical supervision.",
        ]),
        "mild" => recs.extend([
            "Partial ALDH2 deficiency detected: limit alcohol consumption significantly.",
            "Drinking despite the flush reaction substantially increases esophageal and head/neck cancer risk.",
        ]),
        _ => {}
    }
    if speed == "fast" && matches!(flush, "none" | "unknown") {
        recs.push(
            "Fast ADH1B metabolism offers some protection against alcohol dependence but not against harm from heavy drinking.",
        );
    }
    if matches!(cancer, "elevated" | "high") {
        recs.push("Discuss esophageal and head/neck cancer screening with a physician if alcohol is consumed.");
    }
    if recs.is_empty() && markers_found > 0 {
        recs.push("Standard alcohol guidelines apply.");
    }
    recs.into_iter().map(str::to_string).collect()
}

/// Profile alcohol metabolism
///
/// # Returns
/// * `AlcoholProfile` - Speed from ADH1B (CYP2E1 can lower normal to slow),
///   flush from ALDH2, cancer risk from the summed modifiers
pub fn profile(genome: &GenomeModel) -> AlcoholProfile {
    let adh1b = assess(genome, &ADH1B);
    let aldh2 = assess(genome, &ALDH2);
    let cyp2e1 = assess(genome, &CYP2E1);

    let mut metabolism_speed = match adh1b.as_ref().map(|r| r.contribution.as_str()) {
        Some("very_fast") | Some("fast") => "fast",
        _ => "normal",
    };
    if metabolism_speed == "normal" && cyp2e1.as_ref().is_some_and(|r| r.contribution == "reduced") {
        metabolism_speed = "slow";
    }
    let flush_risk = aldh2.as_ref().map(|r| r.contribution.clone()).unwrap_or_else(|| "unknown".to_string());

    let gene_results: Vec<AlcoholMarkerResult> = [adh1b, aldh2, cyp2e1].into_iter().flatten().collect();
    let cancer_score: i32 = gene_results.iter().map(|r| i32::from(r.cancer_modifier)).sum();
    let cancer_risk = match cancer_score {
        s if s >= 3 => "high",
        s if s >= 1 => "elevated",
        _ => "average",
    };

    let markers_found = gene_results.len();
    info!(
        "Alcohol profile: {} speed, {} flush, {} cancer risk ({}/3 markers)",
        metabolism_speed, flush_risk, cancer_risk, markers_found
    );

    AlcoholProfile {
        summary: summarize(metabolism_speed, &flush_risk, cancer_risk, markers_found),
        recommendations: recommendations(metabolism_speed, &flush_risk, cancer_risk, markers_found),
        metabolism_speed: metabolism_speed.to_string(),
        flush_risk,
        cancer_risk: cancer_risk.to_string(),
        markers_found,
        markers_tested: 3,
        gene_results,
    }
}

pub fn run(genome: &GenomeModel) -> Result<AlcoholProfile, AnalysisError> {
    Ok(profile(genome))
}
