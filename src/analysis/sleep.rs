// ==============================================================================
// sleep.rs - Sleep and Circadian Profile
// ==============================================================================
// Description: Chronotype estimate from clock-gene variants, with caffeine
//              timing adjusted by the lifestyle interpreter's caffeine statuses
// Author: Matt Barham
// Created: 2026-01-26
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// score = 100 × Σ(evening copies × weight) / Σ(2 × weight), over genotyped
// markers only; 50 when none are genotyped. 0 is extreme morning, 100 extreme
// evening.
// ==============================================================================

use super::lifestyle::LifestyleResult;
use super::AnalysisError;
use crate::models::{Confidence, GenomeModel};
use serde::Serialize;
use tracing::info;

const NEUTRAL_SCORE: f64 = 50.0;

struct ClockMarker {
    variant_id: &'static str,
    gene: &'static str,
    trait_name: &'static str,
    evening_allele: char,
    weight: f64,
    description: &'static str,
}

const MARKERS: [ClockMarker; 9] = [
    ClockMarker { variant_id: "rs1801260", gene: "CLOCK", trait_name: "chronotype", evening_allele: 'C', weight: 1.0, description: "CLOCK 3111T>C, evening preference" },
    ClockMarker { variant_id: "rs2304672", gene: "CLOCK", trait_name: "chronotype", evening_allele: 'C', weight: 0.7, description: "CLOCK chronotype variant" },
    ClockMarker { variant_id: "rs934945", gene: "PER2", trait_name: "chronotype", evening_allele: 'G', weight: 0.9, description: "PER2 period circadian protein 2" },
    ClockMarker { variant_id: "rs228697", gene: "PER3", trait_name: "chronotype", evening_allele: 'C', weight: 0.8, description: "PER3 short sleep tolerance, evening preference" },
    ClockMarker { variant_id: "rs2278749", gene: "ARNTL", trait_name: "chronotype", evening_allele: 'T', weight: 0.6, description: "BMAL1/ARNTL core circadian oscillator" },
    ClockMarker { variant_id: "rs2305160", gene: "NPAS2", trait_name: "chronotype", evening_allele: 'G', weight: 0.7, description: "NPAS2 neuronal PAS domain protein 2" },
    ClockMarker { variant_id: "rs10830963", gene: "MTNR1B", trait_name: "melatonin", evening_allele: 'G', weight: 0.8, description: "Melatonin receptor 1B, delayed melatonin onset" },
    ClockMarker { variant_id: "rs6295", gene: "HTR1A", trait_name: "sleep_quality", evening_allele: 'G', weight: 0.5, description: "Serotonin 1A receptor, REM sleep regulation" },
    ClockMarker { variant_id: "rs73598374", gene: "ADA", trait_name: "sleep_depth", evening_allele: 'T', weight: 0.7, description: "Adenosine deaminase, deep sleep pressure" },
];

/// (minimum score, chronotype, sleep window, caffeine cutoff, peak alertness)
type Band = (f64, &'static str, &'static str, &'static str, &'static str);

const BANDS: [Band; 5] = [
    (70.0, "Definite Evening", "12:00 AM - 8:00 AM", "12:00 PM", "10:00 AM - 2:00 PM and 7:00 PM - 11:00 PM"),
    (55.0, "Moderate Evening", "11:30 PM - 7:30 AM", "1:00 PM", "10:00 AM - 1:00 PM and 6:00 PM - 10:00 PM"),
    (45.0, "Intermediate", "11:00 PM - 7:00 AM", "2:00 PM", "9:00 AM - 12:00 PM and 3:00 PM - 7:00 PM"),
    (30.0, "Moderate Morning", "10:00 PM - 6:00 AM", "2:00 PM", "8:00 AM - 12:00 PM"),
    (f64::MIN, "Definite Morning", "9:30 PM - 5:30 AM", "12:00 PM", "6:00 AM - 11:00 AM"),
];

/// (gene, status) pairs from the lifestyle interpreter that mark caffeine sensitivity
const CAFFEINE_SENSITIVE: [(&str, &str); 3] = [("CYP1A2", "slow"), ("CYP1A2", "intermediate"), ("ADORA2A", "anxiety_prone")];
const SENSITIVE_CUTOFF: &str = "10:00 AM or avoid entirely";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepMarker {
    pub variant_id: String,
    pub gene: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub genotype: String,
    pub evening_allele_copies: u8,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepProfile {
    pub chronotype: String,
    pub chronotype_score: f64,
    pub sleep_markers: Vec<SleepMarker>,
    pub markers_found: usize,
    pub optimal_sleep_window: String,
    pub caffeine_cutoff: String,
    pub peak_alertness: String,
    pub caffeine_sensitive: bool,
    pub deep_sleep_note: Option<String>,
    pub recommendations: Vec<String>,
    pub confidence: Confidence,
}

fn caffeine_sensitive(lifestyle: Option<&LifestyleResult>) -> bool {
    lifestyle.is_some_and(|result| {
        result
            .findings
            .iter()
            .filter(|f| f.is_interpreted())
            .any(|f| CAFFEINE_SENSITIVE.iter().any(|(gene, status)| f.gene == *gene && f.status == *status))
    })
}

/// Build the chronotype profile
///
/// # Arguments
/// * `genome` - Subject genotypes
/// * `lifestyle` - Lifestyle findings, when available, for caffeine sensitivity
///
/// # Returns
/// * `SleepProfile` - Confidence is high with six or more markers, moderate
///   with three or more
pub fn profile(genome: &GenomeModel, lifestyle: Option<&LifestyleResult>) -> SleepProfile {
    let mut evening = 0.0;
    let mut total_weight = 0.0;
    let mut sleep_markers = Vec::new();

    for marker in &MARKERS {
        let Some(genotype) = genome.genotype(marker.variant_id) else {
            continue;
        };
        let copies = genotype.count_allele(marker.evening_allele);
        evening += f64::from(copies) * marker.weight;
        total_weight += 2.0 * marker.weight;
        sleep_markers.push(SleepMarker {
            variant_id: marker.variant_id.to_string(),
            gene: marker.gene.to_string(),
            trait_name: marker.trait_name.to_string(),
            genotype: genotype.to_string(),
            evening_allele_copies: copies,
            description: marker.description.to_string(),
        });
    }

    let chronotype_score = if total_weight > 0.0 {
        (evening / total_weight * 1000.0).round() / 10.0
    } else {
        NEUTRAL_SCORE
    };

    let (_, chronotype, window, mut cutoff, peak) = BANDS
        .iter()
        .copied()
        .find(|band| chronotype_score >= band.0)
        .unwrap_or(BANDS[BANDS.len() - 1]);

    let sensitive = caffeine_sensitive(lifestyle);
    if sensitive {
        cutoff = SENSITIVE_CUTOFF;
    }

    let mut recommendations = vec![
        format!("Target sleep window: {}", window),
        format!("Last caffeine by: {}", cutoff),
        format!("Peak alertness hours: {}", peak),
    ];
    if chronotype_score >= 60.0 {
        recommendations.push("Bright light within 30 minutes of waking helps shift the circadian rhythm earlier.".to_string());
        recommendations.push("Filter blue light starting two hours before the target bedtime.".to_string());
    } else if chronotype_score <= 40.0 {
        recommendations.push("Avoid bright evening light to preserve the early chronotype.".to_string());
        recommendations.push("Early morning exercise reinforces a morning rhythm.".to_string());
    }
    if sensitive {
        recommendations.push("Caffeine metabolism genes suggest high sensitivity; consider reducing or eliminating caffeine.".to_string());
    }

    let deep_sleep_note = sleep_markers
        .iter()
        .any(|m| m.gene == "ADA" && m.evening_allele_copies > 0)
        .then(|| {
            "ADA variant detected: sleep pressure likely builds faster, giving deeper sleep but greater sensitivity to sleep deprivation."
                .to_string()
        });

    let markers_found = sleep_markers.len();
    let confidence = Confidence::from_count(markers_found, 6, 3);
    info!(
        "Chronotype: {} (score {:.1}, {} markers, {} confidence)",
        chronotype,
        chronotype_score,
        markers_found,
        confidence.as_str()
    );

    SleepProfile {
        chronotype: chronotype.to_string(),
        chronotype_score,
        sleep_markers,
        markers_found,
        optimal_sleep_window: window.to_string(),
        caffeine_cutoff: cutoff.to_string(),
        peak_alertness: peak.to_string(),
        caffeine_sensitive: sensitive,
        deep_sleep_note,
        recommendations,
        confidence,
    }
}

pub fn run(genome: &GenomeModel, lifestyle: Option<&LifestyleResult>) -> Result<SleepProfile, AnalysisError> {
    Ok(profile(genome, lifestyle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genotype, GenotypeCall};

    fn genome(calls: &[(&str, &str)]) -> GenomeModel {
        GenomeModel::from_calls(calls.iter().enumerate().map(|(i, (id, gt))| GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: "4".to_string(),
            position: 56_000_000 + i as u64,
            genotype: Genotype::parse(gt).unwrap(),
        }))
        .0
    }

    #[test]
    fn test_no_markers_is_neutral() {
        let result = profile(&genome(&[("rs1", "AA")]), None);
        assert_eq!(result.chronotype_score, 50.0);
        assert_eq!(result.chronotype, "Intermediate");
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.deep_sleep_note.is_none());
    }

    #[test]
    fn test_evening_alleles_give_evening_chronotype() {
        let result = profile(
            &genome(&[("rs1801260", "CC"), ("rs934945", "GG"), ("rs228697", "CT"), ("rs73598374", "CT")]),
            None,
        );

        // (2×1.0 + 2×0.9 + 1×0.8 + 1×0.7) / (2×3.4)
        assert_eq!(result.chronotype_score, 77.9);
        assert_eq!(result.chronotype, "Definite Evening");
        assert_eq!(result.confidence, Confidence::Moderate);
        assert!(result.deep_sleep_note.is_some());
        assert!(result.recommendations.iter().any(|r| r.contains("Bright light")));
    }

    #[test]
    fn test_morning_alleles_give_morning_chronotype() {
        let result = profile(&genome(&[("rs1801260", "TT"), ("rs2304672", "GG"), ("rs934945", "AA")]), None);
        assert_eq!(result.chronotype_score, 0.0);
        assert_eq!(result.chronotype, "Definite Morning");
        assert_eq!(result.caffeine_cutoff, "12:00 PM");
    }

    #[test]
    fn test_slow_caffeine_status_moves_cutoff() {
        use crate::analysis::lifestyle::{LifestyleFinding, LifestyleSummary};
        use crate::analysis::ComponentOutcome;

        let lifestyle = LifestyleResult {
            findings: vec![LifestyleFinding {
                variant_id: "rs762551".to_string(),
                entry_key: None,
                gene: "CYP1A2".to_string(),
                category: "Drug Metabolism".to_string(),
                genotype: "CC".to_string(),
                status: "slow".to_string(),
                description: "Slow caffeine metabolizer".to_string(),
                magnitude: 3,
                note: None,
                population_frequency: None,
            }],
            by_category: Default::default(),
            summary: LifestyleSummary::default(),
            drug_gene: ComponentOutcome::Skipped { reason: "pharmgkb".to_string() },
        };

        let result = profile(&genome(&[("rs1801260", "CT")]), Some(&lifestyle));
        assert!(result.caffeine_sensitive);
        assert_eq!(result.caffeine_cutoff, SENSITIVE_CUTOFF);
        assert!(result.recommendations[1].ends_with(SENSITIVE_CUTOFF));
    }
}
