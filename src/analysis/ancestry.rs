// ==============================================================================
// ancestry.rs - Ancestry Estimator
// ==============================================================================
// Description: Maximum-likelihood superpopulation scoring over ancestry-
//              informative markers, normalised with a stable softmax
// Author: Matt Barham
// Created: 2025-12-04
// Modified: 2026-02-09
// Version: 1.1.0
// ==============================================================================
// Per population P and marker with tabulated-allele frequency f (clamped to
// [0.001, 0.999]) and n observed copies of that allele:
//   LL_P += n·ln(f) + (2 − n)·ln(1 − f)
// The same marker set and formula are applied to all five populations.
// ==============================================================================

use super::AnalysisError;
use crate::models::{Confidence, GenomeModel, Superpopulation};
use crate::parsers::AncestryMarkerTable;
use crate::reference_data::DatabaseSlot;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

const FREQUENCY_FLOOR: f64 = 0.001;
const FREQUENCY_CEILING: f64 = 0.999;
const HIGH_CONFIDENCE_MARKERS: usize = 40;
const MODERATE_CONFIDENCE_MARKERS: usize = 20;

/// Label reported when no marker was genotyped
pub const UNKNOWN_ANCESTRY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerDetail {
    pub variant_id: String,
    pub gene: String,
    pub description: String,
    pub genotype: String,
    pub informative_allele: char,
    pub allele_count: u8,
    /// Max minus min population frequency
    pub informativeness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AncestryResult {
    pub proportions: BTreeMap<Superpopulation, f64>,
    pub log_likelihoods: BTreeMap<Superpopulation, f64>,
    pub markers_found: usize,
    pub markers_tested: usize,
    pub confidence: Confidence,
    pub top_ancestry: String,
    pub top_population: Option<Superpopulation>,
    pub details: Vec<MarkerDetail>,
}

impl AncestryResult {
    /// Fraction of ancestry outside the European superpopulation
    pub fn non_european_fraction(&self) -> f64 {
        1.0 - self.proportions.get(&Superpopulation::EUR).copied().unwrap_or(0.0)
    }
}

/// Log-likelihood of `count` copies of an allele with frequency `frequency`
pub fn genotype_log_likelihood(count: u8, frequency: f64) -> f64 {
    let f = frequency.clamp(FREQUENCY_FLOOR, FREQUENCY_CEILING);
    let n = f64::from(count);
    n * f.ln() + (2.0 - n) * (1.0 - f).ln()
}

/// Stable softmax: exponentiate after subtracting the maximum
pub fn softmax(log_likelihoods: &BTreeMap<Superpopulation, f64>) -> BTreeMap<Superpopulation, f64> {
    let max = log_likelihoods
        .values()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: BTreeMap<Superpopulation, f64> = log_likelihoods
        .iter()
        .map(|(pop, ll)| (*pop, (ll - max).exp()))
        .collect();
    let total: f64 = exps.values().sum();

    exps.into_iter().map(|(pop, e)| (pop, e / total)).collect()
}

/// Estimate superpopulation proportions
///
/// # Arguments
/// * `genome` - Subject genotypes
/// * `markers` - Ancestry-informative marker frequencies
///
/// # Returns
/// * `AncestryResult` - Proportions sum to 1; zero markers found yields a
///   uniform distribution, "Unknown" top ancestry and low confidence
pub fn estimate(genome: &GenomeModel, markers: &AncestryMarkerTable) -> AncestryResult {
    info!("Estimating ancestry from {} markers", markers.len());

    let mut log_likelihoods: BTreeMap<Superpopulation, f64> =
        Superpopulation::ALL.iter().map(|pop| (*pop, 0.0)).collect();
    let mut details = Vec::new();

    for marker in &markers.markers {
        let Some(genotype) = genome.genotype(&marker.variant_id) else {
            continue;
        };
        let count = genotype.count_allele(marker.allele);

        for (pop, total) in log_likelihoods.iter_mut() {
            if let Some(freq) = marker.frequency(*pop) {
                *total += genotype_log_likelihood(count, freq);
            }
        }

        let freqs: Vec<f64> = marker.frequencies.values().copied().collect();
        let informativeness = freqs.iter().copied().fold(f64::MIN, f64::max) - freqs.iter().copied().fold(f64::MAX, f64::min);

        details.push(MarkerDetail {
            variant_id: marker.variant_id.clone(),
            gene: marker.gene.clone(),
            description: marker.description.clone(),
            genotype: genotype.to_string(),
            informative_allele: marker.allele,
            allele_count: count,
            informativeness,
        });
    }

    let markers_found = details.len();
    if markers_found == 0 {
        warn!("No ancestry-informative markers genotyped; reporting uniform proportions");
        let uniform = 1.0 / Superpopulation::ALL.len() as f64;
        return AncestryResult {
            proportions: Superpopulation::ALL.iter().map(|pop| (*pop, uniform)).collect(),
            log_likelihoods,
            markers_found: 0,
            markers_tested: markers.len(),
            confidence: Confidence::Low,
            top_ancestry: UNKNOWN_ANCESTRY.to_string(),
            top_population: None,
            details,
        };
    }

    let proportions = softmax(&log_likelihoods);
    let top_population = proportions
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(pop, _)| *pop);
    let confidence = Confidence::from_count(markers_found, HIGH_CONFIDENCE_MARKERS, MODERATE_CONFIDENCE_MARKERS);

    info!(
        "Ancestry: top {} from {} markers ({} confidence)",
        top_population.map(|p| p.label()).unwrap_or(UNKNOWN_ANCESTRY),
        markers_found,
        confidence.as_str()
    );

    AncestryResult {
        proportions,
        log_likelihoods,
        markers_found,
        markers_tested: markers.len(),
        confidence,
        top_ancestry: top_population
            .map(|p| p.label().to_string())
            .unwrap_or_else(|| UNKNOWN_ANCESTRY.to_string()),
        top_population,
        details,
    }
}

pub fn run(genome: &GenomeModel, markers: &DatabaseSlot<AncestryMarkerTable>) -> Result<AncestryResult, AnalysisError> {
    let loaded = markers.require("ancestry_markers")?;
    Ok(estimate(genome, &loaded.data))
}
