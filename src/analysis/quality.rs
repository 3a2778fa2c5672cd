// ==============================================================================
// quality.rs - Genotype Data Quality Metrics
// ==============================================================================
// Description: Call rate, per-chromosome counts and heterozygosity
// Author: Matt Barham
// Created: 2025-12-03
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================

use crate::models::GenomeModel;
use crate::parsers::LoadStats;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub total_calls: usize,
    pub no_calls: usize,
    /// calls / (calls + no-calls)
    pub call_rate: f64,
    pub chromosome_counts: BTreeMap<String, usize>,
    pub autosomal_calls: usize,
    pub autosomal_heterozygosity: f64,
    pub mt_calls: usize,
    pub has_y_calls: bool,
    pub malformed_lines: usize,
    pub invalid_genotypes: usize,
}

fn is_autosome(chromosome: &str) -> bool {
    matches!(chromosome.parse::<u8>(), Ok(1..=22))
}

/// Summarise the loaded genome
///
/// # Arguments
/// * `genome` - Loaded genotype calls
/// * `stats` - Counters from the loader
pub fn compute(genome: &GenomeModel, stats: &LoadStats) -> QualityMetrics {
    let mut chromosome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut autosomal_calls = 0usize;
    let mut autosomal_het = 0usize;

    for call in genome.calls() {
        *chromosome_counts.entry(call.chromosome.clone()).or_insert(0) += 1;
        if is_autosome(&call.chromosome) {
            autosomal_calls += 1;
            if call.genotype.is_heterozygous() {
                autosomal_het += 1;
            }
        }
    }

    let total_calls = genome.len();
    let attempted = total_calls + stats.no_calls;
    let call_rate = if attempted > 0 {
        total_calls as f64 / attempted as f64
    } else {
        0.0
    };
    let autosomal_heterozygosity = if autosomal_calls > 0 {
        autosomal_het as f64 / autosomal_calls as f64
    } else {
        0.0
    };

    let metrics = QualityMetrics {
        total_calls,
        no_calls: stats.no_calls,
        call_rate,
        mt_calls: chromosome_counts.get("MT").copied().unwrap_or(0),
        has_y_calls: chromosome_counts.get("Y").copied().unwrap_or(0) > 0,
        chromosome_counts,
        autosomal_calls,
        autosomal_heterozygosity,
        malformed_lines: stats.malformed_lines,
        invalid_genotypes: stats.invalid_genotypes,
    };

    info!(
        "Quality: {} calls, call rate {:.2}%, autosomal heterozygosity {:.3}",
        metrics.total_calls,
        metrics.call_rate * 100.0,
        metrics.autosomal_heterozygosity
    );
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genotype, GenotypeCall};

    fn call(id: &str, chrom: &str, pos: u64, gt: &str) -> GenotypeCall {
        GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: chrom.to_string(),
            position: pos,
            genotype: Genotype::parse(gt).unwrap(),
        }
    }

    #[test]
    fn test_quality_metrics() {
        let (genome, _) = GenomeModel::from_calls(vec![
            call("rs1", "1", 100, "AG"),
            call("rs2", "1", 200, "AA"),
            call("rs3", "22", 300, "CT"),
            call("rs4", "X", 400, "GG"),
            call("rs5", "MT", 500, "GG"),
            call("rs6", "Y", 600, "TT"),
        ]);
        let stats = LoadStats {
            no_calls: 2,
            ..LoadStats::default()
        };

        let metrics = compute(&genome, &stats);
        assert_eq!(metrics.total_calls, 6);
        assert!((metrics.call_rate - 0.75).abs() < 1e-12);
        assert_eq!(metrics.autosomal_calls, 3);
        assert!((metrics.autosomal_heterozygosity - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.mt_calls, 1);
        assert!(metrics.has_y_calls);
        assert_eq!(metrics.chromosome_counts["1"], 2);
    }

    #[test]
    fn test_no_y_calls() {
        let (genome, _) = GenomeModel::from_calls(vec![call("rs1", "X", 1, "AG")]);
        let metrics = compute(&genome, &LoadStats::default());
        assert!(!metrics.has_y_calls);
        assert_eq!(metrics.autosomal_heterozygosity, 0.0);
        assert_eq!(metrics.call_rate, 1.0);
    }
}
