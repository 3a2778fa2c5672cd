// ==============================================================================
// pgs.rs - Polygenic Risk Model Parser
// ==============================================================================
// Description: Parser for curated GWAS-derived polygenic risk models
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================
// Format: long-form TSV, one row per (model, SNP)
// Example:
//   model_id  model_name  reference  rsid  gene  risk_allele  log_or  eur_freq
//   type2_diabetes  Type 2 Diabetes  Mahajan 2018  rs7903146  TCF7L2  T  0.322  0.29
// ==============================================================================

use super::aims::single_nucleotide;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// One raw row of the model table
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct PrsRow {
    model_id: String,
    model_name: String,
    #[serde(default)]
    reference: String,
    rsid: String,
    #[serde(default)]
    gene: String,
    risk_allele: String,
    #[serde(rename = "log_or")]
    log_odds_ratio: f64,
    #[serde(rename = "eur_freq")]
    eur_frequency: f64,
}

/// Weighted SNP inside a polygenic model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrsVariant {
    pub variant_id: String,
    pub gene: String,
    pub risk_allele: char,
    pub log_odds_ratio: f64,
    /// European risk-allele frequency used for the reference distribution
    pub eur_frequency: f64,
}

/// Reference-population score distribution (normal approximation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceDistribution {
    pub mean: f64,
    pub sd: f64,
}

/// A polygenic risk model
#[derive(Debug, Clone, PartialEq)]
pub struct PolygenicModel {
    pub id: String,
    pub name: String,
    pub reference: String,
    /// Unique by variant id, in file order
    pub variants: Vec<PrsVariant>,
}

impl PolygenicModel {
    /// Normal approximation of the score distribution over `variants`
    ///
    /// Under Hardy-Weinberg with risk-allele frequency p, each SNP adds
    /// mean 2pβ and variance 2p(1-p)β².
    pub fn reference_distribution<'a>(variants: impl IntoIterator<Item = &'a PrsVariant>) -> ReferenceDistribution {
        let (mean, variance) = variants.into_iter().fold((0.0, 0.0), |(m, v), snp| {
            let p = snp.eur_frequency;
            let beta = snp.log_odds_ratio;
            (m + 2.0 * p * beta, v + 2.0 * p * (1.0 - p) * beta * beta)
        });

        ReferenceDistribution {
            mean,
            sd: variance.max(0.0).sqrt(),
        }
    }
}

/// Errors that can occur during model file parsing
#[derive(Error, Debug)]
pub enum PgsParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("File is empty or contains no valid models")]
    EmptyFile,
}

/// Polygenic model table parser
pub struct PgsParser;

impl PgsParser {
    /// Parse polygenic models from the long-form TSV
    ///
    /// # Arguments
    /// * `path` - Path to prs_models.tsv
    ///
    /// # Returns
    /// * `Ok((models, skipped_rows))` - Models in file order, malformed row count
    /// * `Err(PgsParseError)` - Unreadable file or no usable models
    ///
    /// # Validation
    /// A row is malformed (skipped, counted) when:
    /// - it fails to deserialize
    /// - the risk allele is not a single nucleotide
    /// - log_or is non-finite or outside (-1, 1)
    /// - eur_freq is outside [0, 1]
    /// - the rsid already appeared in the same model
    pub fn parse(path: impl AsRef<Path>) -> Result<(Vec<PolygenicModel>, usize), PgsParseError> {
        let mut reader = super::tsv_reader(path.as_ref())?;

        let mut models: Vec<PolygenicModel> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut skipped_rows = 0;

        for (idx, result) in reader.deserialize::<PrsRow>().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    debug!("PRS row {}: {}", idx + 2, e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let risk_allele = match single_nucleotide(&row.risk_allele) {
                Some(allele) if Self::valid_weights(&row) => allele,
                _ => {
                    debug!("PRS row {}: invalid allele or weight for {}", idx + 2, row.rsid);
                    skipped_rows += 1;
                    continue;
                }
            };

            if !seen.insert((row.model_id.clone(), row.rsid.clone())) {
                debug!("PRS row {}: duplicate {} in {}", idx + 2, row.rsid, row.model_id);
                skipped_rows += 1;
                continue;
            }

            let position = *index.entry(row.model_id.clone()).or_insert_with(|| {
                models.push(PolygenicModel {
                    id: row.model_id.clone(),
                    name: row.model_name.clone(),
                    reference: row.reference.clone(),
                    variants: Vec::new(),
                });
                models.len() - 1
            });

            models[position].variants.push(PrsVariant {
                variant_id: row.rsid,
                gene: row.gene,
                risk_allele,
                log_odds_ratio: row.log_odds_ratio,
                eur_frequency: row.eur_frequency,
            });
        }

        if models.is_empty() {
            return Err(PgsParseError::EmptyFile);
        }

        info!(
            "Loaded {} polygenic models ({} malformed rows skipped)",
            models.len(),
            skipped_rows
        );

        Ok((models, skipped_rows))
    }

    fn valid_weights(row: &PrsRow) -> bool {
        row.log_odds_ratio.is_finite()
            && row.log_odds_ratio.abs() < 1.0
            && (0.0..=1.0).contains(&row.eur_frequency)
            && !row.rsid.trim().is_empty()
    }
}
