// ==============================================================================
// clinvar.rs - Clinical Variant Registry Parser
// ==============================================================================
// Description: Parser for the ClinVar allele summary (TSV, optionally gzip)
// Author: Matt Barham
// Created: 2025-12-01
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// Format: Tab-delimited with header
//   chrom  pos  ref  alt  clinical_significance  review_status  gold_stars
//   all_traits  symbol  inheritance_modes  [rsid  hgvs_p  hgvs_c  molecular_consequence]
// Indels are loaded unchanged; the classifier filters them.
// ==============================================================================

use super::field;
use crate::models::{normalize_chromosome, ClinicalSignificance, InheritancePattern};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Highest review confidence ("gold stars") ClinVar assigns
pub const MAX_GOLD_STARS: u8 = 4;

/// One clinical registry record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicalVariantRecord {
    pub variant_id: Option<String>,
    pub chromosome: String,
    pub position: u64,
    pub reference_allele: String,
    pub alternate_allele: String,
    pub clinical_significance: ClinicalSignificance,
    /// Significance text as submitted
    pub significance_text: String,
    pub condition: String,
    pub inheritance: InheritancePattern,
    pub review_confidence: u8,
    pub review_status: String,
    pub gene: String,
    pub hgvs_p: String,
    pub hgvs_c: String,
    pub molecular_consequence: String,
}

impl ClinicalVariantRecord {
    /// Both alleles are one character and neither is the "-" indel marker
    pub fn is_snv(&self) -> bool {
        let single = |allele: &str| allele.chars().count() == 1 && allele != INDEL_MARKER;
        single(&self.reference_allele) && single(&self.alternate_allele)
    }
}

/// Empty-side allele used for simple insertions and deletions
pub const INDEL_MARKER: &str = "-";

/// Nucleotide string or the indel marker
fn valid_allele(allele: &str) -> bool {
    allele == INDEL_MARKER || (!allele.is_empty() && allele.chars().all(|c| matches!(c, 'A' | 'C' | 'G' | 'T')))
}

/// Errors that can occur during registry parsing
#[derive(Error, Debug)]
pub enum ClinVarParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Registry contains no usable records")]
    EmptyFile,
}

/// Registry records in file order
#[derive(Debug, Clone, Default)]
pub struct ClinVarRegistry {
    pub records: Vec<ClinicalVariantRecord>,
}

impl ClinVarRegistry {
    pub fn from_records(records: Vec<ClinicalVariantRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct ClinVarParser;

impl ClinVarParser {
    /// Parse the ClinVar allele TSV
    ///
    /// # Arguments
    /// * `path` - Path to clinvar_alleles.tsv or clinvar_alleles.tsv.gz
    ///
    /// # Returns
    /// * `Ok((ClinVarRegistry, skipped_rows))` - Records plus malformed row count
    /// * `Err(ClinVarParseError)` - Unreadable file, missing column or no records
    ///
    /// # Malformed rows
    /// Missing chromosome/position, alleles other than ACGT strings or "-",
    /// unparseable position, unrecognised significance, or gold stars
    /// outside 0-4.
    pub fn parse(path: impl AsRef<Path>) -> Result<(ClinVarRegistry, usize), ClinVarParseError> {
        let mut reader = super::tsv_reader(path.as_ref())?;
        let headers = reader.headers()?.clone();

        let col = |name: &str| -> Result<usize, ClinVarParseError> {
            super::column(&headers, name).map_err(|_| ClinVarParseError::MissingColumn(name.to_string()))
        };
        let chrom_col = col("chrom")?;
        let pos_col = col("pos")?;
        let ref_col = col("ref")?;
        let alt_col = col("alt")?;
        let sig_col = col("clinical_significance")?;
        let optional = |name: &str| super::column(&headers, name).ok();
        let review_col = optional("review_status");
        let stars_col = optional("gold_stars");
        let traits_col = optional("all_traits");
        let symbol_col = optional("symbol");
        let inheritance_col = optional("inheritance_modes");
        let rsid_col = optional("rsid");
        let hgvs_p_col = optional("hgvs_p");
        let hgvs_c_col = optional("hgvs_c");
        let consequence_col = optional("molecular_consequence");

        let mut records = Vec::new();
        let mut skipped_rows = 0;

        for (row, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("ClinVar row {}: {}", row + 2, e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let chromosome = field(&record, Some(chrom_col));
            let reference_allele = field(&record, Some(ref_col)).to_ascii_uppercase();
            let alternate_allele = field(&record, Some(alt_col)).to_ascii_uppercase();
            let position = field(&record, Some(pos_col)).parse::<u64>().ok();
            let significance_text = field(&record, Some(sig_col));
            let significance = ClinicalSignificance::parse(significance_text);
            let stars = parse_gold_stars(field(&record, stars_col));

            let (position, significance, stars) = match (position, significance, stars) {
                (Some(p), Some(s), Some(g))
                    if !chromosome.is_empty() && valid_allele(&reference_allele) && valid_allele(&alternate_allele) =>
                {
                    (p, s, g)
                }
                _ => {
                    debug!("ClinVar row {}: malformed record", row + 2);
                    skipped_rows += 1;
                    continue;
                }
            };

            let rsid = field(&record, rsid_col);
            let variant_id = match rsid {
                "" | "-1" | "." => None,
                id if id.starts_with("rs") => Some(id.to_string()),
                id => Some(format!("rs{}", id)),
            };

            records.push(ClinicalVariantRecord {
                variant_id,
                chromosome: normalize_chromosome(chromosome),
                position,
                reference_allele,
                alternate_allele,
                clinical_significance: significance,
                significance_text: significance_text.to_string(),
                condition: field(&record, traits_col).to_string(),
                inheritance: InheritancePattern::parse(field(&record, inheritance_col)),
                review_confidence: stars,
                review_status: field(&record, review_col).to_string(),
                gene: field(&record, symbol_col).to_string(),
                hgvs_p: field(&record, hgvs_p_col).to_string(),
                hgvs_c: field(&record, hgvs_c_col).to_string(),
                molecular_consequence: field(&record, consequence_col).to_string(),
            });
        }

        if records.is_empty() {
            return Err(ClinVarParseError::EmptyFile);
        }

        info!(
            "Loaded {} ClinVar records ({} malformed rows skipped)",
            records.len(),
            skipped_rows
        );

        Ok((ClinVarRegistry::from_records(records), skipped_rows))
    }
}

/// Empty gold stars mean zero; anything else must be an integer 0-4
fn parse_gold_stars(raw: &str) -> Option<u8> {
    if raw.is_empty() {
        return Some(0);
    }
    raw.parse::<u8>().ok().filter(|stars| *stars <= MAX_GOLD_STARS)
}
