// ==============================================================================
// aims.rs - Ancestry-Informative Marker Table Parser
// ==============================================================================
// Description: Parses per-superpopulation allele frequencies for AIMs
// Author: Matt Barham
// Created: 2025-12-04
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// Format:
//   rsid  gene  description  allele  EUR  AFR  EAS  SAS  AMR
//   rs1426654  SLC24A5  Skin pigmentation  A  0.978  0.073  0.013  0.6  0.553
// Frequencies are for `allele` and must lie in [0, 1].
// ==============================================================================

use super::{column, field, tsv_reader, Parsed, ReferenceParseError};
use crate::models::Superpopulation;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// One ancestry-informative marker
#[derive(Debug, Clone, PartialEq)]
pub struct AncestryMarker {
    pub variant_id: String,
    pub gene: String,
    pub description: String,
    /// Allele whose frequency is tabulated
    pub allele: char,
    pub frequencies: HashMap<Superpopulation, f64>,
}

impl AncestryMarker {
    /// Frequency of the tabulated allele in a population
    pub fn frequency(&self, population: Superpopulation) -> Option<f64> {
        self.frequencies.get(&population).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AncestryMarkerTable {
    pub markers: Vec<AncestryMarker>,
}

impl AncestryMarkerTable {
    /// Parse the AIM frequency TSV
    ///
    /// A row is malformed when the allele is not a single nucleotide or any
    /// population frequency is missing, unparseable or outside [0, 1].
    pub fn parse(path: impl AsRef<Path>) -> Result<Parsed<Self>, ReferenceParseError> {
        let mut reader = tsv_reader(path.as_ref())?;
        let headers = reader.headers()?.clone();

        let rsid_col = column(&headers, "rsid")?;
        let allele_col = column(&headers, "allele")?;
        let gene_col = column(&headers, "gene").ok();
        let description_col = column(&headers, "description").ok();
        let population_cols = Superpopulation::ALL
            .iter()
            .map(|pop| column(&headers, pop.code()).map(|idx| (*pop, idx)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut markers = Vec::new();
        let mut skipped_rows = 0;

        for (row, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("AIM row {}: {}", row + 2, e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let variant_id = field(&record, Some(rsid_col));
            let allele = single_nucleotide(field(&record, Some(allele_col)));

            let mut frequencies = HashMap::new();
            for (population, idx) in &population_cols {
                if let Ok(value) = field(&record, Some(*idx)).parse::<f64>() {
                    if (0.0..=1.0).contains(&value) {
                        frequencies.insert(*population, value);
                    }
                }
            }

            match allele {
                Some(allele) if !variant_id.is_empty() && frequencies.len() == population_cols.len() => {
                    markers.push(AncestryMarker {
                        variant_id: variant_id.to_string(),
                        gene: field(&record, gene_col).to_string(),
                        description: field(&record, description_col).to_string(),
                        allele,
                        frequencies,
                    });
                }
                _ => {
                    debug!("AIM row {}: malformed allele or frequency", row + 2);
                    skipped_rows += 1;
                }
            }
        }

        if markers.is_empty() {
            return Err(ReferenceParseError::Empty);
        }

        info!(
            "Loaded {} ancestry markers ({} malformed rows skipped)",
            markers.len(),
            skipped_rows
        );

        Ok(Parsed {
            data: AncestryMarkerTable { markers },
            skipped_rows,
        })
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

pub(crate) fn single_nucleotide(raw: &str) -> Option<char> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if "ACGTacgt".contains(c) => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}
