// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for genome files and curated reference databases
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================

pub mod aims;
pub mod clinvar;
pub mod epistasis;
pub mod genome23andme;
pub mod haplogroups;
pub mod lifestyle;
pub mod pgs;
pub mod pharmgkb;
pub mod star_alleles;

pub use aims::{AncestryMarker, AncestryMarkerTable};
pub use clinvar::{ClinVarParseError, ClinVarParser, ClinVarRegistry, ClinicalVariantRecord};
pub use epistasis::{EpistasisCondition, EpistasisRule, EpistasisRuleSet, RiskLevel};
pub use genome23andme::{Genome23ParseError, Genome23Parser, Genome23Record, LoadStats};
pub use haplogroups::{HaplogroupNode, HaplogroupTree};
pub use lifestyle::{GenotypeInterpretation, LifestyleEntry, LifestyleTable};
pub use pgs::{PgsParseError, PgsParser, PolygenicModel, PrsVariant, ReferenceDistribution};
pub use pharmgkb::{DrugGeneAnnotation, PharmGkbTable};
pub use star_alleles::{StarAllele, StarAlleleGene, StarAlleleTable};

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Rows parsed from a reference table plus the count of malformed rows skipped
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub data: T,
    pub skipped_rows: usize,
}

/// Errors shared by the curated reference-table parsers
#[derive(Error, Debug)]
pub enum ReferenceParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Table contains no usable rows")]
    Empty,
}

/// Open a text file, transparently decompressing gzip input
///
/// Compression is detected from the magic bytes, not the extension.
pub fn open_text(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let read = file.read(&mut magic)?;
    let file = File::open(path)?;

    if read == 2 && magic == GZIP_MAGIC {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Tab-delimited CSV reader over a (possibly gzipped) file
pub(crate) fn tsv_reader(path: &Path) -> std::io::Result<csv::Reader<Box<dyn BufRead>>> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(open_text(path)?))
}

/// Column index for a header, or MissingColumn
pub(crate) fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, ReferenceParseError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ReferenceParseError::MissingColumn(name.to_string()))
}

/// Field by optional index, trimmed, empty when absent
pub(crate) fn field<'a>(record: &'a csv::StringRecord, index: Option<usize>) -> &'a str {
    index.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}
