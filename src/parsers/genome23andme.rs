// ==============================================================================
// genome23andme.rs - 23andMe Raw Data Parser
// ==============================================================================
// Description: Parser for 23andMe raw genome data files into a GenomeModel
// Author: Matt Barham
// Created: 2025-11-04
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================
// Format: Tab-delimited text with header comments (optionally gzip-compressed)
// Example:
//   # rsid    chromosome    position    genotype
//   rs548049170    1    69869    TT
//   rs13328684    1    74792    --
//   rs9283150    MT    565508    A
// ==============================================================================

use crate::models::{normalize_chromosome, GenomeModel, Genotype, GenotypeCall};
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 23andMe genome record
#[derive(Debug, Clone, PartialEq)]
pub struct Genome23Record {
    /// SNP identifier (e.g., "rs548049170")
    pub rsid: String,
    /// Chromosome ("1"-"22", "X", "Y", "MT")
    pub chromosome: String,
    /// Base pair position (GRCh37/hg19)
    pub position: u64,
    /// Raw genotype text as it appears in the file
    pub genotype: String,
}

/// Line counts gathered while loading, surfaced in quality reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadStats {
    pub lines_processed: usize,
    pub calls_loaded: usize,
    pub no_calls: usize,
    pub malformed_lines: usize,
    pub invalid_genotypes: usize,
    pub duplicate_ids: usize,
}

/// Parser for 23andMe raw genome files
#[derive(Debug, Clone)]
pub struct Genome23Parser {
    /// Chromosomes to include (e.g., vec!["1", "2", ..., "22"])
    /// If empty, includes all chromosomes
    pub include_chromosomes: Vec<String>,
}

/// Errors that can occur during 23andMe file parsing
#[derive(Error, Debug)]
pub enum Genome23ParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid line format at line {line}: {details}")]
    InvalidFormat { line: usize, details: String },

    #[error("Invalid position value at line {line}: {value}")]
    InvalidPosition { line: usize, value: String },

    #[error("File is empty or contains no usable genotype calls")]
    EmptyFile,
}

impl Default for Genome23Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Genome23Parser {
    /// Create a new parser that includes all chromosomes
    pub fn new() -> Self {
        Self {
            include_chromosomes: Vec::new(),
        }
    }

    /// Create a parser with specific chromosomes to include
    pub fn with_chromosomes(chromosomes: Vec<String>) -> Self {
        Self {
            include_chromosomes: chromosomes.iter().map(|c| normalize_chromosome(c)).collect(),
        }
    }

    /// Load a 23andMe genome file into a GenomeModel
    ///
    /// # Arguments
    /// * `path` - Path to the raw data file (genome_*.txt or genome_*.txt.gz)
    ///
    /// # Returns
    /// * `Ok((GenomeModel, LoadStats))` - Indexed genotypes plus line counts
    /// * `Err(Genome23ParseError)` - IO failure or no usable calls
    ///
    /// # Policy
    /// - "--" → counted as no-call, not stored
    /// - single base (haploid MT, male X/Y) → stored as homozygous pair
    /// - non-ACGT or longer genotypes ("DI", "II") → counted, not stored
    /// - wrong field count / bad position → counted as malformed, not stored
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(GenomeModel, LoadStats), Genome23ParseError> {
        let path = path.as_ref();
        info!("Loading genome from {}", path.display());

        let reader = super::open_text(path)?;
        self.load_reader(reader)
    }

    /// Load from any buffered reader (plain text already decompressed)
    pub fn load_reader<R: BufRead>(&self, reader: R) -> Result<(GenomeModel, LoadStats), Genome23ParseError> {
        let mut stats = LoadStats::default();
        let mut calls = Vec::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = line_result?;

            // Skip comment lines (start with '#')
            if line.trim().starts_with('#') || line.trim().is_empty() {
                continue;
            }
            stats.lines_processed += 1;

            let record = match self.parse_line(&line, line_number) {
                Ok(record) => record,
                Err(e) => {
                    debug!("{}", e);
                    stats.malformed_lines += 1;
                    continue;
                }
            };

            let chromosome = normalize_chromosome(&record.chromosome);
            if !self.include_chromosomes.is_empty() && !self.include_chromosomes.contains(&chromosome) {
                continue;
            }

            let genotype = match parse_raw_genotype(&record.genotype) {
                Some(gt) if gt.is_no_call() => {
                    stats.no_calls += 1;
                    continue;
                }
                Some(gt) => gt,
                None => {
                    stats.invalid_genotypes += 1;
                    continue;
                }
            };

            calls.push(GenotypeCall {
                variant_id: Some(record.rsid).filter(|id| !id.is_empty()),
                chromosome,
                position: record.position,
                genotype,
            });
        }

        let (genome, duplicates) = GenomeModel::from_calls(calls);
        stats.duplicate_ids = duplicates;
        stats.calls_loaded = genome.len();

        if genome.is_empty() {
            return Err(Genome23ParseError::EmptyFile);
        }

        if stats.invalid_genotypes > 0 || stats.malformed_lines > 0 {
            warn!(
                "Skipped {} invalid genotypes and {} malformed lines",
                stats.invalid_genotypes, stats.malformed_lines
            );
        }
        info!(
            "Loaded {} genotype calls ({} no-calls)",
            stats.calls_loaded, stats.no_calls
        );

        Ok((genome, stats))
    }

    /// Parse a single line from the 23andMe file
    fn parse_line(&self, line: &str, line_number: usize) -> Result<Genome23Record, Genome23ParseError> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() != 4 {
            return Err(Genome23ParseError::InvalidFormat {
                line: line_number,
                details: format!("Expected 4 tab-delimited fields, found {}", fields.len()),
            });
        }

        let rsid = fields[0].trim().to_string();
        let chromosome = fields[1].trim().to_string();
        let position_str = fields[2].trim();
        let genotype = fields[3].trim().to_string();

        let position = position_str.parse::<u64>().map_err(|_| {
            Genome23ParseError::InvalidPosition {
                line: line_number,
                value: position_str.to_string(),
            }
        })?;

        Ok(Genome23Record {
            rsid,
            chromosome,
            position,
            genotype,
        })
    }
}

/// Map raw genotype text to a Genotype; `None` means invalid
fn parse_raw_genotype(raw: &str) -> Option<Genotype> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(base), None) => Genotype::homozygous(base).ok(),
        _ => Genotype::parse(raw).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Create a temporary test file with sample 23andMe data
    fn create_test_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_file() {
        let contents = "\
# rsid\tchromosome\tposition\tgenotype
rs548049170\t1\t69869\tTT
rs13328684\t1\t74792\t--
rs9283150\t1\t565508\tAA
rs12345678\t2\t100000\tAG
";
        let file = create_test_file(contents);
        let (genome, stats) = Genome23Parser::new().load(file.path()).unwrap();

        assert_eq!(genome.len(), 3);
        assert_eq!(stats.lines_processed, 4);
        assert_eq!(stats.no_calls, 1);
        assert_eq!(stats.calls_loaded, 3);

        let call = genome.get("rs548049170").unwrap();
        assert_eq!(call.chromosome, "1");
        assert_eq!(call.position, 69869);
        assert_eq!(call.genotype.to_string(), "TT");

        assert!(genome.get("rs13328684").is_none());
        assert_eq!(genome.genotype("rs12345678").unwrap().to_string(), "AG");
    }

    #[test]
    fn test_haploid_and_invalid_genotypes() {
        let contents = "\
rs1\tMT\t100\tG
rs2\t1\t200\tDI
rs3\tchrX\t300\tA
rs4\t1\t400\tAGT
rs5\t1\t500\tCC
";
        let file = create_test_file(contents);
        let (genome, stats) = Genome23Parser::new().load(file.path()).unwrap();

        assert_eq!(genome.genotype("rs1").unwrap().to_string(), "GG");
        assert_eq!(genome.get("rs3").unwrap().chromosome, "X");
        assert!(genome.get("rs2").is_none());
        assert!(genome.get("rs4").is_none());
        assert_eq!(stats.invalid_genotypes, 2);
        assert_eq!(stats.calls_loaded, 3);
    }

    #[test]
    fn test_malformed_lines_are_counted() {
        let contents = "\
# rsid\tchromosome\tposition\tgenotype
rs548049170\t1\t69869
rs1\t1\tNOT_A_NUMBER\tTT
rs2\t1\t100\tAA
";
        let file = create_test_file(contents);
        let (genome, stats) = Genome23Parser::new().load(file.path()).unwrap();

        assert_eq!(genome.len(), 1);
        assert_eq!(stats.malformed_lines, 2);
    }

    #[test]
    fn test_parse_with_chromosome_filter() {
        let contents = "\
rs548049170\t1\t69869\tTT
rs12345678\t2\t100000\tAG
rs98765432\t3\t200000\tCC
";
        let file = create_test_file(contents);
        let parser = Genome23Parser::with_chromosomes(vec!["chr1".to_string(), "3".to_string()]);

        let (genome, _) = parser.load(file.path()).unwrap();
        assert_eq!(genome.len(), 2);
        assert!(genome.get("rs12345678").is_none());
    }

    #[test]
    fn test_empty_file() {
        let contents = "\
# rsid\tchromosome\tposition\tgenotype
# Just comments, no data
rs1\t1\t100\t--
";
        let file = create_test_file(contents);
        let result = Genome23Parser::new().load(file.path());
        assert!(matches!(result, Err(Genome23ParseError::EmptyFile)));
    }

    #[test]
    fn test_whitespace_handling() {
        let contents = "  rs548049170  \t  1  \t  69869  \t  TT\n";
        let file = create_test_file(contents);

        let (genome, _) = Genome23Parser::new().load(file.path()).unwrap();
        let call = genome.get("rs548049170").unwrap();
        assert_eq!(call.position, 69869);
        assert_eq!(call.genotype.to_string(), "TT");
    }

    #[test]
    fn test_gzip_input() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"rs1\t1\t100\tAG\nrs2\tM\t200\tC\n").unwrap();
        let bytes = encoder.finish().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let (genome, _) = Genome23Parser::new().load(file.path()).unwrap();
        assert_eq!(genome.len(), 2);
        assert_eq!(genome.get("rs2").unwrap().chromosome, "MT");
    }
}
