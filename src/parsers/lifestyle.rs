// ==============================================================================
// lifestyle.rs - Curated Lifestyle Variant Table Parser
// ==============================================================================
// Description: Parses the long-form lifestyle/health interpretation table
// Author: Matt Barham
// Created: 2025-12-02
// Modified: 2026-02-09
// Version: 1.1.0
// ==============================================================================
// Format: one row per (rsid, genotype)
//   rsid  gene  category  genotype  status  magnitude  description  note  population_frequency
//   rs762551  CYP1A2  Drug Metabolism  CC  slow  3  Slow caffeine metabolizer ...
// population_frequency is "EUR=0.15;AFR=0.18;..." or empty
// ==============================================================================

use super::{column, field, tsv_reader, Parsed, ReferenceParseError};
use crate::models::Superpopulation;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Highest impact magnitude a curated interpretation may carry
pub const MAX_MAGNITUDE: u8 = 6;

/// Interpretation of one genotype at a curated variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenotypeInterpretation {
    pub status: String,
    pub description: String,
    pub magnitude: u8,
}

/// One curated lifestyle/health variant
#[derive(Debug, Clone, PartialEq)]
pub struct LifestyleEntry {
    /// Table key; may carry a context suffix ("rs4680_pain")
    pub key: String,
    /// Genome variant id the entry is looked up under ("rs4680")
    pub variant_id: String,
    pub gene: String,
    pub category: String,
    pub genotypes: HashMap<String, GenotypeInterpretation>,
    pub note: Option<String>,
    pub population_frequency: Option<BTreeMap<String, f64>>,
}

/// Curated entries in file order
#[derive(Debug, Clone, Default)]
pub struct LifestyleTable {
    pub entries: Vec<LifestyleEntry>,
}

impl LifestyleTable {
    /// Parse the lifestyle TSV
    ///
    /// # Arguments
    /// * `path` - Path to lifestyle_snps.tsv
    ///
    /// # Returns
    /// * `Ok(Parsed<LifestyleTable>)` - Entries grouped by key, plus malformed row count
    /// * `Err(ReferenceParseError)` - File unreadable or required column missing
    pub fn parse(path: impl AsRef<Path>) -> Result<Parsed<Self>, ReferenceParseError> {
        let mut reader = tsv_reader(path.as_ref())?;
        let headers = reader.headers()?.clone();

        let rsid_col = column(&headers, "rsid")?;
        let gene_col = column(&headers, "gene")?;
        let category_col = column(&headers, "category")?;
        let genotype_col = column(&headers, "genotype")?;
        let status_col = column(&headers, "status")?;
        let magnitude_col = column(&headers, "magnitude")?;
        let description_col = column(&headers, "description")?;
        let note_col = column(&headers, "note").ok();
        let freq_col = column(&headers, "population_frequency").ok();

        let mut entries: Vec<LifestyleEntry> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut skipped_rows = 0;

        for (row, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("Lifestyle row {}: {}", row + 2, e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let key = field(&record, Some(rsid_col));
            let genotype = field(&record, Some(genotype_col)).to_ascii_uppercase();
            let magnitude = field(&record, Some(magnitude_col)).parse::<u8>().ok();

            let magnitude = match magnitude {
                Some(m) if m <= MAX_MAGNITUDE && !key.is_empty() && genotype.len() == 2 => m,
                _ => {
                    debug!("Lifestyle row {}: malformed key/genotype/magnitude", row + 2);
                    skipped_rows += 1;
                    continue;
                }
            };

            let population_frequency = match parse_frequencies(field(&record, freq_col)) {
                Ok(freq) => freq,
                Err(()) => {
                    debug!("Lifestyle row {}: unparseable population frequency", row + 2);
                    skipped_rows += 1;
                    continue;
                }
            };

            let position = *index.entry(key.to_string()).or_insert_with(|| {
                let note = field(&record, note_col);
                entries.push(LifestyleEntry {
                    key: key.to_string(),
                    variant_id: key.split('_').next().unwrap_or(key).to_string(),
                    gene: field(&record, Some(gene_col)).to_string(),
                    category: field(&record, Some(category_col)).to_string(),
                    genotypes: HashMap::new(),
                    note: (!note.is_empty()).then(|| note.to_string()),
                    population_frequency: None,
                });
                entries.len() - 1
            });

            let entry = &mut entries[position];
            if entry.population_frequency.is_none() {
                entry.population_frequency = population_frequency;
            }
            entry.genotypes.insert(
                genotype,
                GenotypeInterpretation {
                    status: field(&record, Some(status_col)).to_string(),
                    description: field(&record, Some(description_col)).to_string(),
                    magnitude,
                },
            );
        }

        if entries.is_empty() {
            return Err(ReferenceParseError::Empty);
        }

        info!(
            "Loaded {} lifestyle entries ({} malformed rows skipped)",
            entries.len(),
            skipped_rows
        );

        Ok(Parsed {
            data: LifestyleTable { entries },
            skipped_rows,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse "EUR=0.15;AFR=0.18" into a map; empty input is `None`
fn parse_frequencies(raw: &str) -> Result<Option<BTreeMap<String, f64>>, ()> {
    if raw.is_empty() {
        return Ok(None);
    }

    let mut frequencies = BTreeMap::new();
    for part in raw.split(';').filter(|p| !p.trim().is_empty()) {
        let (population, value) = part.split_once('=').ok_or(())?;
        let population = Superpopulation::from_code(population).ok_or(())?;
        let value: f64 = value.trim().parse().map_err(|_| ())?;
        if !(0.0..=1.0).contains(&value) {
            return Err(());
        }
        frequencies.insert(population.code().to_string(), value);
    }

    Ok(Some(frequencies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "rsid\tgene\tcategory\tgenotype\tstatus\tmagnitude\tdescription\tnote\tpopulation_frequency\n";

    fn create_test_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_groups_rows_by_key() {
        let contents = format!(
            "{}{}{}{}",
            HEADER,
            "rs4680\tCOMT\tNeurotransmitters\tGG\tfast\t2\tFast COMT\t\t\n",
            "rs4680\tCOMT\tNeurotransmitters\tAA\tslow\t3\tSlow COMT\tnote here\tEUR=0.5;AFR=0.3\n",
            "rs4680_pain\tCOMT\tPain\tAA\thigh_sensitivity\t2\tPain sensitive\t\t\n",
        );
        let file = create_test_file(&contents);

        let parsed = LifestyleTable::parse(file.path()).unwrap();
        let table = parsed.data;

        assert_eq!(parsed.skipped_rows, 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries[0].genotypes.len(), 2);
        assert_eq!(table.entries[0].genotypes["AA"].magnitude, 3);
        assert_eq!(
            table.entries[0].population_frequency.as_ref().unwrap()["EUR"],
            0.5
        );
        assert_eq!(table.entries[1].key, "rs4680_pain");
        assert_eq!(table.entries[1].variant_id, "rs4680");
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let contents = format!(
            "{}{}{}{}",
            HEADER,
            "rs1\tG\tC\tAA\tok\t9\tmagnitude too high\t\t\n",
            "rs2\tG\tC\tAA\tok\tx\tbad magnitude\t\t\n",
            "rs3\tG\tC\tAA\tok\t1\tgood\t\tEUR=abc\n",
        );
        let file = create_test_file(&contents);
        let result = LifestyleTable::parse(file.path());
        assert!(matches!(result, Err(ReferenceParseError::Empty)));

        let contents = format!("{}{}", contents, "rs4\tG\tC\tAG\tok\t1\tgood\t\t\n");
        let file = create_test_file(&contents);
        let parsed = LifestyleTable::parse(file.path()).unwrap();
        assert_eq!(parsed.skipped_rows, 3);
        assert_eq!(parsed.data.len(), 1);
    }

    #[test]
    fn test_frequency_population_codes() {
        let freq = parse_frequencies("eur=0.15; AFR=0.18").unwrap().unwrap();
        assert_eq!(freq["EUR"], 0.15);
        assert_eq!(freq["AFR"], 0.18);

        assert!(parse_frequencies("OCE=0.2").is_err());
        assert!(parse_frequencies("EUR=1.5").is_err());
        assert_eq!(parse_frequencies("").unwrap(), None);
    }

    #[test]
    fn test_missing_column() {
        let file = create_test_file("rsid\tgene\nrs1\tX\n");
        let result = LifestyleTable::parse(file.path());
        assert!(matches!(result, Err(ReferenceParseError::MissingColumn(_))));
    }
}
