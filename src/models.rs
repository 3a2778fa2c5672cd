// ==============================================================================
// models.rs - Genome Model and Shared Domain Types
// ==============================================================================
// Description: Canonical in-memory genotype representation plus the enums
//              shared by the classifiers (significance, zygosity, confidence)
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-02-09
// Version: 3.0.0
// ==============================================================================

use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Marker used by genotyping arrays for a failed call
pub const NO_CALL: &str = "--";

const VALID_BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Errors raised while building genome model values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenotypeError {
    #[error("Invalid genotype '{0}' (expected two of A/C/G/T or '--')")]
    InvalidGenotype(String),

    #[error("Genome index refers to '{0}' but no call is stored under that id")]
    DanglingIndex(String),
}

/// Two observed alleles, or a no-call.
///
/// The inner representation is private so a called genotype always holds
/// exactly two valid nucleotides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Genotype(Option<[u8; 2]>);

impl Genotype {
    /// Parse a raw two-letter genotype ("AG"), or "--"/"" as no-call
    pub fn parse(raw: &str) -> Result<Self, GenotypeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == NO_CALL {
            return Ok(Self::no_call());
        }

        let bytes = trimmed.as_bytes();
        if bytes.len() != 2 {
            return Err(GenotypeError::InvalidGenotype(raw.to_string()));
        }

        let first = bytes[0].to_ascii_uppercase();
        let second = bytes[1].to_ascii_uppercase();
        if !VALID_BASES.contains(&first) || !VALID_BASES.contains(&second) {
            return Err(GenotypeError::InvalidGenotype(raw.to_string()));
        }

        Ok(Self(Some([first, second])))
    }

    /// Homozygous pair from a single base (haploid MT / hemizygous calls)
    pub fn homozygous(base: char) -> Result<Self, GenotypeError> {
        let mut buf = [0u8; 4];
        let encoded = base.encode_utf8(&mut buf);
        Self::parse(&format!("{}{}", encoded, encoded))
    }

    pub fn no_call() -> Self {
        Self(None)
    }

    pub fn is_no_call(&self) -> bool {
        self.0.is_none()
    }

    /// Both alleles as characters, `None` for a no-call
    pub fn alleles(&self) -> Option<(char, char)> {
        self.0.map(|[a, b]| (a as char, b as char))
    }

    /// Copies (0, 1 or 2) of `allele` in this genotype
    pub fn count_allele(&self, allele: char) -> u8 {
        let target = allele.to_ascii_uppercase();
        match self.alleles() {
            Some((a, b)) => (a == target) as u8 + (b == target) as u8,
            None => 0,
        }
    }

    pub fn is_heterozygous(&self) -> bool {
        matches!(self.alleles(), Some((a, b)) if a != b)
    }

    /// Order-insensitive key ("GA" and "AG" both give "AG")
    pub fn sorted_key(&self) -> Option<String> {
        self.alleles().map(|(a, b)| {
            if a <= b {
                format!("{}{}", a, b)
            } else {
                format!("{}{}", b, a)
            }
        })
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.alleles() {
            Some((a, b)) => write!(f, "{}{}", a, b),
            None => f.write_str(NO_CALL),
        }
    }
}

impl Serialize for Genotype {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One genotyped position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenotypeCall {
    /// rsID or vendor identifier (e.g., "rs4244285", "i5000123")
    pub variant_id: Option<String>,
    /// Chromosome ("1"-"22", "X", "Y", "MT")
    pub chromosome: String,
    /// Base pair position (GRCh37/hg19)
    pub position: u64,
    pub genotype: Genotype,
}

impl GenotypeCall {
    /// Key under which the call is stored in the genome model
    pub fn key(&self) -> String {
        self.variant_id
            .clone()
            .unwrap_or_else(|| format!("chr{}:{}", self.chromosome, self.position))
    }
}

/// Normalize chromosome labels ("chr1" -> "1", "chrM"/"M" -> "MT")
pub fn normalize_chromosome(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("chr")
        .or_else(|| trimmed.strip_prefix("CHR"))
        .or_else(|| trimmed.strip_prefix("Chr"))
        .unwrap_or(trimmed);
    let upper = stripped.to_ascii_uppercase();
    if upper == "M" {
        "MT".to_string()
    } else {
        upper
    }
}

/// A subject's genotypes indexed by variant id and by chromosome/position.
///
/// Built once by a loader and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct GenomeModel {
    calls: HashMap<String, GenotypeCall>,
    by_position: HashMap<(String, u64), String>,
}

impl GenomeModel {
    /// Build a model from loader output. Later calls with a duplicate key
    /// are ignored; the number of dropped duplicates is returned.
    pub fn from_calls(calls: impl IntoIterator<Item = GenotypeCall>) -> (Self, usize) {
        let mut model = GenomeModel::default();
        let mut duplicates = 0;

        for mut call in calls {
            call.chromosome = normalize_chromosome(&call.chromosome);
            let key = call.key();
            if model.calls.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            model
                .by_position
                .entry((call.chromosome.clone(), call.position))
                .or_insert_with(|| key.clone());
            model.calls.insert(key, call);
        }

        (model, duplicates)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Call stored under a variant id. A missing id is "no information".
    pub fn get(&self, variant_id: &str) -> Option<&GenotypeCall> {
        self.calls.get(variant_id)
    }

    /// Called (non no-call) genotype for a variant id
    pub fn genotype(&self, variant_id: &str) -> Option<Genotype> {
        self.get(variant_id)
            .map(|call| call.genotype)
            .filter(|gt| !gt.is_no_call())
    }

    /// Call at a chromosome/position through the secondary index
    pub fn call_at(&self, chromosome: &str, position: u64) -> Result<Option<&GenotypeCall>, GenotypeError> {
        let chromosome = normalize_chromosome(chromosome);
        match self.by_position.get(&(chromosome, position)) {
            None => Ok(None),
            Some(key) => self
                .calls
                .get(key)
                .map(Some)
                .ok_or_else(|| GenotypeError::DanglingIndex(key.clone())),
        }
    }

    pub fn calls(&self) -> impl Iterator<Item = &GenotypeCall> {
        self.calls.values()
    }
}

/// Confidence tier attached to estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Moderate,
    High,
}

impl Confidence {
    /// Band a marker count: `>= high` is high, `>= moderate` is moderate
    pub fn from_count(found: usize, high: usize, moderate: usize) -> Self {
        if found >= high {
            Confidence::High
        } else if found >= moderate {
            Confidence::Moderate
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Moderate => "moderate",
            Confidence::Low => "low",
        }
    }
}

/// Clinical significance as curated in the variant registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalSignificance {
    Pathogenic,
    LikelyPathogenic,
    Benign,
    LikelyBenign,
    RiskFactor,
    DrugResponse,
    Protective,
    Uncertain,
    Conflicting,
}

impl ClinicalSignificance {
    /// Parse free-text significance ("Pathogenic/Likely_pathogenic", "risk factor").
    ///
    /// Keyword precedence: conflicting > pathogenic family > benign family >
    /// risk factor > drug response > protective > uncertain.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.to_lowercase().replace('_', " ");
        if text.trim().is_empty() {
            return None;
        }

        if text.contains("conflict") {
            Some(ClinicalSignificance::Conflicting)
        } else if text.contains("likely pathogenic") {
            Some(ClinicalSignificance::LikelyPathogenic)
        } else if text.contains("pathogenic") {
            Some(ClinicalSignificance::Pathogenic)
        } else if text.contains("likely benign") {
            Some(ClinicalSignificance::LikelyBenign)
        } else if text.contains("benign") {
            Some(ClinicalSignificance::Benign)
        } else if text.contains("risk factor") {
            Some(ClinicalSignificance::RiskFactor)
        } else if text.contains("drug response") {
            Some(ClinicalSignificance::DrugResponse)
        } else if text.contains("protective") {
            Some(ClinicalSignificance::Protective)
        } else if text.contains("uncertain") || text.contains("not provided") || text.contains("other") {
            Some(ClinicalSignificance::Uncertain)
        } else {
            None
        }
    }

    pub fn is_pathogenic(&self) -> bool {
        matches!(
            self,
            ClinicalSignificance::Pathogenic | ClinicalSignificance::LikelyPathogenic
        )
    }
}

/// Mode of inheritance recorded for a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritancePattern {
    Dominant,
    Recessive,
    #[default]
    Unknown,
}

impl InheritancePattern {
    /// "Autosomal dominant" -> Dominant; both or neither keyword -> Unknown
    pub fn parse(raw: &str) -> Self {
        let text = raw.to_lowercase();
        match (text.contains("dominant"), text.contains("recessive")) {
            (true, false) => InheritancePattern::Dominant,
            (false, true) => InheritancePattern::Recessive,
            _ => InheritancePattern::Unknown,
        }
    }
}

/// Copies of the alternate allele observed at a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zygosity {
    HomozygousReference,
    Heterozygous,
    HomozygousAlternate,
}

/// The five 1000 Genomes superpopulations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Superpopulation {
    EUR,
    AFR,
    EAS,
    SAS,
    AMR,
}

impl Superpopulation {
    pub const ALL: [Superpopulation; 5] = [
        Superpopulation::EUR,
        Superpopulation::AFR,
        Superpopulation::EAS,
        Superpopulation::SAS,
        Superpopulation::AMR,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Superpopulation::EUR => "EUR",
            Superpopulation::AFR => "AFR",
            Superpopulation::EAS => "EAS",
            Superpopulation::SAS => "SAS",
            Superpopulation::AMR => "AMR",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Superpopulation::EUR => "European",
            Superpopulation::AFR => "African",
            Superpopulation::EAS => "East Asian",
            Superpopulation::SAS => "South Asian",
            Superpopulation::AMR => "Admixed American",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pop| pop.code().eq_ignore_ascii_case(code.trim()))
    }
}

/// Functional status of a pharmacogene star allele
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlleleFunction {
    NoFunction,
    Decreased,
    Normal,
    Increased,
}

impl AlleleFunction {
    /// Activity value used to rank diplotypes by impairment
    pub fn activity(&self) -> f64 {
        match self {
            AlleleFunction::NoFunction => 0.0,
            AlleleFunction::Decreased => 0.5,
            AlleleFunction::Normal => 1.0,
            AlleleFunction::Increased => 1.5,
        }
    }
}

/// Metabolizer phenotype derived from a diplotype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetabolizerPhenotype {
    Poor,
    Intermediate,
    Normal,
    Rapid,
    Ultrarapid,
    Indeterminate,
}

impl MetabolizerPhenotype {
    /// Short status key ("poor") used by interaction rules
    pub fn key(&self) -> &'static str {
        match self {
            MetabolizerPhenotype::Poor => "poor",
            MetabolizerPhenotype::Intermediate => "intermediate",
            MetabolizerPhenotype::Normal => "normal",
            MetabolizerPhenotype::Rapid => "rapid",
            MetabolizerPhenotype::Ultrarapid => "ultrarapid",
            MetabolizerPhenotype::Indeterminate => "indeterminate",
        }
    }

    /// Display label ("Intermediate Metabolizer")
    pub fn label(&self) -> &'static str {
        match self {
            MetabolizerPhenotype::Poor => "Poor Metabolizer",
            MetabolizerPhenotype::Intermediate => "Intermediate Metabolizer",
            MetabolizerPhenotype::Normal => "Normal Metabolizer",
            MetabolizerPhenotype::Rapid => "Rapid Metabolizer",
            MetabolizerPhenotype::Ultrarapid => "Ultrarapid Metabolizer",
            MetabolizerPhenotype::Indeterminate => "Indeterminate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, chrom: &str, pos: u64, gt: &str) -> GenotypeCall {
        GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: chrom.to_string(),
            position: pos,
            genotype: Genotype::parse(gt).unwrap(),
        }
    }

    #[test]
    fn test_genotype_parse() {
        let gt = Genotype::parse("ag").unwrap();
        assert_eq!(gt.to_string(), "AG");
        assert!(gt.is_heterozygous());
        assert_eq!(gt.count_allele('G'), 1);

        assert!(Genotype::parse("--").unwrap().is_no_call());
        assert!(Genotype::parse("").unwrap().is_no_call());

        assert!(Genotype::parse("A").is_err());
        assert!(Genotype::parse("DI").is_err());
        assert!(Genotype::parse("AGT").is_err());
    }

    #[test]
    fn test_sorted_key_is_order_insensitive() {
        let ag = Genotype::parse("AG").unwrap();
        let ga = Genotype::parse("GA").unwrap();
        assert_eq!(ag.sorted_key(), ga.sorted_key());
        assert_eq!(Genotype::no_call().sorted_key(), None);
    }

    #[test]
    fn test_homozygous_from_single_base() {
        assert_eq!(Genotype::homozygous('G').unwrap().to_string(), "GG");
        assert!(Genotype::homozygous('D').is_err());
    }

    #[test]
    fn test_genome_model_indexes() {
        let (genome, duplicates) = GenomeModel::from_calls(vec![
            call("rs1", "chr1", 100, "AA"),
            call("rs2", "MT", 200, "GG"),
            call("rs1", "1", 999, "CC"),
        ]);

        assert_eq!(duplicates, 1);
        assert_eq!(genome.len(), 2);
        assert_eq!(genome.get("rs1").unwrap().chromosome, "1");
        assert_eq!(genome.call_at("1", 100).unwrap().unwrap().position, 100);
        assert!(genome.call_at("chrM", 200).unwrap().is_some());
        assert!(genome.call_at("1", 999).unwrap().is_none());
        assert!(genome.get("rs404").is_none());
    }

    #[test]
    fn test_call_without_id_uses_position_key() {
        let (genome, _) = GenomeModel::from_calls(vec![GenotypeCall {
            variant_id: None,
            chromosome: "2".to_string(),
            position: 5,
            genotype: Genotype::parse("CT").unwrap(),
        }]);
        assert!(genome.get("chr2:5").is_some());
    }

    #[test]
    fn test_significance_parsing() {
        use ClinicalSignificance::*;
        assert_eq!(ClinicalSignificance::parse("Pathogenic"), Some(Pathogenic));
        assert_eq!(ClinicalSignificance::parse("Likely_pathogenic"), Some(LikelyPathogenic));
        assert_eq!(ClinicalSignificance::parse("Pathogenic/Likely pathogenic"), Some(LikelyPathogenic));
        assert_eq!(
            ClinicalSignificance::parse("Conflicting interpretations of pathogenicity"),
            Some(Conflicting)
        );
        assert_eq!(ClinicalSignificance::parse("Benign/Likely benign"), Some(LikelyBenign));
        assert_eq!(ClinicalSignificance::parse("risk factor"), Some(RiskFactor));
        assert_eq!(ClinicalSignificance::parse("drug_response"), Some(DrugResponse));
        assert_eq!(ClinicalSignificance::parse(""), None);
    }

    #[test]
    fn test_inheritance_parsing() {
        assert_eq!(InheritancePattern::parse("Autosomal dominant"), InheritancePattern::Dominant);
        assert_eq!(InheritancePattern::parse("X-linked recessive"), InheritancePattern::Recessive);
        assert_eq!(
            InheritancePattern::parse("Autosomal dominant;Autosomal recessive"),
            InheritancePattern::Unknown
        );
        assert_eq!(InheritancePattern::parse("germline"), InheritancePattern::Unknown);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_count(40, 40, 20), Confidence::High);
        assert_eq!(Confidence::from_count(39, 40, 20), Confidence::Moderate);
        assert_eq!(Confidence::from_count(19, 40, 20), Confidence::Low);
        assert_eq!(Confidence::from_count(0, 40, 20), Confidence::Low);
    }
}
