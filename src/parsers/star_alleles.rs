// ==============================================================================
// star_alleles.rs - Pharmacogene Star Allele Definitions
// ==============================================================================
// Description: Loads star allele definitions and per-gene phenotype overrides
// Author: Matt Barham
// Created: 2025-12-10
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// Format (JSON):
//   { "genes": [ { "gene": "CYP2C19",
//                  "alleles": [ { "name": "*2", "function": "no_function",
//                                 "defining_variants": { "rs4244285": "A" } } ],
//                  "phenotype_overrides": [ { "functions": ["normal", "increased"],
//                                             "phenotype": "rapid" } ] } ] }
// ==============================================================================

use super::aims::single_nucleotide;
use super::{Parsed, ReferenceParseError};
use crate::models::{AlleleFunction, MetabolizerPhenotype};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Name of the reference allele present when no defining variant is observed
pub const REFERENCE_ALLELE: &str = "*1";

// Elements are typed one at a time; a bad one is counted and dropped
#[derive(Debug, Deserialize)]
struct RawTable {
    genes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawGene {
    gene: String,
    alleles: Vec<Value>,
    #[serde(default)]
    phenotype_overrides: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAllele {
    name: String,
    function: AlleleFunction,
    #[serde(default)]
    defining_variants: BTreeMap<String, String>,
}

/// Per-gene replacement for a default function-pair phenotype
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhenotypeOverride {
    pub functions: [AlleleFunction; 2],
    pub phenotype: MetabolizerPhenotype,
}

/// A named star allele
#[derive(Debug, Clone, PartialEq)]
pub struct StarAllele {
    pub name: String,
    pub function: AlleleFunction,
    /// variant id -> allele carried by this star allele
    pub defining_variants: BTreeMap<String, char>,
}

/// All definitions for one pharmacogene
#[derive(Debug, Clone, PartialEq)]
pub struct StarAlleleGene {
    pub gene: String,
    /// The reference allele (no defining variants)
    pub reference: StarAllele,
    /// Non-reference alleles in file order
    pub alleles: Vec<StarAllele>,
    pub phenotype_overrides: Vec<PhenotypeOverride>,
}

impl StarAlleleGene {
    /// Distinct defining variant ids across all alleles, sorted
    pub fn defining_variant_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .alleles
            .iter()
            .flat_map(|allele| allele.defining_variants.keys().map(String::as_str))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, Default)]
pub struct StarAlleleTable {
    pub genes: Vec<StarAlleleGene>,
}

impl StarAlleleTable {
    /// Parse star allele definitions
    ///
    /// An allele is malformed (skipped, counted) when it does not parse
    /// (e.g. an unknown function), has no defining variants, has a defining
    /// allele that is not a single nucleotide, or reuses a name in the gene.
    /// Unparseable gene entries and phenotype overrides are counted the same way. Genes without a `*1` entry get an
    /// implicit normal-function reference allele.
    pub fn parse(path: impl AsRef<Path>) -> Result<Parsed<Self>, ReferenceParseError> {
        let file = File::open(path.as_ref())?;
        let raw: RawTable = serde_json::from_reader(BufReader::new(file))?;

        let mut genes = Vec::new();
        let mut skipped_rows = 0;

        for raw_gene in raw.genes {
            let raw_gene: RawGene = match serde_json::from_value(raw_gene) {
                Ok(gene) => gene,
                Err(e) => {
                    debug!("Malformed star allele gene entry: {}", e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let mut reference = StarAllele {
                name: REFERENCE_ALLELE.to_string(),
                function: AlleleFunction::Normal,
                defining_variants: BTreeMap::new(),
            };
            let mut alleles = Vec::new();
            let mut names = HashSet::new();

            for raw_allele in raw_gene.alleles {
                let raw_allele: RawAllele = match serde_json::from_value(raw_allele) {
                    Ok(allele) => allele,
                    Err(e) => {
                        debug!("{}: malformed star allele: {}", raw_gene.gene, e);
                        skipped_rows += 1;
                        continue;
                    }
                };

                if raw_allele.name == REFERENCE_ALLELE {
                    reference.function = raw_allele.function;
                    continue;
                }

                let defining: Option<BTreeMap<String, char>> = raw_allele
                    .defining_variants
                    .iter()
                    .map(|(rsid, allele)| single_nucleotide(allele).map(|a| (rsid.clone(), a)))
                    .collect();

                match defining {
                    Some(defining_variants)
                        if !defining_variants.is_empty() && names.insert(raw_allele.name.clone()) =>
                    {
                        alleles.push(StarAllele {
                            name: raw_allele.name,
                            function: raw_allele.function,
                            defining_variants,
                        });
                    }
                    _ => {
                        debug!("{} {}: malformed star allele definition", raw_gene.gene, raw_allele.name);
                        skipped_rows += 1;
                    }
                }
            }

            let mut phenotype_overrides = Vec::new();
            for raw_override in raw_gene.phenotype_overrides {
                match serde_json::from_value::<PhenotypeOverride>(raw_override) {
                    Ok(entry) => phenotype_overrides.push(entry),
                    Err(e) => {
                        debug!("{}: malformed phenotype override: {}", raw_gene.gene, e);
                        skipped_rows += 1;
                    }
                }
            }

            genes.push(StarAlleleGene {
                gene: raw_gene.gene,
                reference,
                alleles,
                phenotype_overrides,
            });
        }

        if genes.is_empty() {
            return Err(ReferenceParseError::Empty);
        }

        info!(
            "Loaded star allele definitions for {} genes ({} malformed alleles skipped)",
            genes.len(),
            skipped_rows
        );

        Ok(Parsed {
            data: StarAlleleTable { genes },
            skipped_rows,
        })
    }
}
