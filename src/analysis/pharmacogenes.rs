// ==============================================================================
// pharmacogenes.rs - Pharmacogene Caller
// ==============================================================================
// Description: Star-allele diplotype resolution and metabolizer phenotypes
// Author: Matt Barham
// Created: 2025-12-10
// Modified: 2026-02-09
// Version: 1.1.0
// ==============================================================================
// Resolution:
//   1. Alleles with any ungenotyped defining variant are excluded (caveat).
//   2. Every unordered pair drawn from *1 plus the remaining alleles predicts
//      a copy count for each (variant, allele) it defines; a pair is
//      consistent when the prediction equals the observed count everywhere.
//   3. Several consistent pairs: lowest combined activity wins, then name,
//      and the call is flagged ambiguous. No consistent pair: fewest
//      unexplained copies wins, same tie-break, flagged ambiguous.
// ==============================================================================

use super::AnalysisError;
use crate::models::{AlleleFunction, GenomeModel, MetabolizerPhenotype};
use crate::parsers::star_alleles::PhenotypeOverride;
use crate::parsers::{StarAllele, StarAlleleGene, StarAlleleTable};
use crate::reference_data::DatabaseSlot;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

const CYP2D6: &str = "CYP2D6";
const CYP2D6_CNV_CAVEAT: &str = "CYP2D6 copy-number variation (whole-gene deletion *5 or duplication) \
     cannot be detected from SNP genotyping; the reported phenotype assumes two gene copies";
pub const UNDETERMINED: &str = "undetermined";

/// Default phenotype for a pair of allele functions, order-insensitive
pub fn default_phenotype(a: AlleleFunction, b: AlleleFunction) -> MetabolizerPhenotype {
    use AlleleFunction::*;
    let (low, high) = if a <= b { (a, b) } else { (b, a) };

    match (low, high) {
        (Increased, Increased) => MetabolizerPhenotype::Ultrarapid,
        (Normal, Increased) => MetabolizerPhenotype::Rapid,
        (Normal, Normal) => MetabolizerPhenotype::Normal,
        (Decreased, Increased) => MetabolizerPhenotype::Normal,
        (Decreased, Normal) => MetabolizerPhenotype::Intermediate,
        (Decreased, Decreased) => MetabolizerPhenotype::Intermediate,
        (NoFunction, Increased) => MetabolizerPhenotype::Intermediate,
        (NoFunction, Normal) => MetabolizerPhenotype::Intermediate,
        (NoFunction, Decreased) => MetabolizerPhenotype::Poor,
        (NoFunction, NoFunction) => MetabolizerPhenotype::Poor,
        _ => MetabolizerPhenotype::Indeterminate,
    }
}

/// Phenotype for a function pair, per-gene overrides first
pub fn phenotype_for(
    overrides: &[PhenotypeOverride],
    a: AlleleFunction,
    b: AlleleFunction,
) -> MetabolizerPhenotype {
    let mut wanted = [a, b];
    wanted.sort();

    overrides
        .iter()
        .find(|o| {
            let mut functions = o.functions;
            functions.sort();
            functions == wanted
        })
        .map(|o| o.phenotype)
        .unwrap_or_else(|| default_phenotype(a, b))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PharmacogeneCall {
    pub gene: String,
    /// "*1/*2", or "undetermined"
    pub diplotype: String,
    pub allele_functions: Option<[AlleleFunction; 2]>,
    pub activity_score: Option<f64>,
    pub phenotype: MetabolizerPhenotype,
    pub phenotype_label: String,
    pub variants_found: usize,
    pub variants_total: usize,
    pub observed: BTreeMap<String, String>,
    pub excluded_alleles: Vec<String>,
    pub ambiguous: bool,
    /// Other diplotypes equally consistent with the data
    pub alternatives: Vec<String>,
    pub caveats: Vec<String>,
}

impl PharmacogeneCall {
    pub fn is_determined(&self) -> bool {
        self.allele_functions.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PharmacogeneResult {
    pub calls: Vec<PharmacogeneCall>,
    /// Ambiguity notes, one per flagged gene
    pub notes: Vec<String>,
}

impl PharmacogeneResult {
    /// Determined gene -> phenotype key ("poor", "intermediate", ...)
    pub fn gene_phenotypes(&self) -> HashMap<String, String> {
        self.calls
            .iter()
            .filter(|call| call.is_determined())
            .map(|call| (call.gene.clone(), call.phenotype.key().to_string()))
            .collect()
    }
}

struct Candidate<'a> {
    first: &'a StarAllele,
    second: &'a StarAllele,
    unexplained: u32,
}

impl Candidate<'_> {
    fn activity(&self) -> f64 {
        self.first.function.activity() + self.second.function.activity()
    }

    fn name(&self) -> String {
        format!("{}/{}", self.first.name, self.second.name)
    }
}

/// Predicted copies of `base` at `variant` for the pair
fn predicted(first: &StarAllele, second: &StarAllele, variant: &str, base: char) -> u8 {
    [first, second]
        .iter()
        .filter(|allele| allele.defining_variants.get(variant) == Some(&base))
        .count() as u8
}

/// Resolve one gene's diplotype
///
/// # Arguments
/// * `genome` - Subject genotypes
/// * `gene` - Star allele definitions for the gene
///
/// # Returns
/// * `PharmacogeneCall` - Diplotype and phenotype; "undetermined" and
///   Indeterminate when no defining variant is genotyped
pub fn call_gene(genome: &GenomeModel, gene: &StarAlleleGene) -> PharmacogeneCall {
    let variant_ids = gene.defining_variant_ids();
    let mut caveats = Vec::new();
    if gene.gene.eq_ignore_ascii_case(CYP2D6) {
        caveats.push(CYP2D6_CNV_CAVEAT.to_string());
    }

    let observed: BTreeMap<String, String> = variant_ids
        .iter()
        .filter_map(|id| genome.genotype(id).map(|gt| (id.to_string(), gt.to_string())))
        .collect();

    let mut excluded = Vec::new();
    let mut usable = vec![&gene.reference];
    for allele in &gene.alleles {
        if allele.defining_variants.keys().all(|id| observed.contains_key(id)) {
            usable.push(allele);
        } else {
            excluded.push(allele.name.clone());
        }
    }
    if !excluded.is_empty() {
        caveats.push(format!(
            "Not genotyped, cannot be called: {}",
            excluded.join(", ")
        ));
    }

    if observed.is_empty() {
        warn!("{}: no defining variants genotyped", gene.gene);
        caveats.push("No defining variants genotyped; diplotype cannot be determined".to_string());
        return undetermined(gene, observed, excluded, caveats, variant_ids.len());
    }

    // Every (variant, base) defined by a callable allele
    let checks: BTreeSet<(&str, char)> = usable
        .iter()
        .flat_map(|allele| {
            allele
                .defining_variants
                .iter()
                .map(|(id, base)| (id.as_str(), *base))
        })
        .collect();
    let observed_counts: Vec<u8> = checks
        .iter()
        .map(|(id, base)| genome.genotype(id).map(|gt| gt.count_allele(*base)).unwrap_or(0))
        .collect();

    let mut candidates = Vec::new();
    for (i, first) in usable.iter().enumerate() {
        for second in &usable[i..] {
            let unexplained = checks
                .iter()
                .zip(&observed_counts)
                .map(|((id, base), seen)| u32::from(predicted(first, second, id, *base).abs_diff(*seen)))
                .sum();
            candidates.push(Candidate {
                first: *first,
                second: *second,
                unexplained,
            });
        }
    }

    let best_fit = candidates.iter().map(|c| c.unexplained).min().unwrap_or(0);
    let mut tied: Vec<&Candidate> = candidates.iter().filter(|c| c.unexplained == best_fit).collect();
    tied.sort_by(|a, b| {
        a.activity()
            .total_cmp(&b.activity())
            .then_with(|| a.name().cmp(&b.name()))
    });

    let Some(chosen) = tied.first() else {
        // usable always holds the reference allele, so a candidate exists
        return undetermined(gene, observed, excluded, caveats, variant_ids.len());
    };

    let ambiguous = best_fit > 0 || tied.len() > 1;
    let alternatives: Vec<String> = tied.iter().skip(1).map(|c| c.name()).collect();
    if best_fit > 0 {
        caveats.push(format!(
            "No diplotype explains every observed genotype ({} unexplained allele copies)",
            best_fit
        ));
    }

    let phenotype = phenotype_for(&gene.phenotype_overrides, chosen.first.function, chosen.second.function);
    let diplotype = chosen.name();
    debug!("{}: {} -> {}", gene.gene, diplotype, phenotype.label());

    PharmacogeneCall {
        gene: gene.gene.clone(),
        diplotype,
        allele_functions: Some([chosen.first.function, chosen.second.function]),
        activity_score: Some(chosen.activity()),
        phenotype,
        phenotype_label: phenotype.label().to_string(),
        variants_found: observed.len(),
        variants_total: variant_ids.len(),
        observed,
        excluded_alleles: excluded,
        ambiguous,
        alternatives,
        caveats,
    }
}

fn undetermined(
    gene: &StarAlleleGene,
    observed: BTreeMap<String, String>,
    excluded: Vec<String>,
    caveats: Vec<String>,
    variants_total: usize,
) -> PharmacogeneCall {
    PharmacogeneCall {
        gene: gene.gene.clone(),
        diplotype: UNDETERMINED.to_string(),
        allele_functions: None,
        activity_score: None,
        phenotype: MetabolizerPhenotype::Indeterminate,
        phenotype_label: MetabolizerPhenotype::Indeterminate.label().to_string(),
        variants_found: observed.len(),
        variants_total,
        observed,
        excluded_alleles: excluded,
        ambiguous: false,
        alternatives: Vec::new(),
        caveats,
    }
}

/// Call every gene in the table
pub fn call_all(genome: &GenomeModel, table: &StarAlleleTable) -> PharmacogeneResult {
    info!("Calling {} pharmacogenes", table.genes.len());

    let calls: Vec<PharmacogeneCall> = table.genes.iter().map(|gene| call_gene(genome, gene)).collect();
    let notes: Vec<String> = calls
        .iter()
        .filter(|call| call.ambiguous)
        .map(|call| {
            let details = if call.alternatives.is_empty() {
                format!("{} reported; observations only partly explained", call.diplotype)
            } else {
                format!(
                    "{} reported over {} (greatest functional impairment)",
                    call.diplotype,
                    call.alternatives.join(", ")
                )
            };
            AnalysisError::AmbiguousResolution {
                subject: call.gene.clone(),
                details,
            }
            .to_string()
        })
        .collect();

    for note in &notes {
        warn!("{}", note);
    }
    info!(
        "Pharmacogenes: {} determined, {} ambiguous",
        calls.iter().filter(|c| c.is_determined()).count(),
        notes.len()
    );

    PharmacogeneResult { calls, notes }
}

pub fn run(genome: &GenomeModel, table: &DatabaseSlot<StarAlleleTable>) -> Result<PharmacogeneResult, AnalysisError> {
    let loaded = table.require("star_alleles")?;
    Ok(call_all(genome, &loaded.data))
}
