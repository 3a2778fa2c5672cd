// ==============================================================================
// traits.rs - Visible and Sensory Trait Predictions
// ==============================================================================
// Description: One-to-three-variant lookups for well-replicated trait SNPs
// Author: Matt Barham
// Created: 2025-12-15
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================

use super::AnalysisError;
use crate::models::{Confidence, GenomeModel, Genotype};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub const UNDETERMINED: &str = "undetermined";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitPrediction {
    pub prediction: String,
    pub confidence: Confidence,
    pub description: String,
    pub variants_used: Vec<String>,
}

impl TraitPrediction {
    pub fn is_determined(&self) -> bool {
        self.prediction != UNDETERMINED
    }

    fn new(prediction: &str, confidence: Confidence, description: &str, variants_used: Vec<String>) -> Self {
        Self {
            prediction: prediction.to_string(),
            confidence,
            description: description.to_string(),
            variants_used,
        }
    }

    fn undetermined(description: &str, variants_used: Vec<String>) -> Self {
        Self::new(UNDETERMINED, Confidence::Low, description, variants_used)
    }
}

/// Trait name -> prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitsResult {
    pub traits: BTreeMap<String, TraitPrediction>,
    pub determined: usize,
}

/// A variant the caller reads, with its display label
struct Marker {
    variant_id: &'static str,
    label: &'static str,
}

fn observe(genome: &GenomeModel, markers: &[Marker], used: &mut Vec<String>) -> Vec<Option<Genotype>> {
    markers
        .iter()
        .map(|marker| {
            let genotype = genome.genotype(marker.variant_id);
            if let Some(gt) = genotype {
                used.push(format!("{} ({}): {}", marker.variant_id, marker.label, gt));
            }
            genotype
        })
        .collect()
}

/// Outcome for 2, 1 and 0 copies of the counted allele
type Outcomes = [(&'static str, Confidence, &'static str); 3];

struct SingleVariantTrait {
    name: &'static str,
    marker: Marker,
    allele: char,
    outcomes: Outcomes,
}

const SINGLE_VARIANT_TRAITS: [SingleVariantTrait; 5] = [
    SingleVariantTrait {
        name: "earwax_type",
        marker: Marker { variant_id: "rs17822931", label: "ABCC11" },
        allele: 'T',
        outcomes: [
            ("Dry earwax", Confidence::High, "TT genotype: dry, flaky earwax, common in East Asian populations."),
            ("Wet earwax", Confidence::High, "CT genotype: wet earwax (C is dominant), one dry allele carried."),
            ("Wet earwax", Confidence::High, "CC genotype: wet earwax, most common in European and African populations."),
        ],
    },
    SingleVariantTrait {
        name: "lactose_tolerance",
        marker: Marker { variant_id: "rs4988235", label: "MCM6/LCT" },
        allele: 'A',
        outcomes: [
            ("Lactose tolerant", Confidence::High, "AA genotype: lactase production persists into adulthood."),
            ("Likely lactose tolerant", Confidence::Moderate, "AG genotype: one lactase persistence allele."),
            ("Likely lactose intolerant", Confidence::High, "GG genotype: lactase production typically declines after childhood."),
        ],
    },
    SingleVariantTrait {
        name: "cilantro_taste",
        marker: Marker { variant_id: "rs72921001", label: "OR6A2" },
        allele: 'C',
        outcomes: [
            ("Likely perceives cilantro as soapy", Confidence::Moderate, "CC genotype: associated with detecting soapy-tasting aldehydes."),
            ("Possible mild cilantro aversion", Confidence::Low, "CT genotype: one copy of the aversion allele."),
            ("Normal cilantro taste", Confidence::Moderate, "TT genotype: no OR6A2 aversion allele."),
        ],
    },
    SingleVariantTrait {
        name: "asparagus_smell",
        marker: Marker { variant_id: "rs4481887", label: "near OR2M7" },
        allele: 'G',
        outcomes: [
            ("Likely can smell asparagus metabolites", Confidence::Moderate, "GG genotype: associated with detecting asparagus metabolites."),
            ("May partially detect asparagus smell", Confidence::Low, "GA genotype: intermediate detection ability."),
            ("Likely cannot smell asparagus metabolites", Confidence::Moderate, "AA genotype: associated with asparagus anosmia."),
        ],
    },
    SingleVariantTrait {
        name: "muscle_fiber_type",
        marker: Marker { variant_id: "rs1815739", label: "ACTN3 R577X" },
        allele: 'T',
        outcomes: [
            ("Endurance oriented (XX)", Confidence::High, "TT (XX) genotype: no alpha-actinin-3 in fast-twitch fibers."),
            ("Mixed power/endurance (RX)", Confidence::Moderate, "CT (RX) genotype: intermediate fast-twitch composition."),
            ("Power/sprint oriented (RR)", Confidence::High, "CC (RR) genotype: full alpha-actinin-3 expression in fast-twitch fibers."),
        ],
    },
];

fn predict_single(genome: &GenomeModel, entry: &SingleVariantTrait) -> TraitPrediction {
    let mut used = Vec::new();
    let observed = observe(genome, std::slice::from_ref(&entry.marker), &mut used);

    match observed.first().copied().flatten() {
        Some(gt) => {
            let (prediction, confidence, description) = match gt.count_allele(entry.allele) {
                2 => entry.outcomes[0],
                1 => entry.outcomes[1],
                _ => entry.outcomes[2],
            };
            TraitPrediction::new(prediction, confidence, description, used)
        }
        None => TraitPrediction::undetermined(&format!("{} not genotyped.", entry.marker.variant_id), used),
    }
}

const HERC2: Marker = Marker { variant_id: "rs12913832", label: "HERC2" };
const OCA2: Marker = Marker { variant_id: "rs1800407", label: "OCA2" };
const MC1R_R151C: Marker = Marker { variant_id: "rs1805007", label: "MC1R R151C" };
const MC1R_R160W: Marker = Marker { variant_id: "rs1805008", label: "MC1R R160W" };

fn predict_eye_color(genome: &GenomeModel) -> TraitPrediction {
    let mut used = Vec::new();
    let observed = observe(genome, &[HERC2, OCA2], &mut used);
    let Some(herc2) = observed[0] else {
        return TraitPrediction::undetermined("Primary eye colour SNP rs12913832 not genotyped.", used);
    };
    let oca2_variant = observed[1].map(|gt| gt.count_allele('A') > 0).unwrap_or(false);

    match (herc2.count_allele('A'), oca2_variant) {
        (2, true) => TraitPrediction::new(
            "Blue or green",
            Confidence::Moderate,
            "HERC2 AA predicts blue; the OCA2 variant shifts toward green/hazel.",
            used,
        ),
        (2, false) => TraitPrediction::new(
            "Likely blue",
            Confidence::High,
            "HERC2 AA is the strongest single predictor of blue eyes.",
            used,
        ),
        (1, true) => TraitPrediction::new(
            "Green or hazel",
            Confidence::Moderate,
            "Heterozygous HERC2 with the OCA2 variant favours green/hazel.",
            used,
        ),
        (1, false) => TraitPrediction::new(
            "Green, hazel, or light brown",
            Confidence::Moderate,
            "Heterozygous HERC2: intermediate pigmentation.",
            used,
        ),
        _ => TraitPrediction::new(
            "Likely brown",
            Confidence::High,
            "HERC2 GG is strongly associated with brown eyes.",
            used,
        ),
    }
}

/// Combined MC1R loss-of-function (T) copies, `None` if neither SNP is typed
fn mc1r_variant_copies(genome: &GenomeModel, used: &mut Vec<String>) -> Option<u8> {
    let observed = observe(genome, &[MC1R_R151C, MC1R_R160W], used);
    if observed.iter().all(Option::is_none) {
        return None;
    }
    Some(observed.iter().flatten().map(|gt| gt.count_allele('T')).sum())
}

fn predict_hair_color(genome: &GenomeModel) -> TraitPrediction {
    let mut used = Vec::new();
    match mc1r_variant_copies(genome, &mut used) {
        None => TraitPrediction::undetermined("MC1R SNPs not genotyped.", used),
        Some(0) => TraitPrediction::new(
            "Non-red (not determinable from MC1R alone)",
            Confidence::Low,
            "No MC1R red hair variants detected; hair colour depends on many other genes.",
            used,
        ),
        Some(1) => TraitPrediction::new(
            "Possible red tint or auburn highlights",
            Confidence::Moderate,
            "One MC1R variant: red highlights possible, or carrier without visible effect.",
            used,
        ),
        Some(_) => TraitPrediction::new(
            "Likely red or auburn",
            Confidence::High,
            "Two or more MC1R loss-of-function alleles strongly predict red hair.",
            used,
        ),
    }
}

fn predict_freckling(genome: &GenomeModel) -> TraitPrediction {
    let mut used = Vec::new();
    match mc1r_variant_copies(genome, &mut used) {
        None => TraitPrediction::undetermined("MC1R SNPs not genotyped.", used),
        Some(0) => TraitPrediction::new(
            "Typical sun sensitivity",
            Confidence::Moderate,
            "No MC1R risk variants; typical melanin production.",
            used,
        ),
        Some(1) => TraitPrediction::new(
            "Moderate freckling tendency",
            Confidence::Moderate,
            "One MC1R variant: mildly increased sun sensitivity.",
            used,
        ),
        Some(_) => TraitPrediction::new(
            "High freckling tendency, increased sun sensitivity",
            Confidence::High,
            "Multiple MC1R variants: higher UV sensitivity and freckling.",
            used,
        ),
    }
}

/// TAS2R38 PAV (taster) alleles: rs713598 G, rs1726866 C, rs10246939 C
const TAS2R38: [(Marker, char); 3] = [
    (Marker { variant_id: "rs713598", label: "TAS2R38 A49P" }, 'G'),
    (Marker { variant_id: "rs1726866", label: "TAS2R38 V262A" }, 'C'),
    (Marker { variant_id: "rs10246939", label: "TAS2R38 I296V" }, 'C'),
];

fn predict_bitter_taste(genome: &GenomeModel) -> TraitPrediction {
    let mut used = Vec::new();
    let mut taster = 0u32;
    let mut checked = 0u32;

    for (marker, allele) in &TAS2R38 {
        let observed = observe(genome, std::slice::from_ref(marker), &mut used);
        if let Some(gt) = observed[0] {
            taster += u32::from(gt.count_allele(*allele));
            checked += 2;
        }
    }

    if checked == 0 {
        return TraitPrediction::undetermined("TAS2R38 SNPs not genotyped.", used);
    }

    let ratio = f64::from(taster) / f64::from(checked);
    if ratio >= 0.8 {
        TraitPrediction::new(
            "Strong bitter taster",
            Confidence::High,
            "PAV/PAV haplotype: strong perception of PTC/PROP bitterness.",
            used,
        )
    } else if ratio >= 0.4 {
        TraitPrediction::new(
            "Medium bitter taster",
            Confidence::Moderate,
            "PAV/AVI haplotype: intermediate bitter sensitivity.",
            used,
        )
    } else {
        TraitPrediction::new(
            "Non-taster",
            Confidence::High,
            "AVI/AVI haplotype: low sensitivity to bitter compounds.",
            used,
        )
    }
}

/// Predict every trait
pub fn predict(genome: &GenomeModel) -> TraitsResult {
    let mut traits = BTreeMap::new();
    traits.insert("eye_color".to_string(), predict_eye_color(genome));
    traits.insert("hair_color".to_string(), predict_hair_color(genome));
    traits.insert("freckling".to_string(), predict_freckling(genome));
    traits.insert("bitter_taste".to_string(), predict_bitter_taste(genome));
    for entry in &SINGLE_VARIANT_TRAITS {
        traits.insert(entry.name.to_string(), predict_single(genome, entry));
    }

    let determined = traits.values().filter(|t| t.is_determined()).count();
    info!("Traits: {} of {} determined", determined, traits.len());

    TraitsResult { traits, determined }
}

pub fn run(genome: &GenomeModel) -> Result<TraitsResult, AnalysisError> {
    Ok(predict(genome))
}
