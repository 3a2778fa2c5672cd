// ==============================================================================
// genotype_converter.rs - Genotype Zygosity and Key Matching
// ==============================================================================
// Description: Converts observed genotypes into zygosity against REF/ALT and
//              resolves order-insensitive genotype keys in curated tables
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================
// Algorithm:
//   Given REF allele and ALT allele from the clinical registry:
//   - REF/REF (e.g., TT where REF=T) → HomozygousReference
//   - REF/ALT or ALT/REF (e.g., AG where REF=A, ALT=G) → Heterozygous
//   - ALT/ALT (e.g., GG where ALT=G) → HomozygousAlternate
//   - ALT plus a third base (e.g., GC where REF=A, ALT=G) → Heterozygous
//   - no ALT and a base other than REF → AllelesMismatch (site skipped)
// ==============================================================================

use crate::models::{Genotype, Zygosity};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during genotype conversion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenotypeConversionError {
    #[error("No-call genotype cannot be converted")]
    NoCall,

    #[error("Registry alleles REF '{ref_allele}' / ALT '{alt_allele}' are not single nucleotides")]
    NotSingleNucleotide {
        ref_allele: String,
        alt_allele: String,
    },

    #[error("Genotype '{genotype}' does not match REF '{ref_allele}' or ALT '{alt_allele}' alleles")]
    AllelesMismatch {
        genotype: String,
        ref_allele: String,
        alt_allele: String,
    },
}

/// Convert an observed genotype to zygosity given REF and ALT alleles
///
/// # Arguments
/// * `genotype` - Observed two-allele genotype
/// * `ref_allele` - Reference allele from the registry (e.g., "T")
/// * `alt_allele` - Alternate allele from the registry (e.g., "C")
///
/// # Returns
/// * `Ok(Zygosity)` - Copies of ALT observed (0, 1 or 2)
/// * `Err(GenotypeConversionError)` - No-call, indel or allele mismatch
///
/// # Examples
/// ```
/// use genetics_interpreter::genotype_converter::zygosity;
/// use genetics_interpreter::models::{Genotype, Zygosity};
///
/// let gt = Genotype::parse("CT").unwrap();
/// assert_eq!(zygosity(&gt, "T", "C").unwrap(), Zygosity::Heterozygous);
/// ```
pub fn zygosity(
    genotype: &Genotype,
    ref_allele: &str,
    alt_allele: &str,
) -> Result<Zygosity, GenotypeConversionError> {
    let (allele1, allele2) = genotype.alleles().ok_or(GenotypeConversionError::NoCall)?;

    let (ref_base, alt_base) = match (single_base(ref_allele), single_base(alt_allele)) {
        (Some(r), Some(a)) => (r, a),
        _ => {
            return Err(GenotypeConversionError::NotSingleNucleotide {
                ref_allele: ref_allele.to_string(),
                alt_allele: alt_allele.to_string(),
            })
        }
    };

    let alt_count = [allele1, allele2].iter().filter(|&&a| a == alt_base).count();
    let ref_count = [allele1, allele2].iter().filter(|&&a| a == ref_base).count();

    match (alt_count, ref_count) {
        (2, _) => Ok(Zygosity::HomozygousAlternate),
        // Tri-allelic sites still carry one ALT copy
        (1, _) => Ok(Zygosity::Heterozygous),
        (0, 2) => Ok(Zygosity::HomozygousReference),
        _ => Err(GenotypeConversionError::AllelesMismatch {
            genotype: genotype.to_string(),
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
        }),
    }
}

fn single_base(allele: &str) -> Option<char> {
    let mut chars = allele.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_uppercase()).filter(|b| matches!(b, 'A' | 'C' | 'G' | 'T')),
        _ => None,
    }
}

/// Look up a genotype in a table keyed by genotype strings, ignoring
/// allele order ("AG" finds an "AG" or a "GA" key)
pub fn lookup_unordered<'a, V>(table: &'a HashMap<String, V>, genotype: &Genotype) -> Option<&'a V> {
    let (a, b) = genotype.alleles()?;
    let forward = format!("{}{}", a, b);
    if let Some(value) = table.get(&forward) {
        return Some(value);
    }
    let reverse = format!("{}{}", b, a);
    table.get(&reverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gt(raw: &str) -> Genotype {
        Genotype::parse(raw).unwrap()
    }

    #[test]
    fn test_homozygous_reference() {
        assert_eq!(zygosity(&gt("TT"), "T", "C").unwrap(), Zygosity::HomozygousReference);
        assert_eq!(zygosity(&gt("AA"), "A", "G").unwrap(), Zygosity::HomozygousReference);
    }

    #[test]
    fn test_heterozygous() {
        assert_eq!(zygosity(&gt("TC"), "T", "C").unwrap(), Zygosity::Heterozygous);
        // Order doesn't matter
        assert_eq!(zygosity(&gt("CT"), "T", "C").unwrap(), Zygosity::Heterozygous);
    }

    #[test]
    fn test_homozygous_alternate() {
        assert_eq!(zygosity(&gt("CC"), "T", "C").unwrap(), Zygosity::HomozygousAlternate);
        assert_eq!(zygosity(&gt("GG"), "a", "g").unwrap(), Zygosity::HomozygousAlternate);
    }

    #[test]
    fn test_no_call() {
        assert_eq!(
            zygosity(&Genotype::no_call(), "T", "C"),
            Err(GenotypeConversionError::NoCall)
        );
    }

    #[test]
    fn test_alt_with_third_base_is_heterozygous() {
        assert_eq!(zygosity(&gt("GA"), "C", "A").unwrap(), Zygosity::Heterozygous);
        assert_eq!(zygosity(&gt("CG"), "T", "C").unwrap(), Zygosity::Heterozygous);
    }

    #[test]
    fn test_allele_mismatch() {
        let result = zygosity(&gt("TG"), "T", "C");
        assert!(matches!(result, Err(GenotypeConversionError::AllelesMismatch { .. })));

        let result = zygosity(&gt("AG"), "T", "C");
        assert!(matches!(result, Err(GenotypeConversionError::AllelesMismatch { .. })));
    }

    #[test]
    fn test_indels() {
        let result = zygosity(&gt("AA"), "A", "AG");
        assert!(matches!(result, Err(GenotypeConversionError::NotSingleNucleotide { .. })));

        let result = zygosity(&gt("AA"), "AG", "A");
        assert!(matches!(result, Err(GenotypeConversionError::NotSingleNucleotide { .. })));

        let result = zygosity(&gt("AA"), "", "A");
        assert!(matches!(result, Err(GenotypeConversionError::NotSingleNucleotide { .. })));

        let result = zygosity(&gt("AA"), "-", "A");
        assert!(matches!(result, Err(GenotypeConversionError::NotSingleNucleotide { .. })));
    }

    #[test]
    fn test_lookup_unordered() {
        let mut table = HashMap::new();
        table.insert("AG".to_string(), "carrier");
        table.insert("GG".to_string(), "risk");

        assert_eq!(lookup_unordered(&table, &gt("AG")), Some(&"carrier"));
        assert_eq!(lookup_unordered(&table, &gt("GA")), Some(&"carrier"));
        assert_eq!(lookup_unordered(&table, &gt("GG")), Some(&"risk"));
        assert_eq!(lookup_unordered(&table, &gt("CC")), None);
        assert_eq!(lookup_unordered(&table, &Genotype::no_call()), None);
    }
}
