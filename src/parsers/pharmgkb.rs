// ==============================================================================
// pharmgkb.rs - PharmGKB Clinical Annotation Parser
// ==============================================================================
// Description: Joins PharmGKB clinical annotations with their per-genotype text
// Author: Matt Barham
// Created: 2025-12-03
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// Files (tab-delimited, joined on "Clinical Annotation ID"):
//   clinical_annotations.tsv  - Variant/Haplotypes, Gene, Drug(s),
//                               Phenotype(s), Level of Evidence, Phenotype Category
//   clinical_ann_alleles.tsv  - Genotype/Allele, Annotation Text
// Only single-variant (rsID) annotations are kept.
// ==============================================================================

use super::{column, field, tsv_reader, Parsed, ReferenceParseError};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const ANNOTATION_ID: &str = "Clinical Annotation ID";

/// Drug-gene annotation for one rsID
#[derive(Debug, Clone, PartialEq)]
pub struct DrugGeneAnnotation {
    pub variant_id: String,
    pub gene: String,
    pub drugs: String,
    pub phenotype: String,
    /// Evidence level ("1A", "1B", "2A", "2B", "3", "4")
    pub level: String,
    pub category: String,
    /// genotype -> annotation text
    pub genotypes: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct PharmGkbTable {
    /// Annotations in first-seen order, one per rsID
    pub annotations: Vec<DrugGeneAnnotation>,
}

impl PharmGkbTable {
    /// Parse and join the two PharmGKB files
    ///
    /// # Arguments
    /// * `annotations_path` - clinical_annotations.tsv
    /// * `alleles_path` - clinical_ann_alleles.tsv
    ///
    /// # Returns
    /// * `Ok(Parsed<PharmGkbTable>)` - Joined annotations, malformed allele rows counted
    /// * `Err(ReferenceParseError)` - Either file unreadable or a join column missing
    ///
    /// Metadata for an rsID comes from its first annotation; genotype texts
    /// from later annotations of the same rsID replace earlier ones.
    pub fn parse(
        annotations_path: impl AsRef<Path>,
        alleles_path: impl AsRef<Path>,
    ) -> Result<Parsed<Self>, ReferenceParseError> {
        let mut reader = tsv_reader(annotations_path.as_ref())?;
        let headers = reader.headers()?.clone();

        let id_col = column(&headers, ANNOTATION_ID)?;
        let variant_col = column(&headers, "Variant/Haplotypes")?;
        let level_col = column(&headers, "Level of Evidence")?;
        let gene_col = column(&headers, "Gene").ok();
        let drugs_col = column(&headers, "Drug(s)").ok();
        let phenotype_col = column(&headers, "Phenotype(s)").ok();
        let category_col = column(&headers, "Phenotype Category").ok();

        let mut annotation_rsid: HashMap<String, String> = HashMap::new();
        let mut annotations: Vec<DrugGeneAnnotation> = Vec::new();
        let mut by_rsid: HashMap<String, usize> = HashMap::new();
        let mut skipped_rows = 0;

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("PharmGKB annotation row: {}", e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let variant = field(&record, Some(variant_col));
            if !variant.starts_with("rs") {
                continue;
            }
            let ann_id = field(&record, Some(id_col)).to_string();
            annotation_rsid.insert(ann_id, variant.to_string());

            by_rsid.entry(variant.to_string()).or_insert_with(|| {
                annotations.push(DrugGeneAnnotation {
                    variant_id: variant.to_string(),
                    gene: field(&record, gene_col).to_string(),
                    drugs: field(&record, drugs_col).to_string(),
                    phenotype: field(&record, phenotype_col).to_string(),
                    level: field(&record, Some(level_col)).to_string(),
                    category: field(&record, category_col).to_string(),
                    genotypes: HashMap::new(),
                });
                annotations.len() - 1
            });
        }

        let mut reader = tsv_reader(alleles_path.as_ref())?;
        let headers = reader.headers()?.clone();
        let allele_id_col = column(&headers, ANNOTATION_ID)?;
        let genotype_col = column(&headers, "Genotype/Allele")?;
        let text_col = column(&headers, "Annotation Text")?;

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("PharmGKB allele row: {}", e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let Some(rsid) = annotation_rsid.get(field(&record, Some(allele_id_col))) else {
                continue;
            };
            let genotype = field(&record, Some(genotype_col)).to_ascii_uppercase();
            if genotype.is_empty() {
                skipped_rows += 1;
                continue;
            }
            if let Some(&idx) = by_rsid.get(rsid) {
                annotations[idx]
                    .genotypes
                    .insert(genotype, field(&record, Some(text_col)).to_string());
            }
        }

        info!(
            "Loaded {} drug-gene annotations ({} malformed rows skipped)",
            annotations.len(),
            skipped_rows
        );

        Ok(Parsed {
            data: PharmGkbTable { annotations },
            skipped_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_join_annotations() {
        let annotations = create_test_file(
            "Clinical Annotation ID\tVariant/Haplotypes\tGene\tLevel of Evidence\tPhenotype Category\tDrug(s)\tPhenotype(s)\n\
             1001\trs4244285\tCYP2C19\t1A\tMetabolism/PK\tclopidogrel\tACS\n\
             1002\tCYP2D6*4\tCYP2D6\t1A\tEfficacy\tcodeine\tpain\n\
             1003\trs9923231\tVKORC1\t1B\tDosage\twarfarin\t\n",
        );
        let alleles = create_test_file(
            "Clinical Annotation ID\tGenotype/Allele\tAnnotation Text\tAllele Function\n\
             1001\tAA\tPoor metabolism of clopidogrel\t\n\
             1001\tAG\tReduced metabolism of clopidogrel\t\n\
             1002\t*4/*4\tPoor metabolizer\t\n\
             1003\tTT\tLower warfarin dose\t\n\
             1003\t\tempty genotype\t\n",
        );

        let parsed = PharmGkbTable::parse(annotations.path(), alleles.path()).unwrap();
        let table = parsed.data;

        assert_eq!(parsed.skipped_rows, 1);
        assert_eq!(table.annotations.len(), 2);
        assert_eq!(table.annotations[0].variant_id, "rs4244285");
        assert_eq!(table.annotations[0].genotypes.len(), 2);
        assert_eq!(table.annotations[0].level, "1A");
        assert_eq!(table.annotations[1].genotypes["TT"], "Lower warfarin dose");
    }
}
