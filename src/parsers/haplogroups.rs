// ==============================================================================
// haplogroups.rs - Mitochondrial Haplogroup Tree Parser
// ==============================================================================
// Description: Loads the maternal haplogroup refinement tree
// Author: Matt Barham
// Created: 2025-12-12
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// Format:
//   haplogroup  parent  markers  lineage  description
//   H  R  rs2853515:G  European  Most common European lineage
// markers: comma-separated rsid:allele pairs; parent empty for roots.
// Parents must appear before their children, which rules out cycles.
// ==============================================================================

use super::aims::single_nucleotide;
use super::{column, field, tsv_reader, Parsed, ReferenceParseError};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// One node of the haplogroup tree
#[derive(Debug, Clone, PartialEq)]
pub struct HaplogroupNode {
    pub name: String,
    pub parent: Option<String>,
    /// variant id -> required (haploid) allele
    pub markers: BTreeMap<String, char>,
    pub lineage: String,
    pub description: String,
    /// Distance from the root; roots have depth 0
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct HaplogroupTree {
    pub nodes: Vec<HaplogroupNode>,
}

impl HaplogroupTree {
    /// Parse the haplogroup TSV
    ///
    /// Rows with an unknown parent, a duplicate name, no markers, or a
    /// marker that is not `rsid:<A|C|G|T>` are malformed and skipped.
    pub fn parse(path: impl AsRef<Path>) -> Result<Parsed<Self>, ReferenceParseError> {
        let mut reader = tsv_reader(path.as_ref())?;
        let headers = reader.headers()?.clone();

        let name_col = column(&headers, "haplogroup")?;
        let parent_col = column(&headers, "parent")?;
        let markers_col = column(&headers, "markers")?;
        let lineage_col = column(&headers, "lineage").ok();
        let description_col = column(&headers, "description").ok();

        let mut nodes: Vec<HaplogroupNode> = Vec::new();
        let mut depth_of: HashMap<String, usize> = HashMap::new();
        let mut skipped_rows = 0;

        for (row, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("Haplogroup row {}: {}", row + 2, e);
                    skipped_rows += 1;
                    continue;
                }
            };

            let name = field(&record, Some(name_col));
            let parent = field(&record, Some(parent_col));
            let markers = parse_markers(field(&record, Some(markers_col)));

            let depth = if parent.is_empty() {
                Some(0)
            } else {
                depth_of.get(parent).map(|d| d + 1)
            };

            match (depth, markers) {
                (Some(depth), Some(markers)) if !name.is_empty() && !depth_of.contains_key(name) => {
                    depth_of.insert(name.to_string(), depth);
                    nodes.push(HaplogroupNode {
                        name: name.to_string(),
                        parent: (!parent.is_empty()).then(|| parent.to_string()),
                        markers,
                        lineage: field(&record, lineage_col).to_string(),
                        description: field(&record, description_col).to_string(),
                        depth,
                    });
                }
                _ => {
                    debug!("Haplogroup row {}: malformed node '{}'", row + 2, name);
                    skipped_rows += 1;
                }
            }
        }

        if nodes.is_empty() {
            return Err(ReferenceParseError::Empty);
        }

        info!(
            "Loaded {} haplogroup nodes ({} malformed rows skipped)",
            nodes.len(),
            skipped_rows
        );

        Ok(Parsed {
            data: HaplogroupTree { nodes },
            skipped_rows,
        })
    }

    /// Number of distinct marker variants in the tree
    pub fn marker_count(&self) -> usize {
        let mut ids: Vec<&String> = self.nodes.iter().flat_map(|n| n.markers.keys()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    pub fn node(&self, name: &str) -> Option<&HaplogroupNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

fn parse_markers(raw: &str) -> Option<BTreeMap<String, char>> {
    let mut markers = BTreeMap::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (rsid, allele) = part.split_once(':')?;
        let allele = single_nucleotide(allele)?;
        if rsid.trim().is_empty() {
            return None;
        }
        markers.insert(rsid.trim().to_string(), allele);
    }
    (!markers.is_empty()).then_some(markers)
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
    fn test_parse_tree() {
        let contents = "\
haplogroup\tparent\tmarkers\tlineage\tdescription
L3\t\trs1:T\tAfrican\tOut of Africa
N\tL3\trs2:A\tEurasian\tN macro
R\tN\trs3:C,rs4:G\tEurasian\tR
H\tR\trs5:G\tEuropean\tH
X\tQ\trs6:A\tEurasian\tunknown parent
Y\tR\trs7:AT\tEurasian\tbad marker
H\tR\trs8:G\tEuropean\tduplicate
";
        let file = create_test_file(contents);
        let parsed = HaplogroupTree::parse(file.path()).unwrap();

        assert_eq!(parsed.skipped_rows, 3);
        let tree = parsed.data;
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.node("L3").unwrap().depth, 0);
        assert_eq!(tree.node("H").unwrap().depth, 3);
        assert_eq!(tree.node("H").unwrap().parent.as_deref(), Some("R"));
        assert_eq!(tree.node("R").unwrap().markers.len(), 2);
        assert_eq!(tree.marker_count(), 5);
    }
}
