// ==============================================================================
// haplogroup.rs - Mitochondrial Haplogroup Classifier
// ==============================================================================
// Description: Most-specific-match traversal of the maternal lineage tree
// Author: Matt Barham
// Created: 2025-12-12
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================

use super::AnalysisError;
use crate::models::{Confidence, GenomeModel};
use crate::parsers::{HaplogroupNode, HaplogroupTree};
use crate::reference_data::DatabaseSlot;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{info, warn};

const HIGH_CONFIDENCE_MARKERS: usize = 15;
const MODERATE_CONFIDENCE_MARKERS: usize = 5;

pub const UNDETERMINED: &str = "undetermined";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HaplogroupResult {
    pub haplogroup: String,
    /// "<region> maternal"
    pub lineage: Option<String>,
    pub description: Option<String>,
    pub markers_found: usize,
    pub markers_tested: usize,
    pub confidence: Confidence,
    /// Every node whose markers are all satisfied
    pub matched_nodes: Vec<String>,
}

/// Every required marker is genotyped and homozygous for the required base
fn node_matches(genome: &GenomeModel, node: &HaplogroupNode) -> bool {
    node.markers.iter().all(|(id, base)| {
        genome
            .genotype(id)
            .map(|gt| gt.count_allele(*base) == 2)
            .unwrap_or(false)
    })
}

/// Deeper first, then more markers, then the smaller name
fn specificity(a: &HaplogroupNode, b: &HaplogroupNode) -> Ordering {
    a.depth
        .cmp(&b.depth)
        .then_with(|| a.markers.len().cmp(&b.markers.len()))
        .then_with(|| b.name.cmp(&a.name))
}

/// Classify the maternal haplogroup
///
/// # Arguments
/// * `genome` - Subject genotypes (MT calls stored as homozygous pairs)
/// * `tree` - Haplogroup definitions with parent links
///
/// # Returns
/// * `HaplogroupResult` - The most specific matching node, or "undetermined"
pub fn classify(genome: &GenomeModel, tree: &HaplogroupTree) -> HaplogroupResult {
    let marker_ids: BTreeSet<&str> = tree
        .nodes
        .iter()
        .flat_map(|node| node.markers.keys().map(String::as_str))
        .collect();
    let markers_found = marker_ids.iter().filter(|id| genome.genotype(id).is_some()).count();
    let markers_tested = tree.marker_count();
    let confidence = Confidence::from_count(markers_found, HIGH_CONFIDENCE_MARKERS, MODERATE_CONFIDENCE_MARKERS);

    let matched: Vec<&HaplogroupNode> = tree.nodes.iter().filter(|node| node_matches(genome, node)).collect();
    let best = matched.iter().copied().max_by(|a, b| specificity(a, b));

    let result = match best {
        Some(node) => HaplogroupResult {
            haplogroup: node.name.clone(),
            lineage: (!node.lineage.is_empty()).then(|| format!("{} maternal", node.lineage)),
            description: (!node.description.is_empty()).then(|| node.description.clone()),
            markers_found,
            markers_tested,
            confidence,
            matched_nodes: matched.iter().map(|n| n.name.clone()).collect(),
        },
        None => {
            warn!("No haplogroup matched ({} of {} markers genotyped)", markers_found, markers_tested);
            HaplogroupResult {
                haplogroup: UNDETERMINED.to_string(),
                lineage: None,
                description: None,
                markers_found,
                markers_tested,
                confidence,
                matched_nodes: Vec::new(),
            }
        }
    };

    info!(
        "Haplogroup {} ({}/{} markers, {} confidence)",
        result.haplogroup,
        markers_found,
        markers_tested,
        confidence.as_str()
    );
    result
}

pub fn run(genome: &GenomeModel, tree: &DatabaseSlot<HaplogroupTree>) -> Result<HaplogroupResult, AnalysisError> {
    let loaded = tree.require("mt_haplogroups")?;
    Ok(classify(genome, &loaded.data))
}
