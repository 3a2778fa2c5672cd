// ==============================================================================
// output.rs - Report Output
// ==============================================================================
// Description: Writes the merged analysis report as JSON and logs a summary
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::ComponentOutcome;
use crate::processor::AnalysisReport;

/// Default report file name for a run
pub fn default_report_path(output_dir: &Path, report: &AnalysisReport) -> PathBuf {
    output_dir.join(format!("genetics_report_{}.json", report.run.run_id))
}

/// Serialize the report as pretty JSON
///
/// # Arguments
/// * `report` - Merged engine output
/// * `path` - Destination file; parent directories are created
///
/// # Returns
/// * `Ok(u64)` - Bytes written
pub fn write_report(report: &AnalysisReport, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).context("Failed to serialize report")?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    let size = fs::metadata(path)?.len();
    info!("Report written: {} ({} bytes)", path.display(), size);
    Ok(size)
}

/// One-screen summary of a finished run
pub fn log_summary(report: &AnalysisReport) {
    info!("=== Analysis summary (run {}) ===", report.run.run_id);
    info!(
        "Genome: {} calls, call rate {:.2}%",
        report.quality.total_calls,
        report.quality.call_rate * 100.0
    );

    for (component, status) in report.component_statuses() {
        info!("  {:<14} {}", component, status);
    }

    if let ComponentOutcome::Completed { result } = &report.disease {
        info!(
            "Disease: {} pathogenic, {} likely pathogenic, {} carrier genes, {} ACMG genes",
            result.stats.pathogenic,
            result.stats.likely_pathogenic,
            result.carriers.len(),
            result.acmg.genes_with_variants
        );
    }
    if let Some(lifestyle) = report.lifestyle.result() {
        info!(
            "Lifestyle: {} interpreted ({} high impact)",
            lifestyle.findings.len(),
            lifestyle.summary.high_impact
        );
    }
    if let Some(ancestry) = report.ancestry.result() {
        info!(
            "Ancestry: {} ({} of {} markers, {} confidence)",
            ancestry.top_ancestry,
            ancestry.markers_found,
            ancestry.markers_tested,
            ancestry.confidence.as_str()
        );
    }
    if let Some(prs) = report.prs.result() {
        for score in &prs.scores {
            info!(
                "PRS {}: {:.1}th percentile ({:?})",
                score.name, score.percentile, score.risk_category
            );
        }
    }
    if let Some(pgx) = report.pharmacogenes.result() {
        for call in pgx.calls.iter().filter(|c| c.is_determined()) {
            info!("PGx {}: {} ({})", call.gene, call.diplotype, call.phenotype_label);
        }
    }
    if let Some(haplogroup) = report.haplogroup.result() {
        info!("mtDNA haplogroup: {}", haplogroup.haplogroup);
    }
    if let Some(epistasis) = report.epistasis.result() {
        info!("Gene interactions: {}", epistasis.interactions.len());
    }
    if let Some(polypharmacy) = report.polypharmacy.result() {
        info!(
            "Polypharmacy warnings: {} ({} high)",
            polypharmacy.total_warnings, polypharmacy.by_severity.high
        );
    }
    if let Some(dosing) = report.drug_dosing.result() {
        info!("Drug dosing: {}", dosing.summary);
    }
    if let Some(blood) = report.blood_type.result() {
        info!("Blood type: {}", blood.blood_type);
    }
    if let Some(apoe) = report.apoe.result() {
        info!("APOE: {}", apoe.apoe_type);
    }
    if let Some(traits) = report.traits.result() {
        info!("Traits determined: {}/{}", traits.determined, traits.traits.len());
    }
    if let Some(sleep) = report.sleep.result() {
        info!("Chronotype: {} ({})", sleep.chronotype, sleep.confidence.as_str());
    }
    if let Some(alcohol) = report.alcohol.result() {
        info!("Alcohol: {} metabolism, {} flush risk", alcohol.metabolism_speed, alcohol.flush_risk);
    }
    if let Some(thyroid) = report.thyroid.result() {
        info!("Thyroid: {}", thyroid.summary);
    }
    for warning in &report.warnings {
        info!("Warning: {}", warning);
    }
}
