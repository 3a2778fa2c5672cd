// ==============================================================================
// processor.rs - Analysis Engine Orchestration
// ==============================================================================
// Description: Runs every classification and inference component over one
//              genome and merges the outcomes into a single report
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-02-09
// Version: 3.0.0
// ==============================================================================
// Independent components run concurrently on the blocking pool. Two edges are
// ordered: ancestry before polygenic scoring, and lifestyle / pharmacogenes /
// APOE before the status consumers (interactions, polypharmacy, dosing and the
// sleep profile). A component that errors or panics is reported as failed;
// its siblings are unaffected.
// ==============================================================================

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::analysis::alcohol::{self, AlcoholProfile};
use crate::analysis::ancestry::{self, AncestryResult};
use crate::analysis::apoe::{self, ApoeResult};
use crate::analysis::blood_type::{self, BloodTypeResult};
use crate::analysis::disease::{self, DiseaseResult};
use crate::analysis::drug_dosing::{self, DrugDosingResult};
use crate::analysis::epistasis::{self, EpistasisResult};
use crate::analysis::haplogroup::{self, HaplogroupResult};
use crate::analysis::lifestyle::{self, LifestyleResult};
use crate::analysis::pharmacogenes::{self, PharmacogeneResult};
use crate::analysis::polypharmacy::{self, PolypharmacyResult};
use crate::analysis::prs::{self, PrsReport};
use crate::analysis::quality::{self, QualityMetrics};
use crate::analysis::sleep::{self, SleepProfile};
use crate::analysis::thyroid::{self, ThyroidProfile};
use crate::analysis::traits::{self, TraitsResult};
use crate::analysis::{AnalysisError, ComponentOutcome};
use crate::models::GenomeModel;
use crate::parsers::LoadStats;
use crate::provenance::{GenomeProvenance, RunInfo};
use crate::reference_data::{DatabaseSummary, ReferenceDatabases};
use crate::validator::ValidatedFile;

/// Run-level switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub skip_ancestry: bool,
    pub skip_prs: bool,
}

/// Merged output of one engine run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run: RunInfo,
    pub genome: Option<GenomeProvenance>,
    pub databases: Vec<DatabaseSummary>,
    pub warnings: Vec<String>,
    pub quality: QualityMetrics,
    pub disease: ComponentOutcome<DiseaseResult>,
    pub lifestyle: ComponentOutcome<LifestyleResult>,
    pub ancestry: ComponentOutcome<AncestryResult>,
    pub prs: ComponentOutcome<PrsReport>,
    pub pharmacogenes: ComponentOutcome<PharmacogeneResult>,
    pub haplogroup: ComponentOutcome<HaplogroupResult>,
    pub epistasis: ComponentOutcome<EpistasisResult>,
    pub polypharmacy: ComponentOutcome<PolypharmacyResult>,
    pub drug_dosing: ComponentOutcome<DrugDosingResult>,
    pub blood_type: ComponentOutcome<BloodTypeResult>,
    pub apoe: ComponentOutcome<ApoeResult>,
    pub traits: ComponentOutcome<TraitsResult>,
    pub sleep: ComponentOutcome<SleepProfile>,
    pub alcohol: ComponentOutcome<AlcoholProfile>,
    pub thyroid: ComponentOutcome<ThyroidProfile>,
}

impl AnalysisReport {
    /// (component, status) in report order
    pub fn component_statuses(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("disease", self.disease.status()),
            ("lifestyle", self.lifestyle.status()),
            ("ancestry", self.ancestry.status()),
            ("prs", self.prs.status()),
            ("pharmacogenes", self.pharmacogenes.status()),
            ("haplogroup", self.haplogroup.status()),
            ("epistasis", self.epistasis.status()),
            ("polypharmacy", self.polypharmacy.status()),
            ("drug_dosing", self.drug_dosing.status()),
            ("blood_type", self.blood_type.status()),
            ("apoe", self.apoe.status()),
            ("traits", self.traits.status()),
            ("sleep", self.sleep.status()),
            ("alcohol", self.alcohol.status()),
            ("thyroid", self.thyroid.status()),
        ]
    }
}

pub struct GeneticsProcessor {
    genome: Arc<GenomeModel>,
    load_stats: LoadStats,
    databases: Arc<ReferenceDatabases>,
    options: EngineOptions,
    provenance: Option<GenomeProvenance>,
}

impl GeneticsProcessor {
    pub fn new(
        genome: GenomeModel,
        load_stats: LoadStats,
        databases: ReferenceDatabases,
        options: EngineOptions,
    ) -> Self {
        Self {
            genome: Arc::new(genome),
            load_stats,
            databases: Arc::new(databases),
            options,
            provenance: None,
        }
    }

    /// Record where the genome came from
    pub fn with_source(mut self, path: &Path, validated: &ValidatedFile) -> Self {
        self.provenance = Some(GenomeProvenance::new(path, validated, self.load_stats.clone()));
        self
    }

    /// Run every component and merge the outcomes
    ///
    /// # Returns
    /// A report with one outcome per component. Never fails as a whole:
    /// missing databases become `skipped`, errors and panics become `failed`.
    pub async fn run(&self) -> AnalysisReport {
        let mut run = RunInfo::start();
        info!("Starting analysis run {} over {} calls", run.run_id, self.genome.len());

        // 1. Quality metrics (cheap, inline)
        let quality = quality::compute(&self.genome, &self.load_stats);

        // 2. Independent components
        let disease = self.spawn(|genome, db| {
            let registry = db.clinvar.require("clinvar")?;
            disease::classify_variants(genome, &registry.data)
        });
        let lifestyle = self.spawn(|genome, db| lifestyle::run(genome, &db.lifestyle, &db.pharmgkb));
        let pharmacogenes = self.spawn(|genome, db| pharmacogenes::run(genome, &db.star_alleles));
        let haplogroup = self.spawn(|genome, db| haplogroup::run(genome, &db.mt_haplogroups));
        let blood_type = self.spawn(|genome, _| blood_type::run(genome));
        let apoe = self.spawn(|genome, _| apoe::run(genome));
        let traits = self.spawn(|genome, _| traits::run(genome));
        let alcohol = self.spawn(|genome, _| alcohol::run(genome));
        let thyroid = self.spawn(|genome, _| thyroid::run(genome));
        let ancestry = if self.options.skip_ancestry {
            None
        } else {
            Some(self.spawn(|genome, db| ancestry::run(genome, &db.ancestry_markers)))
        };

        // 3. Ancestry, then polygenic scores
        let ancestry = match ancestry {
            Some(handle) => settle("ancestry", handle).await,
            None => disabled("ancestry", "--skip-ancestry"),
        };
        let prs = if self.options.skip_prs {
            disabled("prs", "--skip-prs")
        } else {
            let ancestry_result = ancestry.result().cloned();
            let handle = self.spawn(move |genome, db| prs::run(genome, &db.prs_models, ancestry_result.as_ref()));
            settle("prs", handle).await
        };

        // 4. Status sources, then their consumers
        let lifestyle = settle("lifestyle", lifestyle).await;
        let pharmacogenes = settle("pharmacogenes", pharmacogenes).await;
        let apoe = settle("apoe", apoe).await;

        let lifestyle_result = lifestyle.result().cloned();
        let pharmacogene_result = pharmacogenes.result().cloned();
        let apoe_result = apoe.result().cloned();

        let epistasis = {
            let (lifestyle_result, pharmacogene_result) = (lifestyle_result.clone(), pharmacogene_result.clone());
            self.spawn(move |_, db| {
                epistasis::run(
                    &db.epistasis,
                    lifestyle_result.as_ref(),
                    pharmacogene_result.as_ref(),
                    apoe_result.as_ref(),
                )
            })
        };
        let polypharmacy = {
            let (lifestyle_result, pharmacogene_result) = (lifestyle_result.clone(), pharmacogene_result.clone());
            self.spawn(move |_, _| polypharmacy::run(lifestyle_result.as_ref(), pharmacogene_result.as_ref()))
        };
        let drug_dosing = {
            let lifestyle_result = lifestyle_result.clone();
            self.spawn(move |_, _| drug_dosing::run(lifestyle_result.as_ref(), pharmacogene_result.as_ref()))
        };
        let sleep = self.spawn(move |genome, _| sleep::run(genome, lifestyle_result.as_ref()));

        let epistasis = settle("epistasis", epistasis).await;
        let polypharmacy = settle("polypharmacy", polypharmacy).await;
        let drug_dosing = settle("drug_dosing", drug_dosing).await;
        let sleep = settle("sleep", sleep).await;

        // 5. Remaining independents
        let disease = settle("disease", disease).await;
        let haplogroup = settle("haplogroup", haplogroup).await;
        let blood_type = settle("blood_type", blood_type).await;
        let traits = settle("traits", traits).await;
        let alcohol = settle("alcohol", alcohol).await;
        let thyroid = settle("thyroid", thyroid).await;

        run.finish();

        let mut report = AnalysisReport {
            run,
            genome: self.provenance.clone(),
            databases: self.databases.summaries(),
            warnings: self.databases.warnings(),
            quality,
            disease,
            lifestyle,
            ancestry,
            prs,
            pharmacogenes,
            haplogroup,
            epistasis,
            polypharmacy,
            drug_dosing,
            blood_type,
            apoe,
            traits,
            sleep,
            alcohol,
            thyroid,
        };

        if let Some(pgx) = report.pharmacogenes.result() {
            report.warnings.extend(pgx.notes.iter().cloned());
        }

        let failed: Vec<&str> = report
            .component_statuses()
            .into_iter()
            .filter(|(_, status)| *status == "failed")
            .map(|(name, _)| name)
            .collect();
        if !failed.is_empty() {
            warn!("Components failed: {}", failed.join(", "));
        }

        info!(
            "Analysis run {} finished in {} ms",
            report.run.run_id,
            report.run.duration_ms().unwrap_or(0)
        );
        report
    }

    fn spawn<T, F>(&self, component: F) -> JoinHandle<Result<T, AnalysisError>>
    where
        T: Send + 'static,
        F: FnOnce(&GenomeModel, &ReferenceDatabases) -> Result<T, AnalysisError> + Send + 'static,
    {
        let genome = Arc::clone(&self.genome);
        let databases = Arc::clone(&self.databases);
        task::spawn_blocking(move || component(&genome, &databases))
    }
}

/// Await a component task and fold its result into an outcome
async fn settle<T>(component: &str, handle: JoinHandle<Result<T, AnalysisError>>) -> ComponentOutcome<T> {
    let outcome = match handle.await {
        Ok(result) => ComponentOutcome::from(result),
        Err(e) => ComponentOutcome::Failed {
            error: format!("{} task did not complete: {}", component, e),
        },
    };

    match &outcome {
        ComponentOutcome::Completed { .. } => debug!("{} completed", component),
        ComponentOutcome::Skipped { reason } => info!("{} skipped: {}", component, reason),
        ComponentOutcome::Failed { error } => warn!("{} failed: {}", component, error),
    }
    outcome
}

fn disabled<T>(component: &str, flag: &str) -> ComponentOutcome<T> {
    info!("{} disabled by {}", component, flag);
    ComponentOutcome::Skipped {
        reason: format!("disabled by {}", flag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClinicalSignificance, Genotype, GenotypeCall, InheritancePattern};
    use crate::parsers::{ClinVarRegistry, ClinicalVariantRecord};
    use crate::reference_data::{DatabaseSlot, Loaded};
    use std::path::PathBuf;

    fn genome(calls: &[(&str, &str)]) -> GenomeModel {
        GenomeModel::from_calls(calls.iter().enumerate().map(|(i, (id, gt))| GenotypeCall {
            variant_id: Some(id.to_string()),
            chromosome: "19".to_string(),
            position: i as u64 + 1,
            genotype: Genotype::parse(gt).unwrap(),
        }))
        .0
    }

    fn processor(options: EngineOptions) -> GeneticsProcessor {
        GeneticsProcessor::new(
            genome(&[("rs429358", "TC"), ("rs7412", "CC"), ("rs4988235", "AG")]),
            LoadStats::default(),
            ReferenceDatabases::empty(),
            options,
        )
    }

    #[tokio::test]
    async fn test_missing_databases_are_skipped() {
        let report = processor(EngineOptions::default()).run().await;

        assert!(report.disease.is_skipped());
        assert!(report.lifestyle.is_skipped());
        assert!(report.ancestry.is_skipped());
        assert!(report.prs.is_skipped());
        assert!(report.pharmacogenes.is_skipped());
        assert!(report.haplogroup.is_skipped());
        assert!(report.epistasis.is_skipped());
        assert!(report.polypharmacy.is_skipped());
        assert!(report.drug_dosing.is_skipped());

        assert!(report.blood_type.is_completed());
        assert!(report.traits.is_completed());
        assert!(report.sleep.is_completed());
        assert!(report.alcohol.is_completed());
        assert!(report.thyroid.is_completed());
        assert_eq!(report.apoe.result().unwrap().apoe_type, "e3/e4");
        assert!(report.run.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_skip_flags() {
        let options = EngineOptions {
            skip_ancestry: true,
            skip_prs: true,
        };
        let report = processor(options).run().await;

        match &report.ancestry {
            ComponentOutcome::Skipped { reason } => assert!(reason.contains("--skip-ancestry")),
            other => panic!("unexpected ancestry outcome: {:?}", other.status()),
        }
        match &report.prs {
            ComponentOutcome::Skipped { reason } => assert!(reason.contains("--skip-prs")),
            other => panic!("unexpected prs outcome: {:?}", other.status()),
        }
    }

    #[tokio::test]
    async fn test_unreadable_database_fails_only_its_component() {
        let mut databases = ReferenceDatabases::empty();
        databases.clinvar = DatabaseSlot::Unreadable {
            path: PathBuf::from("clinvar_alleles.tsv"),
            message: "bad header".to_string(),
        };
        let processor = GeneticsProcessor::new(
            genome(&[("rs429358", "TT"), ("rs7412", "CC")]),
            LoadStats::default(),
            databases,
            EngineOptions::default(),
        );

        let report = processor.run().await;
        assert_eq!(report.disease.status(), "failed");
        assert!(report.apoe.is_completed());
        assert!(report.traits.is_completed());
    }

    #[tokio::test]
    async fn test_invariant_violation_fails_only_its_component() {
        // Registry built in memory, never through the validating loader
        let record = ClinicalVariantRecord {
            variant_id: Some("rs429358".to_string()),
            chromosome: "19".to_string(),
            position: 1,
            reference_allele: "N".to_string(),
            alternate_allele: "C".to_string(),
            clinical_significance: ClinicalSignificance::Pathogenic,
            significance_text: "Pathogenic".to_string(),
            condition: "Alzheimer disease".to_string(),
            inheritance: InheritancePattern::Dominant,
            review_confidence: 2,
            review_status: String::new(),
            gene: "APOE".to_string(),
            hgvs_p: String::new(),
            hgvs_c: String::new(),
            molecular_consequence: String::new(),
        };
        let mut databases = ReferenceDatabases::empty();
        databases.clinvar = DatabaseSlot::Available(Loaded {
            data: ClinVarRegistry::from_records(vec![record]),
            version: None,
            skipped_rows: 0,
        });
        let processor = GeneticsProcessor::new(
            genome(&[("rs429358", "TC"), ("rs7412", "CC")]),
            LoadStats::default(),
            databases,
            EngineOptions::default(),
        );

        let report = processor.run().await;
        match &report.disease {
            ComponentOutcome::Failed { error } => assert!(error.contains("invariant violation")),
            other => panic!("unexpected disease outcome: {:?}", other.status()),
        }
        assert_eq!(report.apoe.status(), "completed");
        assert_eq!(report.blood_type.status(), "completed");
        assert_eq!(report.traits.status(), "completed");
        assert!(report.lifestyle.is_skipped());
    }

    #[tokio::test]
    async fn test_panicking_component_becomes_failed() {
        let handle: JoinHandle<Result<u32, AnalysisError>> =
            task::spawn_blocking(|| panic!("component exploded"));
        let outcome = settle("boom", handle).await;
        assert_eq!(outcome.status(), "failed");
    }

    #[tokio::test]
    async fn test_report_serializes_outcomes() {
        let report = processor(EngineOptions::default()).run().await;
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["disease"]["status"], "skipped");
        assert_eq!(json["apoe"]["status"], "completed");
        assert!(json["run"]["run_id"].is_string());
        assert_eq!(json["databases"].as_array().unwrap().len(), 8);
    }
}
