// ==============================================================================
// engine_integration.rs - End-to-End Engine Tests
// ==============================================================================
// Description: Validate, load and analyse a synthetic genome against the
//              shipped reference tables
// Author: Matt Barham
// Created: 2026-01-20
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================

use std::io::Write;
use std::path::PathBuf;

use genetics_interpreter::models::MetabolizerPhenotype;
use genetics_interpreter::output;
use genetics_interpreter::parsers::Genome23Parser;
use genetics_interpreter::processor::{AnalysisReport, EngineOptions, GeneticsProcessor};
use genetics_interpreter::reference_data::{DatabasePaths, ReferenceDatabases};
use genetics_interpreter::validator::FileValidator;
use tempfile::{Builder, NamedTempFile, TempDir};

const GENOME: &str = "\
# This data file generated by 23andMe at: Mon Jan 06 2025
# rsid\tchromosome\tposition\tgenotype
rs4244285\t10\t94781859\tAG
rs4986893\t10\t94780653\tGG
rs12248560\t10\t94761900\tCC
rs762551\t15\t74749576\tAC
rs429358\t19\t44908684\tTT
rs7412\t19\t44908822\tCC
rs1426654\t15\t48134287\tAA
rs16891982\t5\t33951588\tGG
rs12913832\t15\t28120472\tGG
rs7903146\t10\t112998590\tCT
rs4988235\t2\t135851076\tAG
rs1234567\t1\t1000\t--
rs9999999\t1\t2000\tDI
i3000001\tMT\t3010\tG
";

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn genome_file() -> NamedTempFile {
    let mut file = Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(GENOME.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

async fn run_engine(options: EngineOptions) -> AnalysisReport {
    let file = genome_file();
    let validated = FileValidator::new().validate(file.path()).unwrap();
    let (genome, stats) = Genome23Parser::new().load(file.path()).unwrap();
    let databases = ReferenceDatabases::load(&DatabasePaths::from_data_dir(data_dir())).unwrap();

    GeneticsProcessor::new(genome, stats, databases, options)
        .with_source(file.path(), &validated)
        .run()
        .await
}

#[tokio::test]
async fn test_full_run_over_shipped_tables() {
    let report = run_engine(EngineOptions::default()).await;

    // No ClinVar dump ships with the repository
    assert!(report.disease.is_skipped());

    assert!(report.lifestyle.is_completed());
    assert!(report.ancestry.is_completed());
    assert!(report.prs.is_completed());
    assert!(report.pharmacogenes.is_completed());
    assert!(report.haplogroup.is_completed());
    assert!(report.epistasis.is_completed());
    assert!(report.blood_type.is_completed());
    assert!(report.apoe.is_completed());
    assert!(report.traits.is_completed());
    assert!(report.polypharmacy.is_completed());
    assert!(report.drug_dosing.is_completed());
    assert!(report.sleep.is_completed());
    assert!(report.alcohol.is_completed());
    assert!(report.thyroid.is_completed());

    let lifestyle = report.lifestyle.result().unwrap();
    assert!(lifestyle.drug_gene.is_skipped());
}

#[tokio::test]
async fn test_cyp2c19_star_two_carrier() {
    let report = run_engine(EngineOptions::default()).await;
    let pgx = report.pharmacogenes.result().unwrap();

    let cyp2c19 = pgx.calls.iter().find(|c| c.gene == "CYP2C19").unwrap();
    assert_eq!(cyp2c19.diplotype, "*1/*2");
    assert_eq!(cyp2c19.phenotype, MetabolizerPhenotype::Intermediate);
    assert!(!cyp2c19.ambiguous);
}

#[tokio::test]
async fn test_intermediate_cyp2c19_drives_drug_guidance() {
    let report = run_engine(EngineOptions::default()).await;

    let polypharmacy = report.polypharmacy.result().unwrap();
    assert!(polypharmacy.warnings.iter().any(|w| w.id == "clopidogrel_resistance"));
    assert!(polypharmacy.warnings.iter().all(|w| w.id != "ppi_reduced_efficacy"));

    let dosing = report.drug_dosing.result().unwrap();
    let drugs: Vec<&str> = dosing.recommendations.iter().map(|r| r.drug.as_str()).collect();
    assert!(drugs.contains(&"Clopidogrel"));
    // rs762551 AC reaches the caffeine guideline through the lifestyle status
    assert!(drugs.contains(&"Caffeine"));

    let sleep = report.sleep.result().unwrap();
    assert!(sleep.caffeine_sensitive);
}

#[tokio::test]
async fn test_apoe_and_provenance() {
    let report = run_engine(EngineOptions::default()).await;

    assert_eq!(report.apoe.result().unwrap().apoe_type, "e3/e3");

    let genome = report.genome.as_ref().unwrap();
    assert_eq!(genome.sha256.len(), 64);
    assert_eq!(genome.load_stats.no_calls, 1);
    assert_eq!(genome.load_stats.invalid_genotypes, 1);
    assert_eq!(report.quality.mt_calls, 1);

    let lifestyle_db = report.databases.iter().find(|d| d.name == "lifestyle").unwrap();
    assert_eq!(lifestyle_db.status, "loaded");
    assert_eq!(lifestyle_db.version.as_ref().unwrap().version, "1.4.0");
}

#[tokio::test]
async fn test_prs_without_ancestry_has_no_caveat() {
    let options = EngineOptions {
        skip_ancestry: true,
        skip_prs: false,
    };
    let report = run_engine(options).await;

    assert!(report.ancestry.is_skipped());
    let prs = report.prs.result().unwrap();
    assert!(prs.non_european_fraction.is_none());
    assert!(prs.scores.iter().all(|s| s.ancestry_caveat.is_none()));
}

#[tokio::test]
async fn test_report_round_trips_to_disk() {
    let report = run_engine(EngineOptions::default()).await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.json");

    output::write_report(&report, &path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["disease"]["status"], "skipped");
    assert_eq!(json["pharmacogenes"]["status"], "completed");
    assert_eq!(json["genome"]["load_stats"]["no_calls"], 1);
}
