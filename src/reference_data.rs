// ==============================================================================
// reference_data.rs - Reference Database Bundle
// ==============================================================================
// Description: Locates, loads and versions the curated reference databases
//              used by one analysis run
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analysis::AnalysisError;
use crate::parsers::{
    AncestryMarkerTable, ClinVarParser, ClinVarRegistry, EpistasisRuleSet, HaplogroupTree, LifestyleTable,
    Parsed, PgsParser, PharmGkbTable, PolygenicModel, StarAlleleTable,
};

/// Version stamp for one database, passed through to the report untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataVersion {
    pub version: String,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A loaded database with its provenance
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub data: T,
    pub version: Option<DataVersion>,
    pub skipped_rows: usize,
}

/// Load state of one database
#[derive(Debug, Clone)]
pub enum DatabaseSlot<T> {
    Available(Loaded<T>),
    Missing(PathBuf),
    Unreadable { path: PathBuf, message: String },
}

impl<T> DatabaseSlot<T> {
    /// Borrow the loaded data, or the error the owning component reports
    pub fn require(&self, database: &str) -> Result<&Loaded<T>, AnalysisError> {
        match self {
            DatabaseSlot::Available(loaded) => Ok(loaded),
            DatabaseSlot::Missing(_) => Err(AnalysisError::MissingData(database.to_string())),
            DatabaseSlot::Unreadable { message, .. } => Err(AnalysisError::DatabaseUnreadable {
                database: database.to_string(),
                message: message.clone(),
            }),
        }
    }

    fn status(&self) -> &'static str {
        match self {
            DatabaseSlot::Available(_) => "loaded",
            DatabaseSlot::Missing(_) => "missing",
            DatabaseSlot::Unreadable { .. } => "unreadable",
        }
    }

    fn skipped_rows(&self) -> usize {
        match self {
            DatabaseSlot::Available(loaded) => loaded.skipped_rows,
            _ => 0,
        }
    }
}

/// File locations of every database under a data directory
#[derive(Debug, Clone, PartialEq)]
pub struct DatabasePaths {
    pub clinvar: PathBuf,
    pub pharmgkb_annotations: PathBuf,
    pub pharmgkb_alleles: PathBuf,
    pub lifestyle: PathBuf,
    pub ancestry_markers: PathBuf,
    pub prs_models: PathBuf,
    pub star_alleles: PathBuf,
    pub mt_haplogroups: PathBuf,
    pub epistasis: PathBuf,
    pub versions: PathBuf,
}

impl DatabasePaths {
    /// Standard file names under `data_dir`; ClinVar falls back to the
    /// gzipped dump when the plain TSV is absent
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        let plain_clinvar = dir.join("clinvar_alleles.tsv");
        let gz_clinvar = dir.join("clinvar_alleles.tsv.gz");
        let clinvar = if !plain_clinvar.exists() && gz_clinvar.exists() {
            gz_clinvar
        } else {
            plain_clinvar
        };

        Self {
            clinvar,
            pharmgkb_annotations: dir.join("clinical_annotations.tsv"),
            pharmgkb_alleles: dir.join("clinical_ann_alleles.tsv"),
            lifestyle: dir.join("lifestyle_snps.tsv"),
            ancestry_markers: dir.join("ancestry_markers.tsv"),
            prs_models: dir.join("prs_models.tsv"),
            star_alleles: dir.join("star_alleles.json"),
            mt_haplogroups: dir.join("mt_haplogroups.tsv"),
            epistasis: dir.join("epistasis_rules.json"),
            versions: dir.join("data_versions.json"),
        }
    }
}

/// Per-database line in the report's provenance section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSummary {
    pub name: String,
    pub status: String,
    pub version: Option<DataVersion>,
    pub skipped_rows: usize,
}

/// Every reference database for one run; immutable after `load`
#[derive(Debug, Clone)]
pub struct ReferenceDatabases {
    pub clinvar: DatabaseSlot<ClinVarRegistry>,
    pub pharmgkb: DatabaseSlot<PharmGkbTable>,
    pub lifestyle: DatabaseSlot<LifestyleTable>,
    pub ancestry_markers: DatabaseSlot<AncestryMarkerTable>,
    pub prs_models: DatabaseSlot<Vec<PolygenicModel>>,
    pub star_alleles: DatabaseSlot<StarAlleleTable>,
    pub mt_haplogroups: DatabaseSlot<HaplogroupTree>,
    pub epistasis: DatabaseSlot<EpistasisRuleSet>,
}

impl ReferenceDatabases {
    /// Load every database found at `paths`
    ///
    /// # Arguments
    /// * `paths` - Database file locations
    ///
    /// # Returns
    /// * `Ok(ReferenceDatabases)` - Missing or unreadable files become
    ///   `Missing`/`Unreadable` slots rather than errors
    /// * `Err` - Only when the version manifest exists but cannot be read
    pub fn load(paths: &DatabasePaths) -> Result<Self> {
        let versions = load_versions(&paths.versions)?;
        let version = |name: &str| versions.get(name).cloned();

        let clinvar = load_slot("clinvar", &paths.clinvar, version("clinvar"), |p| {
            ClinVarParser::parse(p).map(|(data, skipped_rows)| Parsed { data, skipped_rows })
        });

        let pharmgkb = if paths.pharmgkb_alleles.exists() {
            load_slot("pharmgkb", &paths.pharmgkb_annotations, version("pharmgkb"), |p| {
                PharmGkbTable::parse(p, &paths.pharmgkb_alleles)
            })
        } else {
            info!("PharmGKB allele file not found, skipping drug-gene annotations");
            DatabaseSlot::Missing(paths.pharmgkb_alleles.clone())
        };

        let lifestyle = load_slot("lifestyle", &paths.lifestyle, version("lifestyle"), |p| LifestyleTable::parse(p));
        let ancestry_markers = load_slot(
            "ancestry_markers",
            &paths.ancestry_markers,
            version("ancestry_markers"),
            |p| AncestryMarkerTable::parse(p),
        );
        let prs_models = load_slot("prs_models", &paths.prs_models, version("prs_models"), |p| {
            PgsParser::parse(p).map(|(data, skipped_rows)| Parsed { data, skipped_rows })
        });
        let star_alleles = load_slot("star_alleles", &paths.star_alleles, version("star_alleles"), |p| StarAlleleTable::parse(p));
        let mt_haplogroups = load_slot(
            "mt_haplogroups",
            &paths.mt_haplogroups,
            version("mt_haplogroups"),
            |p| HaplogroupTree::parse(p),
        );
        let epistasis = load_slot("epistasis", &paths.epistasis, version("epistasis"), |p| EpistasisRuleSet::parse(p));

        let databases = Self {
            clinvar,
            pharmgkb,
            lifestyle,
            ancestry_markers,
            prs_models,
            star_alleles,
            mt_haplogroups,
            epistasis,
        };

        for summary in databases.summaries() {
            if summary.skipped_rows > 0 {
                warn!(
                    "{}",
                    AnalysisError::MalformedRecord {
                        database: summary.name.clone(),
                        skipped_rows: summary.skipped_rows,
                    }
                );
            }
        }

        Ok(databases)
    }

    /// Bundle with every database missing
    pub fn empty() -> Self {
        let none = PathBuf::new;
        Self {
            clinvar: DatabaseSlot::Missing(none()),
            pharmgkb: DatabaseSlot::Missing(none()),
            lifestyle: DatabaseSlot::Missing(none()),
            ancestry_markers: DatabaseSlot::Missing(none()),
            prs_models: DatabaseSlot::Missing(none()),
            star_alleles: DatabaseSlot::Missing(none()),
            mt_haplogroups: DatabaseSlot::Missing(none()),
            epistasis: DatabaseSlot::Missing(none()),
        }
    }

    /// Status, version and skipped-row count per database
    pub fn summaries(&self) -> Vec<DatabaseSummary> {
        fn summary<T>(name: &str, slot: &DatabaseSlot<T>) -> DatabaseSummary {
            DatabaseSummary {
                name: name.to_string(),
                status: slot.status().to_string(),
                version: match slot {
                    DatabaseSlot::Available(loaded) => loaded.version.clone(),
                    _ => None,
                },
                skipped_rows: slot.skipped_rows(),
            }
        }

        vec![
            summary("clinvar", &self.clinvar),
            summary("pharmgkb", &self.pharmgkb),
            summary("lifestyle", &self.lifestyle),
            summary("ancestry_markers", &self.ancestry_markers),
            summary("prs_models", &self.prs_models),
            summary("star_alleles", &self.star_alleles),
            summary("mt_haplogroups", &self.mt_haplogroups),
            summary("epistasis", &self.epistasis),
        ]
    }

    /// Malformed-row reports for databases that dropped rows
    pub fn warnings(&self) -> Vec<String> {
        self.summaries()
            .into_iter()
            .filter(|s| s.skipped_rows > 0)
            .map(|s| {
                AnalysisError::MalformedRecord {
                    database: s.name,
                    skipped_rows: s.skipped_rows,
                }
                .to_string()
            })
            .collect()
    }
}

fn load_slot<T, E, F>(name: &str, path: &Path, version: Option<DataVersion>, parse: F) -> DatabaseSlot<T>
where
    E: Display,
    F: FnOnce(&Path) -> std::result::Result<Parsed<T>, E>,
{
    if !path.exists() {
        info!("{} not found at {}, skipping", name, path.display());
        return DatabaseSlot::Missing(path.to_path_buf());
    }

    match parse(path) {
        Ok(parsed) => DatabaseSlot::Available(Loaded {
            data: parsed.data,
            version,
            skipped_rows: parsed.skipped_rows,
        }),
        Err(e) => {
            warn!("Failed to load {} from {}: {}", name, path.display(), e);
            DatabaseSlot::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        }
    }
}

fn load_versions(path: &Path) -> Result<BTreeMap<String, DataVersion>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let versions = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse version manifest {}", path.display()))?;
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_yields_missing_slots() {
        let dir = TempDir::new().unwrap();
        let databases = ReferenceDatabases::load(&DatabasePaths::from_data_dir(dir.path())).unwrap();

        assert!(matches!(databases.clinvar, DatabaseSlot::Missing(_)));
        assert!(matches!(
            databases.lifestyle.require("lifestyle"),
            Err(AnalysisError::MissingData(_))
        ));
        assert!(databases.summaries().iter().all(|s| s.status == "missing"));
    }

    #[test]
    fn test_load_with_versions_and_bad_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("data_versions.json"),
            r#"{ "mt_haplogroups": { "version": "PhyloTree-17", "updated": "2024-09-15T00:00:00Z" } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("mt_haplogroups.tsv"),
            "haplogroup\tparent\tmarkers\tlineage\tdescription\nL3\t\trs1:T\tAfrican\troot\nX\tQ\trs2:A\tX\torphan\n",
        )
        .unwrap();
        fs::write(dir.path().join("star_alleles.json"), "{ broken").unwrap();

        let databases = ReferenceDatabases::load(&DatabasePaths::from_data_dir(dir.path())).unwrap();

        let tree = databases.mt_haplogroups.require("mt_haplogroups").unwrap();
        assert_eq!(tree.version.as_ref().unwrap().version, "PhyloTree-17");
        assert_eq!(tree.skipped_rows, 1);
        assert!(matches!(
            databases.star_alleles.require("star_alleles"),
            Err(AnalysisError::DatabaseUnreadable { .. })
        ));
        assert_eq!(databases.warnings(), vec!["1 malformed rows skipped in mt_haplogroups".to_string()]);
    }

    #[test]
    fn test_gz_clinvar_fallback() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("clinvar_alleles.tsv.gz"), b"").unwrap();
        let paths = DatabasePaths::from_data_dir(dir.path());
        assert!(paths.clinvar.ends_with("clinvar_alleles.tsv.gz"));
    }
}
