// ==============================================================================
// provenance.rs - Run Provenance
// ==============================================================================
// Description: Run identity, timing and input fingerprints for each report
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::parsers::LoadStats;
use crate::validator::ValidatedFile;

/// Identity and timing of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub engine_version: String,
}

impl RunInfo {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, once finished
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Where the genome came from and how much of it loaded
#[derive(Debug, Clone, Serialize)]
pub struct GenomeProvenance {
    pub path: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub compressed: bool,
    pub load_stats: LoadStats,
}

impl GenomeProvenance {
    pub fn new(path: &Path, validated: &ValidatedFile, load_stats: LoadStats) -> Self {
        Self {
            path: path.display().to_string(),
            file_name: validated.file_name.clone(),
            size_bytes: validated.size,
            sha256: validated.hash_sha256.clone(),
            compressed: validated.compressed,
            load_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_info_lifecycle() {
        let mut run = RunInfo::start();
        assert!(run.finished_at.is_none());
        assert!(run.duration_ms().is_none());

        run.finish();
        assert!(run.duration_ms().unwrap() >= 0);
        assert_eq!(run.run_id.get_version_num(), 4);
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunInfo::start().run_id, RunInfo::start().run_id);
    }
}
