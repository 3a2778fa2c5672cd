// ==============================================================================
// analysis/mod.rs - Classification and Inference Components
// ==============================================================================
// Description: Engine components plus the shared error and outcome types
// Author: Matt Barham
// Created: 2025-12-01
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================
// Every component is a pure function of (GenomeModel, reference tables) and
// returns Result<_, AnalysisError>; the processor turns that into a
// ComponentOutcome so one failing component never hides the others.
// ==============================================================================

pub mod acmg;
pub mod alcohol;
pub mod ancestry;
pub mod apoe;
pub mod blood_type;
pub mod disease;
pub mod drug_dosing;
pub mod epistasis;
pub mod haplogroup;
pub mod lifestyle;
pub mod pharmacogenes;
pub mod polypharmacy;
pub mod prs;
pub mod quality;
pub mod sleep;
pub mod thyroid;
pub mod traits;

use crate::models::GenotypeError;
use serde::Serialize;
use thiserror::Error;

/// Engine error taxonomy
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Required reference database absent; the component is skipped
    #[error("database unavailable: {0}")]
    MissingData(String),

    /// Rows dropped while loading a database; reported, never fatal
    #[error("{skipped_rows} malformed rows skipped in {database}")]
    MalformedRecord { database: String, skipped_rows: usize },

    /// A call resolved by policy rather than uniquely; reported, never fatal
    #[error("ambiguous resolution for {subject}: {details}")]
    AmbiguousResolution { subject: String, details: String },

    /// Upstream contract broken; aborts the affected component only
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Database present but unreadable as a whole
    #[error("database {database} could not be read: {message}")]
    DatabaseUnreadable { database: String, message: String },
}

impl From<GenotypeError> for AnalysisError {
    fn from(err: GenotypeError) -> Self {
        AnalysisError::InvariantViolation(err.to_string())
    }
}

/// Result envelope for one component in the merged report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ComponentOutcome<T> {
    Completed { result: T },
    Skipped { reason: String },
    Failed { error: String },
}

impl<T> ComponentOutcome<T> {
    pub fn result(&self) -> Option<&T> {
        match self {
            ComponentOutcome::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ComponentOutcome::Completed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ComponentOutcome::Skipped { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            ComponentOutcome::Completed { .. } => "completed",
            ComponentOutcome::Skipped { .. } => "skipped",
            ComponentOutcome::Failed { .. } => "failed",
        }
    }
}

impl<T> From<Result<T, AnalysisError>> for ComponentOutcome<T> {
    fn from(result: Result<T, AnalysisError>) -> Self {
        match result {
            Ok(result) => ComponentOutcome::Completed { result },
            Err(err @ AnalysisError::MissingData(_)) => ComponentOutcome::Skipped {
                reason: err.to_string(),
            },
            Err(err) => ComponentOutcome::Failed {
                error: err.to_string(),
            },
        }
    }
}
