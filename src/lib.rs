// ==============================================================================
// lib.rs - Genetics Interpreter Library
// ==============================================================================
// Description: Library interface for genotype interpretation and inference
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================

pub mod analysis;
pub mod genotype_converter;
pub mod models;
pub mod output;
pub mod parsers;
pub mod processor;
pub mod provenance;
pub mod reference_data;
pub mod validator;
