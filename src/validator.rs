// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Pre-load checks on raw genotype files (size, type, format)
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-02-09
// Version: 2.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::parsers::open_text;

const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024; // 500 MB
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// Data lines inspected when sniffing the format
const SNIFF_LINES: usize = 5;

#[derive(Debug, Clone)]
pub struct ValidatedFile {
    pub file_name: String,
    pub extension: String,
    pub size: u64,
    pub compressed: bool,
    pub hash_sha256: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

pub struct FileValidator {
    max_file_size: u64,
    allowed_types: HashMap<&'static str, &'static [u8]>,
}

impl FileValidator {
    pub fn new() -> Self {
        let mut allowed_types: HashMap<&'static str, &'static [u8]> = HashMap::new();

        // 23andMe-style raw text (no magic number)
        allowed_types.insert("txt", &[]);
        allowed_types.insert("tsv", &[]);
        allowed_types.insert("csv", &[]);

        // Gzip-compressed raw text
        allowed_types.insert("txt.gz", &GZIP_MAGIC);

        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_types,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Validate a genome file before loading
    ///
    /// # Arguments
    /// * `file_path` - Raw genotype file
    ///
    /// # Returns
    /// * `Ok(ValidatedFile)` - Metadata and SHA-256 of the accepted file
    /// * `Err` - Too large, disallowed extension, bad magic or bad format
    pub fn validate(&self, file_path: &Path) -> Result<ValidatedFile> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path"))?
            .to_string_lossy()
            .to_string();

        info!("Validating file: {}", file_name);

        // 1. Size check
        let metadata = std::fs::metadata(file_path)
            .with_context(|| format!("Failed to get metadata for {}", file_path.display()))?;
        if metadata.len() > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                metadata.len(),
                self.max_file_size
            );
        }
        debug!("Size check passed: {} bytes", metadata.len());

        // 2. Extension check (allowlist)
        let ext = self.get_extension(&file_name)?;
        let expected_magic = self
            .allowed_types
            .get(ext.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file type: {}", ext))?;
        debug!("Extension check passed: {}", ext);

        // 3. Magic number verification
        if !expected_magic.is_empty() {
            let actual_magic = self.read_magic_number(file_path)?;
            if !self.verify_magic_number(expected_magic, &actual_magic) {
                anyhow::bail!("Magic number mismatch for .{} file", ext);
            }
            debug!("Magic number check passed");
        }

        // 4. Content validation (format sniff)
        self.validate_genotype_format(file_path)?;
        debug!("Content validation passed");

        // 5. SHA-256 fingerprint
        let hash = compute_sha256(file_path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedFile {
            file_name,
            compressed: !expected_magic.is_empty(),
            extension: ext,
            size: metadata.len(),
            hash_sha256: hash,
            validated_at: chrono::Utc::now(),
        })
    }

    fn get_extension(&self, filename: &str) -> Result<String> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".txt.gz") {
            return Ok("txt.gz".to_string());
        }

        lower
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .ok_or_else(|| anyhow::anyhow!("No file extension found"))
    }

    fn read_magic_number(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; 4];
        let n = file.read(&mut buffer)?;
        buffer.truncate(n);
        Ok(buffer)
    }

    fn verify_magic_number(&self, expected: &[u8], actual: &[u8]) -> bool {
        expected.len() <= actual.len() && expected.iter().zip(actual.iter()).all(|(e, a)| e == a)
    }

    /// First data lines must be `rsid<TAB>chromosome<TAB>position<TAB>genotype`
    fn validate_genotype_format(&self, path: &Path) -> Result<()> {
        let reader = open_text(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut checked = 0;

        for line in reader.lines() {
            let line = line.context("Failed to read genome file")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let columns: Vec<&str> = trimmed.split('\t').collect();
            if columns.len() != 4 {
                anyhow::bail!(
                    "Invalid genotype format: expected 4 tab-separated columns, found {}",
                    columns.len()
                );
            }
            if columns[2].trim().parse::<u64>().is_err() {
                anyhow::bail!("Invalid genotype format: position '{}' is not a number", columns[2]);
            }

            checked += 1;
            if checked >= SNIFF_LINES {
                break;
            }
        }

        if checked == 0 {
            anyhow::bail!("File contains no genotype data lines");
        }
        Ok(())
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex SHA-256 of the file bytes
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
