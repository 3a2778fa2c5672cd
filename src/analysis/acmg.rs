// ==============================================================================
// acmg.rs - ACMG Secondary Findings Screen
// ==============================================================================
// Description: Flags pathogenic findings in ACMG SF v3.2 actionable genes
// Author: Matt Barham
// Created: 2025-12-18
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================

use super::disease::DiseaseFinding;
use serde::Serialize;
use std::collections::BTreeSet;

/// ACMG SF v3.2 gene list
pub const ACMG_SF_GENES: [&str; 81] = [
    // Hereditary cancer
    "BRCA1", "BRCA2", "TP53", "MLH1", "MSH2", "MSH6", "PMS2", "APC", "MUTYH", "RB1", "MEN1", "RET", "VHL",
    "SDHB", "SDHD", "PTEN", "STK11", "BMPR1A", "SMAD4", "CDH1", "PALB2", "ATM", "CHEK2", "BAP1", "DICER1",
    "HOXB13", "FLCN", "MET", "MITF", "NTHL1", "MAX", "SDHA", "SDHAF2", "SDHC", "TMEM127", "NF2",
    // Cardiovascular
    "LDLR", "APOB", "PCSK9", "MYBPC3", "MYH7", "SCN5A", "KCNQ1", "KCNH2", "LMNA", "RYR1", "RYR2", "CACNA1S",
    "PKP2", "DSP", "DSG2", "DSC2", "TMEM43", "TTN", "ACTA2", "FBN1", "TGFBR1", "TGFBR2", "MYH11", "COL3A1",
    "SMAD3", "ACVRL1", "ENG", "TRDN", "CASQ2",
    // Metabolic / other
    "GLA", "BTD", "OTC", "ATP7B", "HFE", "SERPINA1", "HBB", "GAA", "HEXA", "HEXB", "SMPD1", "RPE65", "HNF1A",
    // Tumor predisposition
    "TSC1", "TSC2", "WT1",
];

const DEFAULT_ACTIONABILITY: &str = "Medically actionable: consult a genetic counselor";

pub fn is_actionable_gene(gene: &str) -> bool {
    let upper = gene.trim().to_ascii_uppercase();
    ACMG_SF_GENES.contains(&upper.as_str())
}

/// Recommended follow-up for an actionable gene
pub fn actionability(gene: &str) -> &'static str {
    match gene.trim().to_ascii_uppercase().as_str() {
        "BRCA1" | "BRCA2" => "Hereditary breast/ovarian cancer: increased surveillance, risk-reducing surgery options",
        "TP53" => "Li-Fraumeni syndrome: whole-body MRI, multi-cancer surveillance",
        "MLH1" | "MSH2" | "MSH6" | "PMS2" => "Lynch syndrome: colonoscopy every 1-2 years from age 25",
        "LDLR" | "APOB" | "PCSK9" => "Familial hypercholesterolemia: early statin therapy, lipid monitoring",
        "MYBPC3" | "MYH7" => "Hypertrophic cardiomyopathy: echocardiography, activity modification",
        "SCN5A" => "Brugada/Long QT: ECG monitoring, avoid triggering drugs",
        "KCNQ1" | "KCNH2" => "Long QT syndrome: ECG monitoring, avoid QT-prolonging drugs",
        "RYR1" => "Malignant hyperthermia susceptibility: avoid triggering anesthetics",
        "FBN1" => "Marfan syndrome: aortic imaging, activity modification",
        "HFE" => "Hereditary hemochromatosis: iron/ferritin monitoring, phlebotomy",
        "SERPINA1" => "Alpha-1 antitrypsin deficiency: avoid smoking, pulmonary function monitoring",
        "HBB" => "Sickle cell/beta-thalassemia: hematology follow-up",
        "GLA" => "Fabry disease: enzyme replacement therapy available",
        "ATP7B" => "Wilson disease: copper studies, chelation therapy",
        "APC" => "Familial adenomatous polyposis: colonoscopy from early teens",
        "RET" => "MEN2: thyroid cancer screening, prophylactic thyroidectomy consideration",
        "VHL" => "Von Hippel-Lindau: multi-organ surveillance",
        "RB1" => "Retinoblastoma: ophthalmologic screening",
        "PTEN" => "PTEN hamartoma tumor syndrome: multi-cancer surveillance",
        "PKP2" => "Arrhythmogenic cardiomyopathy: cardiac imaging, activity restriction",
        "LMNA" => "Dilated cardiomyopathy/muscular dystrophy: cardiac monitoring",
        "BTD" => "Biotinidase deficiency: biotin supplementation",
        "OTC" => "Ornithine transcarbamylase deficiency: dietary management, emergency protocol",
        "GAA" => "Pompe disease: enzyme replacement therapy",
        "RPE65" => "Retinal dystrophy: gene therapy available",
        _ => DEFAULT_ACTIONABILITY,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcmgFinding {
    pub gene: String,
    pub variant_id: Option<String>,
    pub condition: String,
    pub classification: String,
    pub review_confidence: u8,
    pub actionability: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcmgReport {
    pub findings: Vec<AcmgFinding>,
    pub genes_screened: usize,
    pub genes_with_variants: usize,
    pub summary: String,
}

/// Collect flagged disease findings, strongest review first
pub fn screen(findings: &[DiseaseFinding]) -> AcmgReport {
    let mut flagged: Vec<AcmgFinding> = findings
        .iter()
        .filter(|f| f.acmg_actionable)
        .map(|f| AcmgFinding {
            gene: f.gene.clone(),
            variant_id: f.variant_id.clone(),
            condition: f.condition.clone(),
            classification: f.classification.as_str().to_string(),
            review_confidence: f.review_confidence,
            actionability: actionability(&f.gene).to_string(),
        })
        .collect();

    flagged.sort_by(|a, b| {
        b.review_confidence
            .cmp(&a.review_confidence)
            .then_with(|| a.gene.cmp(&b.gene))
    });

    let genes: BTreeSet<&str> = flagged.iter().map(|f| f.gene.as_str()).collect();
    let summary = if flagged.is_empty() {
        "No pathogenic/likely pathogenic variants in ACMG SF v3.2 genes.".to_string()
    } else {
        format!(
            "{} variant(s) found in {} ACMG-recommended gene(s). Genetic counseling recommended.",
            flagged.len(),
            genes.len()
        )
    };

    AcmgReport {
        genes_with_variants: genes.len(),
        findings: flagged,
        genes_screened: ACMG_SF_GENES.len(),
        summary,
    }
}
