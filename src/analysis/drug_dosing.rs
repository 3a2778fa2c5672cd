// ==============================================================================
// drug_dosing.rs - Genotype-Guided Dosing Recommendations
// ==============================================================================
// Description: Maps pharmacogene statuses to drug-specific dosing actions
//              drawn from CPIC and DPWG guidelines
// Author: Matt Barham
// Created: 2026-01-22
// Modified: 2026-02-09
// Version: 1.0.0
// ==============================================================================

use super::epistasis::StatusBoard;
use super::lifestyle::LifestyleResult;
use super::pharmacogenes::PharmacogeneResult;
use super::AnalysisError;
use serde::Serialize;
use tracing::info;

/// Words in an action that promote it to a critical warning
const CRITICAL_MARKERS: [&str; 4] = ["CONTRAINDICATED", "FATAL", "AVOID", "LIFE-THREATENING"];

/// Fires when `gene` carries any of `statuses`
struct DosingRule {
    gene: &'static str,
    statuses: &'static [&'static str],
    action: &'static str,
    dose_guidance: &'static str,
}

struct DrugGuideline {
    drug: &'static str,
    category: &'static str,
    genes: &'static [&'static str],
    rules: &'static [DosingRule],
    source: &'static str,
}

const GUIDELINES: [DrugGuideline; 9] = [
    DrugGuideline {
        drug: "Warfarin",
        category: "anticoagulant",
        genes: &["CYP2C9", "VKORC1"],
        rules: &[
            DosingRule {
                gene: "CYP2C9",
                statuses: &["intermediate", "poor"],
                action: "Reduce warfarin starting dose by 25-50%. Reduced CYP2C9 clearance increases bleeding risk.",
                dose_guidance: "Consider starting at 2-3 mg/day instead of the standard 5 mg/day.",
            },
            DosingRule {
                gene: "VKORC1",
                statuses: &["sensitive", "highly_sensitive"],
                action: "VKORC1 sensitivity detected; warfarin target dose likely 1-3 mg/day. Requires careful INR monitoring.",
                dose_guidance: "Start low (1-2 mg/day) and titrate to INR 2.0-3.0.",
            },
        ],
        source: "CPIC Guideline for Warfarin (Johnson et al. 2017, PMID: 28198005)",
    },
    DrugGuideline {
        drug: "Clopidogrel",
        category: "antiplatelet",
        genes: &["CYP2C19"],
        rules: &[
            DosingRule {
                gene: "CYP2C19",
                statuses: &["poor", "intermediate"],
                action: "Reduced CYP2C19 function; clopidogrel may not be adequately activated. Consider prasugrel or ticagrelor.",
                dose_guidance: "Avoid clopidogrel if possible. Use prasugrel 10 mg or ticagrelor 90 mg twice daily.",
            },
            DosingRule {
                gene: "CYP2C19",
                statuses: &["ultrarapid"],
                action: "Ultrarapid CYP2C19; standard clopidogrel dosing is appropriate.",
                dose_guidance: "Standard 75 mg/day.",
            },
        ],
        source: "CPIC Guideline for Clopidogrel (Scott et al. 2013, PMID: 23698643)",
    },
    DrugGuideline {
        drug: "Codeine",
        category: "analgesic",
        genes: &["CYP2D6"],
        rules: &[
            DosingRule {
                gene: "CYP2D6",
                statuses: &["poor"],
                action: "CYP2D6 poor metabolizer; codeine is not converted to morphine and gives no analgesia. AVOID codeine.",
                dose_guidance: "Use non-opioid analgesics or morphine/oxycodone at standard doses.",
            },
            DosingRule {
                gene: "CYP2D6",
                statuses: &["ultrarapid"],
                action: "CYP2D6 ultrarapid metabolizer; codeine is converted to morphine too rapidly, risking respiratory depression. AVOID codeine.",
                dose_guidance: "CONTRAINDICATED. Use non-opioid alternatives or reduced-dose morphine with monitoring.",
            },
            DosingRule {
                gene: "CYP2D6",
                statuses: &["intermediate"],
                action: "CYP2D6 intermediate metabolizer; reduced codeine activation may give suboptimal pain relief.",
                dose_guidance: "Consider alternative analgesics if standard doses are inadequate.",
            },
        ],
        source: "CPIC Guideline for Codeine (Crews et al. 2014, PMID: 24458010)",
    },
    DrugGuideline {
        drug: "Simvastatin",
        category: "statin",
        genes: &["SLCO1B1"],
        rules: &[DosingRule {
            gene: "SLCO1B1",
            statuses: &["intermediate", "poor"],
            action: "SLCO1B1 decreased function; simvastatin myopathy risk is elevated 5-17x. Limit the dose or switch statin.",
            dose_guidance: "Use simvastatin at most 20 mg/day, or switch to rosuvastatin or pravastatin.",
        }],
        source: "CPIC Guideline for Simvastatin (Ramsey et al. 2014, PMID: 24918167)",
    },
    DrugGuideline {
        drug: "Fluoropyrimidines",
        category: "chemotherapy",
        genes: &["DPYD"],
        rules: &[
            DosingRule {
                gene: "DPYD",
                statuses: &["poor"],
                action: "DPYD deficient; fluoropyrimidine chemotherapy (5-FU, capecitabine) can be FATAL.",
                dose_guidance: "CONTRAINDICATED at full dose. Without an alternative, start at 25% or less with intensive monitoring.",
            },
            DosingRule {
                gene: "DPYD",
                statuses: &["intermediate"],
                action: "DPYD intermediate metabolizer; start fluoropyrimidines at a 50% reduced dose.",
                dose_guidance: "Start at 50% dose and escalate in later cycles if tolerated.",
            },
        ],
        source: "CPIC Guideline for Fluoropyrimidines (Amstutz et al. 2018, PMID: 29152729)",
    },
    DrugGuideline {
        drug: "Thiopurines",
        category: "immunosuppressant",
        genes: &["TPMT"],
        rules: &[
            DosingRule {
                gene: "TPMT",
                statuses: &["poor"],
                action: "TPMT deficient; standard thiopurine doses cause LIFE-THREATENING myelosuppression.",
                dose_guidance: "Reduce to 10% of the standard dose (azathioprine 0.5 mg/kg/day).",
            },
            DosingRule {
                gene: "TPMT",
                statuses: &["intermediate"],
                action: "TPMT intermediate metabolizer; reduce the thiopurine starting dose by 30-50%.",
                dose_guidance: "Start at 50% dose and monitor CBC weekly for the first month.",
            },
        ],
        source: "CPIC Guideline for Thiopurines (Relling et al. 2019, PMID: 30447069)",
    },
    DrugGuideline {
        drug: "Tacrolimus",
        category: "immunosuppressant",
        genes: &["CYP3A5"],
        rules: &[
            DosingRule {
                gene: "CYP3A5",
                statuses: &["normal"],
                action: "CYP3A5 expresser; standard tacrolimus dosing may be subtherapeutic.",
                dose_guidance: "Start at 0.3 mg/kg/day (1.5-2x standard) and monitor trough levels.",
            },
            DosingRule {
                gene: "CYP3A5",
                statuses: &["intermediate", "poor"],
                action: "CYP3A5 non-expresser; standard tacrolimus dosing is appropriate.",
                dose_guidance: "Start at 0.15 mg/kg/day and monitor trough levels per protocol.",
            },
        ],
        source: "CPIC Guideline for Tacrolimus (Birdwell et al. 2015, PMID: 25801146)",
    },
    DrugGuideline {
        drug: "Isoniazid",
        category: "antibiotic",
        genes: &["NAT2"],
        rules: &[DosingRule {
            gene: "NAT2",
            statuses: &["poor", "intermediate", "slow"],
            action: "NAT2 slow acetylator; higher risk of isoniazid hepatotoxicity and neuropathy. Supplement with pyridoxine.",
            dose_guidance: "Standard dose plus pyridoxine 25-50 mg/day. Monitor liver function.",
        }],
        source: "DPWG Guideline for Isoniazid (Swen et al. 2011, PMID: 21412232)",
    },
    DrugGuideline {
        drug: "Caffeine",
        category: "dietary",
        genes: &["CYP1A2"],
        rules: &[
            DosingRule {
                gene: "CYP1A2",
                statuses: &["poor", "intermediate", "slow"],
                action: "CYP1A2 slow metabolizer; caffeine stays active longer. Limit intake to the morning.",
                dose_guidance: "At most 200 mg caffeine/day, none after noon.",
            },
            DosingRule {
                gene: "CYP1A2",
                statuses: &["normal", "rapid", "ultrarapid", "fast"],
                action: "CYP1A2 normal or rapid metabolizer; standard caffeine clearance.",
                dose_guidance: "Up to 400 mg caffeine/day is generally safe.",
            },
        ],
        source: "Cornelis et al. 2006, JAMA (PMID: 16522833)",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosingRecommendation {
    pub drug: String,
    pub category: String,
    pub genes: Vec<String>,
    /// Status that triggered the recommendation
    pub trigger: String,
    pub action: String,
    pub dose_guidance: String,
    pub source: String,
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrugDosingResult {
    /// Guideline order, then rule order within a drug
    pub recommendations: Vec<DosingRecommendation>,
    /// Drugs with a critical recommendation
    pub critical_drugs: Vec<String>,
    pub summary: String,
}

fn is_critical(rule: &DosingRule) -> bool {
    let action = rule.action.to_uppercase();
    CRITICAL_MARKERS.iter().any(|word| action.contains(word))
}

/// Recommendations for every drug with status data on at least one of its genes
pub fn recommend(board: &StatusBoard) -> DrugDosingResult {
    let mut recommendations = Vec::new();

    for guideline in GUIDELINES.iter().filter(|g| g.genes.iter().any(|gene| board.has_data(gene))) {
        for rule in guideline.rules {
            let Some(status) = board.get(rule.gene) else {
                continue;
            };
            let Some(trigger) = rule.statuses.iter().find(|s| status.statuses.contains(**s)) else {
                continue;
            };
            recommendations.push(DosingRecommendation {
                drug: guideline.drug.to_string(),
                category: guideline.category.to_string(),
                genes: guideline.genes.iter().map(|g| g.to_string()).collect(),
                trigger: format!("{} {}", rule.gene, trigger),
                action: rule.action.to_string(),
                dose_guidance: rule.dose_guidance.to_string(),
                source: guideline.source.to_string(),
                critical: is_critical(rule),
            });
        }
    }

    let mut critical_drugs: Vec<String> = Vec::new();
    for rec in recommendations.iter().filter(|r| r.critical) {
        if !critical_drugs.contains(&rec.drug) {
            critical_drugs.push(rec.drug.clone());
        }
    }
    let critical_count = recommendations.iter().filter(|r| r.critical).count();

    let summary = if board.is_empty() {
        "No pharmacogenomic data available for drug dosing.".to_string()
    } else if critical_count > 0 {
        format!(
            "{} drug dosing recommendations, including {} critical warning(s).",
            recommendations.len(),
            critical_count
        )
    } else if !recommendations.is_empty() {
        format!("{} drug dosing recommendations based on the pharmacogenomic profile.", recommendations.len())
    } else {
        "No drug dosing adjustments needed based on available pharmacogenomic data.".to_string()
    };

    info!(
        "Drug dosing: {} recommendations ({} critical)",
        recommendations.len(),
        critical_count
    );

    DrugDosingResult {
        recommendations,
        critical_drugs,
        summary,
    }
}

pub fn run(
    lifestyle: Option<&LifestyleResult>,
    pharmacogenes: Option<&PharmacogeneResult>,
) -> Result<DrugDosingResult, AnalysisError> {
    if lifestyle.is_none() && pharmacogenes.is_none() {
        return Err(AnalysisError::MissingData(
            "pharmacogene and lifestyle statuses".to_string(),
        ));
    }
    let board = StatusBoard::collect(lifestyle, pharmacogenes, None);
    Ok(recommend(&board))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(statuses: &[(&str, &str)]) -> StatusBoard {
        let mut board = StatusBoard::default();
        for (gene, status) in statuses {
            board.insert(gene, status.to_string(), 3);
        }
        board
    }

    #[test]
    fn test_warfarin_fires_both_gene_rules() {
        let result = recommend(&board(&[("CYP2C9", "intermediate"), ("VKORC1", "highly_sensitive")]));

        let warfarin: Vec<&DosingRecommendation> = result.recommendations.iter().filter(|r| r.drug == "Warfarin").collect();
        assert_eq!(warfarin.len(), 2);
        assert_eq!(warfarin[0].trigger, "CYP2C9 intermediate");
        assert_eq!(warfarin[1].trigger, "VKORC1 highly_sensitive");
        assert!(warfarin.iter().all(|r| !r.critical));
    }

    #[test]
    fn test_ultrarapid_codeine_is_critical() {
        let result = recommend(&board(&[("CYP2D6", "ultrarapid")]));

        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].critical);
        assert_eq!(result.critical_drugs, vec!["Codeine".to_string()]);
        assert!(result.summary.contains("1 critical"));
    }

    #[test]
    fn test_normal_status_without_rule_gives_no_adjustment() {
        let result = recommend(&board(&[("CYP2C19", "normal")]));
        assert!(result.recommendations.is_empty());
        assert!(result.summary.starts_with("No drug dosing adjustments"));
    }

    #[test]
    fn test_lifestyle_only_gene_is_used() {
        let result = recommend(&board(&[("CYP1A2", "slow"), ("SLCO1B1", "poor")]));
        let drugs: Vec<&str> = result.recommendations.iter().map(|r| r.drug.as_str()).collect();
        assert_eq!(drugs, vec!["Simvastatin", "Caffeine"]);
    }

    #[test]
    fn test_empty_board_summary() {
        let result = recommend(&StatusBoard::default());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.summary, "No pharmacogenomic data available for drug dosing.");
    }
}
