//! Simulated oncology data for the trialguard reference runtime.
//!
//! All data in this module is hardcoded and fictional: the identifiers do not
//! refer to registered studies and the notes describe no real patient. It
//! stands in for a trial registry and a language model in a production
//! deployment.
//!
//! Some records are deliberately untidy (aliased keys, string scores,
//! lowercase identifiers) so the sanitizer has something to repair.

use serde_json::{json, Value};

// ── Trial corpus ──────────────────────────────────────────────────────────────

/// The reference trial corpus.
///
/// Each entry is raw trial JSON plus a `keywords` list the corpus filters on.
/// Keywords are not part of the trial record and are dropped by the
/// normalizer.
///
/// | Keywords            | Trials |
/// |---------------------|--------|
/// | breast              | 3      |
/// | lung, nsclc         | 2      |
/// | colorectal, colon   | 3      |
/// | melanoma            | 1      |
pub fn trial_corpus() -> Vec<Value> {
    vec![
        // ── Breast ──
        json!({
            "keywords": ["breast"],
            "identifier": "NCT05123401",
            "title": "Trastuzumab Deruxtecan After Progression in HER2-Positive Metastatic Breast Cancer",
            "phase": "Phase 3",
            "summary": "Compares trastuzumab deruxtecan with physician's choice chemotherapy after progression on a prior anti-HER2 regimen.",
            "inclusionCriteria": [
                "Age 18 years or older",
                "HER2-positive metastatic breast cancer (IHC 3+ or ISH amplified)",
                "Progression after at least one prior anti-HER2 regimen",
                "ECOG performance status 0-1"
            ],
            "exclusionCriteria": [
                "Known active brain metastases",
                "Left ventricular ejection fraction below 50%"
            ],
            "matchType": "perfect",
            "matchScore": 90
        }),
        json!({
            "keywords": ["breast"],
            "identifier": "NCT04987612",
            "title": "Sacituzumab Govitecan in Pretreated HER2-Negative Advanced Breast Cancer",
            "phase": "Phase 2",
            "summary": "Single-arm study of sacituzumab govitecan in advanced breast cancer after two or more systemic therapies.",
            "inclusionCriteria": [
                "Age 18 years or older",
                "Unresectable locally advanced or metastatic breast cancer",
                "At least two prior systemic therapies for advanced disease"
            ],
            "exclusionCriteria": [
                "Must be HER2-negative (IHC 0-1+ or ISH non-amplified)",
                "ECOG performance status of 2 or greater"
            ],
            "matchType": "excluded",
            "matchScore": 15
        }),
        json!({
            "keywords": ["breast"],
            "nctId": "nct05234518",
            "name": "CDK4/6 Inhibitor Maintenance in Hormone Receptor-Positive Breast Cancer",
            "phase": "phase II",
            "description": "Evaluates CDK4/6 inhibitor maintenance after first-line chemotherapy for advanced breast cancer.",
            "inclusion": [
                "Age 18 years or older",
                "HR-positive breast cancer",
                "Completed first-line chemotherapy without progression"
            ],
            "exclusion": [
                "Prior CDK4/6 inhibitor therapy",
                "QTc interval above 480 ms"
            ],
            "matchType": "Uncertain",
            "matchScore": "55"
        }),
        // ── Lung ──
        json!({
            "keywords": ["lung", "nsclc"],
            "identifier": "NCT05567843",
            "title": "Osimertinib Plus Platinum Chemotherapy in EGFR-Mutated Advanced NSCLC",
            "phase": "Phase 3",
            "summary": "Randomized comparison of first-line osimertinib with or without platinum-pemetrexed chemotherapy.",
            "inclusionCriteria": [
                "Age 18 years or older",
                "EGFR exon 19 deletion or L858R mutation",
                "Locally advanced or metastatic non-small cell lung cancer"
            ],
            "exclusionCriteria": [
                "Prior EGFR tyrosine kinase inhibitor therapy",
                "History of interstitial lung disease"
            ],
            "matchType": "perfect",
            "matchScore": 92
        }),
        json!({
            "keywords": ["lung", "nsclc"],
            "identifier": "NCT04765432",
            "title": "Consolidation Immunotherapy After Chemoradiation in Unresectable Stage III NSCLC",
            "phase": "Phase 2",
            "summary": "Durvalumab consolidation following concurrent chemoradiation in unresectable stage III disease.",
            "inclusionCriteria": [
                "Age 18 years or older",
                "Unresectable stage III non-small cell lung cancer",
                "Completed concurrent platinum-based chemoradiation"
            ],
            "exclusionCriteria": [
                "EGFR-mutated or ALK-positive tumors are excluded",
                "Grade 2 or higher pneumonitis during chemoradiation"
            ],
            "matchType": "uncertain",
            "matchScore": 60
        }),
        // ── Colorectal ──
        json!({
            "keywords": ["colorectal", "colon"],
            "identifier": "NCT05345621",
            "title": "Anti-EGFR Rechallenge in RAS Wild-Type Metastatic Colorectal Cancer",
            "phase": "Phase 2",
            "summary": "Panitumumab rechallenge guided by circulating tumor DNA in RAS wild-type disease.",
            "inclusionCriteria": [
                "Age 18 years or older",
                "RAS wild-type metastatic colorectal adenocarcinoma",
                "Prior oxaliplatin and irinotecan"
            ],
            "exclusionCriteria": [
                "KRAS mutated tumors are excluded",
                "Anti-EGFR therapy within the previous 4 months"
            ],
            "matchType": "perfect",
            "matchScore": 88
        }),
        json!({
            "keywords": ["colorectal", "colon"],
            "identifier": "NCT04876543",
            "title": "Checkpoint Blockade in Mismatch Repair Deficient Colorectal Cancer",
            "phase": "Phase 3",
            "summary": "First-line pembrolizumab in microsatellite instability-high or mismatch repair deficient disease.",
            "inclusionCriteria": [
                "Age 18 years or older",
                "MSI-high or dMMR colorectal cancer confirmed by local testing",
                "No prior systemic therapy for metastatic disease"
            ],
            "exclusionCriteria": [
                "Active autoimmune disease requiring systemic treatment",
                "Prior immune checkpoint inhibitor therapy"
            ],
            "matchType": "excluded",
            "matchScore": 12
        }),
        json!({
            "keywords": ["colorectal", "colon"],
            "identifier": "NCT05456732",
            "title": "Liver-Directed Therapy for Colorectal Liver Metastases",
            "phase": "Phase 2",
            "summary": "Hepatic arterial infusion added to systemic chemotherapy for liver-dominant metastatic disease.",
            "inclusionCriteria": [
                "Age 18 years or older",
                "Liver-dominant metastatic colorectal cancer",
                "Adequate hepatic function"
            ],
            "exclusionCriteria": [
                "Extrahepatic disease progression",
                "ECOG performance status greater than 1"
            ],
            "matchType": "uncertain",
            "matchScore": 58
        }),
        // ── Melanoma ──
        json!({
            "keywords": ["melanoma"],
            "nctId": "nct-0588-1234",
            "title": "  Adjuvant   Neoantigen Vaccine in Resected Melanoma ",
            "phase": "II/III",
            "summary": "Personalized neoantigen vaccine combined with anti-PD-1 therapy after complete resection.",
            "inclusionCriteria": "Resected stage III or IV melanoma",
            "exclusionCriteria": [
                { "criterion": "Uveal melanoma" },
                ""
            ],
            "matchType": "likely",
            "matchScore": 140
        }),
    ]
}

// ── Clinical notes ────────────────────────────────────────────────────────────

/// A metastatic HER2-positive breast cancer patient.
pub const NOTE_HER2_POSITIVE: &str = "52 year old woman with de novo metastatic breast cancer, stage IV, \
     bone and liver involvement. Core biopsy: HER2 3+ by IHC, ER negative, PR negative. Progressed after \
     docetaxel, trastuzumab and pertuzumab. ECOG 1. Currently on trastuzumab maintenance.";

/// An EGFR-mutated lung cancer patient.
pub const NOTE_EGFR_NSCLC: &str = "61 year old man, never smoker, with stage IIIB non-small cell lung cancer. \
     EGFR L858R mutation on tissue NGS; ALK and ROS1 negative. PD-L1 TPS 10%. ECOG 0.";

/// A colorectal cancer patient whose age was mistyped in the note.
pub const NOTE_COLORECTAL_AGE_TYPO: &str = "Patient is a 150 year old man (DOB transcribed incorrectly) with \
     metastatic colorectal adenocarcinoma, stage IV, liver-dominant disease. KRAS wild-type, NRAS wild-type, \
     microsatellite stable. Prior FOLFOX and FOLFIRI. ECOG 1.";

// ── Scripted model output ─────────────────────────────────────────────────────

/// Wrap a payload the way a chat model tends to answer: prose, then a
/// fenced JSON block.
pub fn fenced(lead: &str, payload: &Value) -> String {
    format!("{lead}\n\n```json\n{payload:#}\n```")
}

/// Extraction the model returns for [`NOTE_HER2_POSITIVE`].
pub fn her2_positive_profile() -> Value {
    json!({
        "age": 52,
        "gender": "F",
        "conditions": ["Metastatic breast cancer"],
        "medications": ["trastuzumab"],
        "biomarkers": { "HER2/neu": "3+", "ER": "negative", "PR": "negative" },
        "stage": "stage iv",
        "priorTreatments": ["docetaxel", "trastuzumab", "pertuzumab"],
        "performanceStatus": "ECOG 1"
    })
}

/// Extraction the model returns for [`NOTE_EGFR_NSCLC`].
pub fn egfr_nsclc_profile() -> Value {
    json!({
        "age": "61",
        "gender": "male",
        "conditions": ["Non-small cell lung cancer"],
        "biomarkers": [
            { "name": "EGFR", "status": "L858R mutation" },
            { "name": "ALK", "status": "negative" },
            { "name": "ROS1", "status": "negative" },
            { "name": "PD-L1", "status": "TPS 10%" }
        ],
        "stage": "IIIB",
        "performanceStatus": 0
    })
}

/// Extraction the model returns for [`NOTE_COLORECTAL_AGE_TYPO`].
pub fn colorectal_profile() -> Value {
    json!({
        "patient": {
            "age": 150,
            "gender": "male",
            "conditions": ["Metastatic colorectal adenocarcinoma"],
            "biomarkers": { "KRAS": "wild-type", "NRAS": "wild-type", "MSI": "stable" },
            "stage": "Stage IV",
            "priorTreatments": ["FOLFOX", "FOLFIRI"],
            "performanceStatus": "ECOG 1"
        }
    })
}

/// A per-trial assessment in the shape the model is asked for.
pub fn assessment(score: u32, confidence: &str, inclusion: &[&str], flags: &[&str], explanation: &str) -> Value {
    json!({
        "matchScore": score,
        "confidenceLevel": confidence,
        "inclusionMatches": inclusion,
        "exclusionFlags": flags,
        "uncertainFactors": [],
        "explanation": explanation,
        "questionsToAsk": []
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_corpus_keywords_are_present() {
        for entry in trial_corpus() {
            let keywords = entry["keywords"].as_array().expect("keywords");
            assert!(!keywords.is_empty());
        }
    }

    #[test]
    fn test_tidy_corpus_identifiers_are_unique() {
        let corpus = trial_corpus();
        let ids: BTreeSet<&str> = corpus.iter().filter_map(|e| e["identifier"].as_str()).collect();
        assert_eq!(ids.len(), 7);
    }

    #[test]
    fn test_fenced_payload_is_recoverable() {
        let text = fenced("Here is the profile.", &her2_positive_profile());
        let value = trialguard_core::response::extract_json(&text).unwrap();
        assert_eq!(value["age"], 52);
    }
}
