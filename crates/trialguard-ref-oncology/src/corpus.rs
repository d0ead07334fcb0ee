//! A static, keyword-filtered trial corpus implementing `TrialSource`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use trialguard_contracts::{error::TrialGuardResult, patient::PatientProfile};
use trialguard_core::traits::TrialSource;

use crate::mock_data::trial_corpus;

/// Serves trials whose `keywords` appear in any of the patient's conditions.
///
/// Matching is case-insensitive substring search. Entries are returned raw
/// and in corpus order; the batch size is the sanitizer's concern.
#[derive(Debug, Clone)]
pub struct StaticTrialCorpus {
    entries: Vec<Value>,
}

impl StaticTrialCorpus {
    pub fn new(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    /// The bundled oncology corpus.
    pub fn oncology() -> Self {
        Self::new(trial_corpus())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries relevant to `profile`.
    pub fn matching(&self, profile: &PatientProfile) -> Vec<Value> {
        let conditions: Vec<String> = profile.conditions.iter().map(|c| c.to_lowercase()).collect();
        self.entries
            .iter()
            .filter(|entry| {
                keywords(entry).any(|keyword| conditions.iter().any(|c| c.contains(&keyword)))
            })
            .cloned()
            .collect()
    }
}

fn keywords(entry: &Value) -> impl Iterator<Item = String> + '_ {
    entry["keywords"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|k| !k.trim().is_empty())
        .map(|k| k.trim().to_lowercase())
}

#[async_trait]
impl TrialSource for StaticTrialCorpus {
    async fn candidates(&self, profile: &PatientProfile) -> TrialGuardResult<Value> {
        let found = self.matching(profile);
        debug!(
            conditions = ?profile.conditions,
            candidates = found.len(),
            corpus = self.entries.len(),
            "corpus search"
        );
        Ok(Value::Array(found))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use trialguard_verify::{normalize_trials, validate_trials};

    use super::*;

    fn patient(condition: &str) -> PatientProfile {
        PatientProfile {
            conditions: vec![condition.to_string()],
            ..PatientProfile::default()
        }
    }

    #[test]
    fn test_keyword_filter() {
        let corpus = StaticTrialCorpus::oncology();
        assert_eq!(corpus.len(), 9);
        assert_eq!(corpus.matching(&patient("Metastatic Breast Cancer")).len(), 3);
        assert_eq!(corpus.matching(&patient("Non-small cell lung cancer")).len(), 2);
        assert_eq!(corpus.matching(&patient("NSCLC")).len(), 2);
        assert_eq!(corpus.matching(&patient("colorectal adenocarcinoma")).len(), 3);
        assert!(corpus.matching(&patient("glioblastoma")).is_empty());
        assert!(corpus.matching(&PatientProfile::default()).is_empty());
    }

    #[test]
    fn test_entry_without_keywords_never_matches() {
        let corpus = StaticTrialCorpus::new(vec![json!({ "identifier": "NCT01234567" })]);
        assert!(corpus.matching(&patient("breast cancer")).is_empty());
    }

    /// The breast slice is a complete, valid batch once normalized.
    #[tokio::test]
    async fn test_breast_candidates_form_a_valid_batch() {
        let raw = StaticTrialCorpus::oncology()
            .candidates(&patient("metastatic breast cancer"))
            .await
            .unwrap();
        let trials = normalize_trials(&raw);
        assert_eq!(trials.len(), 3);
        assert_eq!(trials[2].identifier, "NCT05234518");
        assert_eq!(trials[2].match_score, 55);
        let result = validate_trials(&trials);
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    /// The melanoma record needs every repair the normalizer has.
    #[tokio::test]
    async fn test_untidy_record_is_repaired() {
        let raw = StaticTrialCorpus::oncology()
            .candidates(&patient("melanoma"))
            .await
            .unwrap();
        let trials = normalize_trials(&raw);
        assert_eq!(trials.len(), 3);

        let melanoma = &trials[0];
        assert_ne!(melanoma.identifier, "NCT-0588-1234");
        assert!(melanoma.identifier.starts_with("NCT") && melanoma.identifier.len() == 11);
        assert_eq!(melanoma.title, "Adjuvant Neoantigen Vaccine in Resected Melanoma");
        assert_eq!(melanoma.match_score, 100);
        assert!(melanoma.inclusion_criteria.is_empty());
        assert_eq!(melanoma.exclusion_criteria, vec!["Uveal melanoma".to_string()]);

        let result = validate_trials(&trials);
        assert!(!result.is_valid());
    }
}
