//! Structural JSON Schema checks over raw model payloads.
//!
//! These run before normalization and never block anything: the normalizer
//! repairs every shape problem anyway. Their job is to leave an operator a
//! precise record of what the model actually returned.

use serde_json::{json, Value};
use tracing::warn;

use trialguard_contracts::{
    error::{TrialGuardError, TrialGuardResult},
    validation::Correction,
};

/// Which payload a schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Profile,
    TrialBatch,
    MatchResult,
}

impl Shape {
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Profile => "profile",
            Shape::TrialBatch => "trial-batch",
            Shape::MatchResult => "match-result",
        }
    }

    fn schema(self) -> Value {
        let string_list = json!({ "type": "array", "items": { "type": "string" } });
        match self {
            Shape::Profile => json!({
                "type": "object",
                "required": ["age", "conditions"],
                "properties": {
                    "age": { "type": "integer", "minimum": 0, "maximum": 120 },
                    "gender": { "type": "string", "enum": ["male", "female", "other", "unknown"] },
                    "conditions": string_list,
                    "medications": string_list,
                    "allergies": string_list,
                    "biomarkers": { "type": "object", "additionalProperties": { "type": "string" } },
                    "stage": { "type": ["string", "null"] },
                    "priorTreatments": string_list,
                    "performanceStatus": { "type": ["string", "null"] },
                    "labValues": { "type": "object" }
                }
            }),
            Shape::TrialBatch => json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "required": [
                        "identifier", "title", "phase", "summary",
                        "inclusionCriteria", "exclusionCriteria", "matchType", "matchScore"
                    ],
                    "properties": {
                        "identifier": { "type": "string", "pattern": "^NCT[0-9]{8}$" },
                        "title": { "type": "string", "minLength": 1 },
                        "phase": { "type": "string", "enum": ["Phase 1", "Phase 2", "Phase 3"] },
                        "summary": { "type": "string", "minLength": 1 },
                        "inclusionCriteria": string_list,
                        "exclusionCriteria": string_list,
                        "matchType": { "type": "string", "enum": ["perfect", "excluded", "uncertain"] },
                        "matchScore": { "type": "integer", "minimum": 0, "maximum": 100 }
                    }
                }
            }),
            Shape::MatchResult => json!({
                "type": "object",
                "required": ["matchScore", "confidenceLevel", "explanation"],
                "properties": {
                    "matchScore": { "type": "integer", "minimum": 0, "maximum": 100 },
                    "confidenceLevel": { "type": "string", "enum": ["high", "medium", "low"] },
                    "inclusionMatches": string_list,
                    "exclusionFlags": string_list,
                    "uncertainFactors": string_list,
                    "explanation": { "type": "string" },
                    "questionsToAsk": string_list
                }
            }),
        }
    }
}

/// Compile `schema`, reporting a malformed document as
/// `TrialGuardError::SchemaValidation` labelled with `shape`.
fn compile(schema: &Value, shape: Shape) -> TrialGuardResult<jsonschema::Validator> {
    jsonschema::validator_for(schema).map_err(|e| TrialGuardError::SchemaValidation {
        reason: format!("{} schema does not compile: {e}", shape.as_str()),
    })
}

/// Check `raw` against the schema for `shape`, returning one non-blocking
/// correction per violation and logging each one.
pub fn diagnose(raw: &Value, shape: Shape) -> Vec<Correction> {
    let validator = match compile(&shape.schema(), shape) {
        Ok(v) => v,
        Err(e) => {
            warn!(shape = shape.as_str(), error = %e, "schema compilation failure");
            return Vec::new();
        }
    };

    validator
        .iter_errors(raw)
        .map(|error| {
            let path = error.instance_path.to_string();
            let field = if path.is_empty() { "$".to_string() } else { path };
            let message = error.to_string();
            warn!(
                shape = shape.as_str(),
                field = %field,
                %message,
                "payload shape mismatch"
            );
            Correction::new(
                field,
                crate::coerce::render(Some(&*error.instance)),
                "repaired by normalizer",
                format!("shape mismatch: {message}"),
            )
        })
        .collect()
}
