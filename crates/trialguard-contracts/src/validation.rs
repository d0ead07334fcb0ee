//! Validation reports and normalization corrections.

use serde::{Deserialize, Serialize};

/// The output of any validator.
///
/// `is_valid` is true exactly when `errors` is empty; warnings never affect
/// it. The fields are private so that invariant cannot be broken from the
/// outside, and the type is serialize-only for the same reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    /// An empty, valid result.
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Fold normalization corrections in: blocking ones become errors, the
    /// rest become warnings. Corrections are listed ahead of rule output.
    pub fn absorb(mut self, corrections: &[Correction]) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for c in corrections {
            if c.blocking {
                errors.push(c.describe());
            } else {
                warnings.push(c.describe());
            }
        }
        errors.append(&mut self.errors);
        warnings.append(&mut self.warnings);
        Self::from_parts(errors, warnings)
    }
}

/// A repair the normalizer applied to untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// Field path, e.g. `"age"` or `"trials[1].identifier"`.
    pub field: String,
    pub original: String,
    pub applied: String,
    /// Which rule the repair enforced.
    pub reason: String,
    /// Whether the repair hides a plausibility problem a reviewer must see.
    pub blocking: bool,
}

impl Correction {
    pub fn new(
        field: impl Into<String>,
        original: impl Into<String>,
        applied: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            original: original.into(),
            applied: applied.into(),
            reason: reason.into(),
            blocking: false,
        }
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn describe(&self) -> String {
        format!(
            "{}: {}; '{}' normalized to '{}'",
            self.field, self.reason, self.original, self.applied
        )
    }
}

/// A normalized value together with the repairs it took to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized<T> {
    pub value: T,
    pub corrections: Vec<Correction>,
}

impl<T> Normalized<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            corrections: Vec::new(),
        }
    }
}
