//! Deterministic guardrail over model-produced match results.
//!
//! The engine re-derives hard exclusions from the patient profile and the
//! trial's exclusion criteria, independently of what the model claimed, and
//! may only move a result toward exclusion and caution:
//!
//! 1. A hard exclusion the model did not flag forces an override: the score
//!    is capped at the ceiling, confidence becomes `high`, the flags are
//!    appended, and the explanation is rewritten to name the criterion.
//! 2. Hard exclusions the model already flagged are merged in and the
//!    model's explanation is kept. The cap and `high` confidence still apply.
//! 3. Otherwise the result passes through untouched.
//!
//! Only confirmed patient values count. An unknown or ambiguous biomarker,
//! or a missing ECOG, never produces a hard exclusion.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use trialguard_contracts::{
    assessment::{ConfidenceLevel, GuardrailOutcome, MatchResult},
    patient::PatientProfile,
    trial::TrialRecord,
};
use trialguard_core::traits::Guardrail;
use trialguard_policy::GuardrailLimits;

use crate::markers::{mentions, patient_polarity};

/// Phrasing that marks a criterion as describing who is excluded.
static EXCLUSION_CUES: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)\b(?:exclud\w*|ineligible|not\s+eligible|not\s+allowed|not\s+permitted|must\s+not|may\s+not|cannot|known|history\s+of|patients\s+with|presence\s+of)\b",
    )
});

/// Phrasing that marks a criterion as stating the status the trial requires.
static REQUIREMENT_CUES: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(?:must|required|requires|only|eligible\s+if|limited\s+to|restricted\s+to|mandatory)\b")
});

/// A hard exclusion derived from the profile and one criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// The exclusion criterion, verbatim.
    pub criterion: String,
    /// `"HER2"`, `"HR"`, `"ECOG"`, ...
    pub subject: String,
    /// Clinician-readable reason, used in the flag and the explanation.
    pub reason: String,
}

impl Finding {
    pub fn flag(&self) -> String {
        format!("Hard exclusion: {}", self.reason)
    }

    /// Words a model flag would use when it refers to the same subject.
    fn keywords(&self) -> Vec<String> {
        let words: &[&str] = match self.subject.as_str() {
            "HER2" => &["her2", "erbb2"],
            "ER" => &["er", "estrogen", "oestrogen"],
            "PR" => &["pr", "pgr", "progesterone"],
            "HR" => &["hr", "hormone"],
            "ECOG" => &["ecog", "performance"],
            _ => &[],
        };
        if words.is_empty() {
            vec![self.subject.to_lowercase()]
        } else {
            words.iter().map(|w| w.to_string()).collect()
        }
    }

    /// Whether any of the model's own flags already reports this exclusion.
    fn captured_by(&self, model_flags: &[String]) -> bool {
        let criterion = self.criterion.to_lowercase();
        let keywords = self.keywords();
        model_flags.iter().any(|flag| {
            let flag = flag.to_lowercase();
            flag.contains(&criterion)
                || (flag.len() >= 8 && criterion.contains(&flag))
                || flag
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .any(|word| keywords.iter().any(|k| k == word))
        })
    }
}

fn is_exclusion_phrased(criterion: &str) -> bool {
    EXCLUSION_CUES.is_match(criterion)
}

/// How an exclusion criterion relates to the marker status it names.
///
/// A listed criterion describes who is excluded, so a bare mention such as
/// "HER2-positive breast cancer" excludes that status. Only explicit
/// requirement wording ("Must be HER2-negative") without any exclusion
/// wording turns the mention into the required status.
fn states_requirement(criterion: &str) -> bool {
    REQUIREMENT_CUES.is_match(criterion) && !is_exclusion_phrased(criterion)
}

// ── Biomarker rule ────────────────────────────────────────────────────────────

fn recorded_status(profile: &PatientProfile, marker: &str) -> String {
    if marker == "HR" && profile.biomarker("HR").is_none() {
        return format!(
            "ER {}, PR {}",
            profile.biomarker("ER").unwrap_or("unrecorded"),
            profile.biomarker("PR").unwrap_or("unrecorded")
        );
    }
    profile.biomarker(marker).unwrap_or("unrecorded").to_string()
}

fn biomarker_finding(profile: &PatientProfile, criterion: &str) -> Option<Finding> {
    let keys: Vec<&str> = profile.biomarkers.keys().map(String::as_str).collect();
    let required = states_requirement(criterion);

    mentions(criterion, &keys).into_iter().find_map(|mention| {
        let patient = patient_polarity(profile, &mention.marker)?;
        let violated = if required {
            patient != mention.polarity
        } else {
            patient == mention.polarity
        };
        if !violated {
            return None;
        }

        let marker = mention.marker;
        let status = recorded_status(profile, &marker);
        let reason = if required {
            format!(
                "criterion \"{criterion}\" requires {marker}-{} but patient {marker} status is '{status}'",
                mention.polarity.as_str()
            )
        } else {
            format!("criterion \"{criterion}\" applies; patient {marker} status is '{status}'")
        };
        Some(Finding {
            criterion: criterion.to_string(),
            subject: marker,
            reason,
        })
    })
}

// ── ECOG rule ─────────────────────────────────────────────────────────────────

/// The ECOG values a criterion excludes, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EcogBand {
    lo: i64,
    hi: i64,
}

const ECOG_MAX: i64 = 5;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static ECOG_CMP: LazyLock<Regex> = LazyLock::new(|| regex(r"(>=|≥|=>|>|<=|≤|=<|<)\s*([0-5])\b"));
static ECOG_GE_WORDS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(?:greater than or equal to|at least)\s*([0-5])\b"));
static ECOG_GT_WORDS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(?:greater than|more than|above|over|exceeding)\s*([0-5])\b"));
static ECOG_LE_WORDS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(?:less than or equal to|no more than|at most|up to|not exceeding)\s*([0-5])\b"));
static ECOG_LT_WORDS: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(?:less than|below|under)\s*([0-5])\b"));
static ECOG_OR_MORE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b([0-5])\s*or\s*(?:more|greater|higher|above|worse)\b"));
static ECOG_OR_LESS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b([0-5])\s*or\s*(?:less|lower|below|better)\b"));
static ECOG_RANGE: LazyLock<Regex> = LazyLock::new(|| regex(r"\b([0-5])\s*(?:-|–|to)\s*([0-5])\b"));
static ECOG_PAIR: LazyLock<Regex> = LazyLock::new(|| regex(r"\b([0-5])\s*(?:or|,|/)\s*([0-5])\b"));
/// Where the ECOG clause ends: a semicolon, a conjunction that starts a new
/// condition, or a comma not followed by another score.
static CLAUSE_END: LazyLock<Regex> = LazyLock::new(|| regex(r";|\b(?:and|with|but|plus)\b|,\s*[^\s0-5]"));

fn digit(caps: &regex::Captures<'_>, group: usize) -> i64 {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(ECOG_MAX)
}

fn from_floor(n: i64) -> EcogBand {
    EcogBand { lo: n, hi: ECOG_MAX }
}

/// Read the ECOG values a criterion excludes.
///
/// `> n` excludes from n+1, `>= n` from n, `<= n` (an allowed ceiling) from
/// n+1, `< n` from n. A range `a-b` is the allowed band unless the criterion
/// is phrased as an exclusion, in which case the band itself is excluded.
fn ecog_band(criterion: &str, exclusionary: bool) -> Option<EcogBand> {
    let lower = criterion.to_lowercase();
    let start = lower.find("ecog").or_else(|| lower.find("performance status"))?;
    let rest = &lower[start..];
    let text = CLAUSE_END.find(rest).map_or(rest, |end| &rest[..end.start()]);

    if let Some(caps) = ECOG_CMP.captures(text) {
        let n = digit(&caps, 2);
        return Some(match &caps[1] {
            ">" => from_floor(n + 1),
            "<=" | "≤" | "=<" => from_floor(n + 1),
            _ => from_floor(n),
        });
    }
    if let Some(caps) = ECOG_GE_WORDS.captures(text) {
        return Some(from_floor(digit(&caps, 1)));
    }
    if let Some(caps) = ECOG_GT_WORDS.captures(text) {
        return Some(from_floor(digit(&caps, 1) + 1));
    }
    if let Some(caps) = ECOG_LE_WORDS.captures(text) {
        return Some(from_floor(digit(&caps, 1) + 1));
    }
    if let Some(caps) = ECOG_LT_WORDS.captures(text) {
        return Some(from_floor(digit(&caps, 1)));
    }
    if let Some(caps) = ECOG_OR_MORE.captures(text) {
        return Some(from_floor(digit(&caps, 1)));
    }
    if let Some(caps) = ECOG_OR_LESS.captures(text) {
        return Some(from_floor(digit(&caps, 1) + 1));
    }
    for re in [&*ECOG_RANGE, &*ECOG_PAIR] {
        if let Some(caps) = re.captures(text) {
            let (a, b) = (digit(&caps, 1), digit(&caps, 2));
            let (lo, hi) = (a.min(b), a.max(b));
            return Some(if exclusionary {
                EcogBand { lo, hi }
            } else {
                from_floor(hi + 1)
            });
        }
    }
    None
}

fn ecog_finding(profile: &PatientProfile, criterion: &str) -> Option<Finding> {
    let ecog = profile.ecog_value().filter(|n| (0..=ECOG_MAX).contains(n))?;
    let band = ecog_band(criterion, is_exclusion_phrased(criterion))?;
    if ecog < band.lo || ecog > band.hi {
        return None;
    }
    Some(Finding {
        criterion: criterion.to_string(),
        subject: "ECOG".to_string(),
        reason: format!(
            "criterion \"{criterion}\" excludes ECOG {}-{}; patient performance status is ECOG {ecog}",
            band.lo, band.hi
        ),
    })
}

/// Every hard exclusion the profile triggers on `trial`, at most one per
/// criterion.
pub fn hard_exclusions(profile: &PatientProfile, trial: &TrialRecord) -> Vec<Finding> {
    trial
        .exclusion_criteria
        .iter()
        .filter_map(|criterion| {
            biomarker_finding(profile, criterion).or_else(|| ecog_finding(profile, criterion))
        })
        .collect()
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// The guardrail engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardrailEngine {
    ceiling: u32,
}

impl GuardrailEngine {
    pub fn new(limits: &GuardrailLimits) -> Self {
        Self {
            ceiling: limits.exclusion_score_ceiling,
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }
}

impl Default for GuardrailEngine {
    fn default() -> Self {
        Self::new(&GuardrailLimits::default())
    }
}

fn synthesize_explanation(fresh: &[&Finding], capped: u32) -> String {
    let reasons: Vec<&str> = fresh.iter().map(|f| f.reason.as_str()).collect();
    format!(
        "Deterministic eligibility check found a hard exclusion the automated assessment missed: {}. \
         Score capped at {capped}; confirm with the trial team before considering enrollment.",
        reasons.join("; ")
    )
}

impl Guardrail for GuardrailEngine {
    fn apply(
        &self,
        profile: &PatientProfile,
        trial: &TrialRecord,
        proposed: &MatchResult,
    ) -> GuardrailOutcome {
        let findings = hard_exclusions(profile, trial);
        if findings.is_empty() {
            debug!(trial = %trial.identifier, "no hard exclusions; passing through");
            return GuardrailOutcome::pass_through(proposed.clone());
        }

        let fresh: Vec<&Finding> = findings
            .iter()
            .filter(|f| !f.captured_by(&proposed.exclusion_flags))
            .collect();

        let mut result = proposed.clone();
        for finding in &findings {
            let flag = finding.flag();
            if !result.exclusion_flags.contains(&flag) {
                result.exclusion_flags.push(flag);
            }
        }

        let capped = proposed.match_score.min(self.ceiling);
        let overridden = if fresh.is_empty() {
            capped != proposed.match_score || proposed.confidence_level != ConfidenceLevel::High
        } else {
            result.explanation = synthesize_explanation(&fresh, capped);
            for finding in &fresh {
                let question = format!("Can the patient's recorded {} be confirmed against source records?", finding.subject);
                if !result.questions_to_ask.contains(&question) {
                    result.questions_to_ask.push(question);
                }
            }
            true
        };
        result.match_score = capped;
        result.confidence_level = ConfidenceLevel::High;

        debug!(
            trial = %trial.identifier,
            findings = findings.len(),
            newly_detected = fresh.len(),
            from = proposed.match_score,
            to = capped,
            overridden,
            "guardrail evaluated"
        );

        GuardrailOutcome {
            result,
            overridden,
            flags: findings.iter().map(Finding::flag).collect(),
        }
    }
}

/// Apply the stock guardrail to one model-produced result.
pub fn apply_guardrails(profile: &PatientProfile, trial: &TrialRecord, ai_result: &MatchResult) -> GuardrailOutcome {
    GuardrailEngine::default().apply(profile, trial, ai_result)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
