//! Biomarker vocabulary shared by the profile validator and the guardrail.

use std::sync::LazyLock;

use regex::Regex;

use trialguard_contracts::patient::PatientProfile;

/// The receptor markers that define triple-negative disease.
pub const CORE_RECEPTORS: [&str; 3] = ["HER2", "ER", "PR"];

/// Direction of a biomarker reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
        }
    }
}

/// Which directions a status string mentions. Both can be set, e.g. for a
/// merged `"positive / negative"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readings {
    pub positive: bool,
    pub negative: bool,
}

impl Readings {
    /// The single direction this status confirms, if it confirms exactly one.
    pub fn confirmed(self) -> Option<Polarity> {
        match (self.positive, self.negative) {
            (true, false) => Some(Polarity::Positive),
            (false, true) => Some(Polarity::Negative),
            _ => None,
        }
    }

    pub fn conflicting(self) -> bool {
        self.positive && self.negative
    }
}

static NEGATIVE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(negative|neg|wild[- ]?type|wt|not\s+detected|not\s+amplified|non-?amplified|absent|undetected|not\s+mutated)\b",
    )
    .expect("valid regex")
});

static POSITIVE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(positive|pos|mutated|mutation|mutant|amplified|amplification|overexpress\w*|detected)\b")
        .expect("valid regex")
});

/// Classify a free-text biomarker status.
///
/// Trailing `+`/`-` count as positive/negative, except IHC scores where
/// `1+` reads negative and `2+` is equivocal.
pub fn readings(status: &str) -> Readings {
    let text = status.trim();
    let mut readings = Readings {
        negative: NEGATIVE_WORDS.is_match(text),
        // Strip negated phrases first so "not detected" does not read positive.
        positive: POSITIVE_WORDS.is_match(&NEGATIVE_WORDS.replace_all(text, " ")),
    };

    for part in text.split('/').map(str::trim) {
        if let Some(head) = part.strip_suffix('+') {
            match head.trim_end().chars().last() {
                Some('1') | Some('0') => readings.negative = true,
                Some('2') => {}
                _ => readings.positive = true,
            }
        } else if part.ends_with('-') || part == "0" {
            readings.negative = true;
        }
    }
    readings
}

/// The patient's confirmed direction for `marker`, where `HR` (hormone
/// receptor) combines ER and PR.
pub fn patient_polarity(profile: &PatientProfile, marker: &str) -> Option<Polarity> {
    if marker == "HR" {
        if let Some(direct) = profile.biomarker("HR").and_then(|s| readings(s).confirmed()) {
            return Some(direct);
        }
        let er = profile.biomarker("ER").and_then(|s| readings(s).confirmed());
        let pr = profile.biomarker("PR").and_then(|s| readings(s).confirmed());
        return match (er, pr) {
            (Some(Polarity::Positive), _) | (_, Some(Polarity::Positive)) => Some(Polarity::Positive),
            (Some(Polarity::Negative), Some(Polarity::Negative)) => Some(Polarity::Negative),
            _ => None,
        };
    }
    profile
        .biomarker(marker)
        .and_then(|status| readings(status).confirmed())
}

// ── Key canonicalization ──────────────────────────────────────────────────────

/// Reduce a biomarker name to its canonical key: uppercase alphanumerics,
/// then the alias table.
pub fn canonical_key(name: &str) -> String {
    let compact: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    match compact.as_str() {
        "HER2NEU" | "ERBB2" | "HER2STATUS" | "HER2NEUSTATUS" => "HER2".to_string(),
        "ESTROGENRECEPTOR" | "OESTROGENRECEPTOR" | "ESTROGEN" | "ERSTATUS" => "ER".to_string(),
        "PROGESTERONERECEPTOR" | "PROGESTERONE" | "PGR" | "PRSTATUS" => "PR".to_string(),
        "HORMONERECEPTOR" | "HRSTATUS" => "HR".to_string(),
        _ => compact,
    }
}

// ── Criterion mentions ────────────────────────────────────────────────────────

/// A biomarker status named in a trial criterion, e.g. "HER2-negative".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub marker: String,
    pub polarity: Polarity,
}

const STATUS: &str = r"\s*(?:status\s*)?(?:[-:=]\s*|\s+)?((?:positive|negative|pos|neg|mutated|mutation|mutant|amplified|wild[- ]?type)\b|\+|-(?:$|[\s,;.)]))";

fn mention_pattern(alias: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)(?:^|[^a-z0-9]){}{}", alias, STATUS)).ok()
}

/// Known spellings of the receptor markers as they appear in criteria text.
static ALIASES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("HER2", r"her-?2(?:\s*/\s*neu)?"),
        ("HER2", r"erbb2"),
        ("HR", r"er\s*/\s*pr"),
        ("HR", r"hormone[- ]receptor"),
        ("HR", r"hr"),
        ("ER", r"o?estrogen[- ]receptor"),
        ("ER", r"er"),
        ("PR", r"progesterone[- ]receptor"),
        ("PR", r"pgr"),
        ("PR", r"pr"),
    ]
    .into_iter()
    .filter_map(|(marker, alias)| mention_pattern(alias).map(|re| (marker, re)))
    .collect()
});

fn polarity_of(token: &str) -> Polarity {
    let t = token.to_ascii_lowercase();
    if t.starts_with("neg") || t.starts_with("wild") || t.starts_with('-') {
        Polarity::Negative
    } else {
        Polarity::Positive
    }
}

/// Every biomarker status mentioned in `criterion`. Receptor spellings are
/// always recognized; any other marker is recognized when it appears in
/// `extra_markers` (typically the patient's own biomarker keys).
pub fn mentions(criterion: &str, extra_markers: &[&str]) -> Vec<Mention> {
    let mut found: Vec<Mention> = Vec::new();
    let mut push = |marker: &str, polarity: Polarity| {
        if !found.iter().any(|m| m.marker == marker && m.polarity == polarity) {
            found.push(Mention {
                marker: marker.to_string(),
                polarity,
            });
        }
    };

    for (marker, re) in ALIASES.iter() {
        for caps in re.captures_iter(criterion) {
            push(*marker, polarity_of(&caps[1]));
        }
    }

    for key in extra_markers {
        if CORE_RECEPTORS.contains(key) || *key == "HR" || key.is_empty() {
            continue;
        }
        let Some(re) = mention_pattern(&regex::escape(key)) else {
            continue;
        };
        for caps in re.captures_iter(criterion) {
            push(*key, polarity_of(&caps[1]));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings() {
        assert_eq!(readings("positive").confirmed(), Some(Polarity::Positive));
        assert_eq!(readings("Negative").confirmed(), Some(Polarity::Negative));
        assert_eq!(readings("3+").confirmed(), Some(Polarity::Positive));
        assert_eq!(readings("IHC 1+").confirmed(), Some(Polarity::Negative));
        assert_eq!(readings("2+").confirmed(), None);
        assert_eq!(readings("not detected").confirmed(), Some(Polarity::Negative));
        assert_eq!(readings("L858R mutation").confirmed(), Some(Polarity::Positive));
        assert_eq!(readings("wild-type").confirmed(), Some(Polarity::Negative));
        assert_eq!(readings("pending").confirmed(), None);
        assert!(readings("positive / negative").conflicting());
    }

    #[test]
    fn test_canonical_key_collapses_aliases() {
        assert_eq!(canonical_key("her2-neu"), "HER2");
        assert_eq!(canonical_key("HER2"), "HER2");
        assert_eq!(canonical_key("ERBB2"), "HER2");
        assert_eq!(canonical_key("Estrogen Receptor"), "ER");
        assert_eq!(canonical_key("PgR"), "PR");
        assert_eq!(canonical_key("pd-l1"), "PDL1");
    }

    #[test]
    fn test_mentions_in_criteria() {
        let m = mentions("Must be HER2-negative", &[]);
        assert_eq!(
            m,
            vec![Mention { marker: "HER2".into(), polarity: Polarity::Negative }]
        );

        let m = mentions("Known HER2/neu positive disease", &[]);
        assert_eq!(m[0].marker, "HER2");
        assert_eq!(m[0].polarity, Polarity::Positive);

        let m = mentions("ER/PR-positive tumors are excluded", &[]);
        assert!(m.iter().any(|m| m.marker == "HR" && m.polarity == Polarity::Positive));

        // "er" inside another word is not the ER marker
        assert!(mentions("Other malignancy within 5 years", &[]).is_empty());
    }

    #[test]
    fn test_mentions_patient_specific_marker() {
        let m = mentions("EGFR mutated NSCLC", &["EGFR"]);
        assert_eq!(m, vec![Mention { marker: "EGFR".into(), polarity: Polarity::Positive }]);
        assert!(mentions("EGFR mutated NSCLC", &[]).is_empty());
    }
}
