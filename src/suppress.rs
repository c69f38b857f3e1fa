//! Diff suppression decisions.
//!
//! This is the entry point the resource layer calls when a stored attribute
//! value and a freshly read value differ textually: it answers whether the
//! difference is semantic or only noise (key order, number spelling,
//! volatile server fields, record order).
//!
//! Every failure (unparseable text, record count mismatch, missing or
//! unmatched identity) is a difference.
//!
//! # Example
//!
//! ```
//! use kibana_provider::suppress::{should_suppress_diff, DiffMode, Suppressor};
//! use kibana_provider::document::Exclusions;
//!
//! let exclusions = Exclusions::from_iter(["version"]);
//! assert!(should_suppress_diff(
//!     r#"{"a":1,"version":5}"#,
//!     r#"{"a":1,"version":9}"#,
//!     DiffMode::Json,
//!     &exclusions,
//! ));
//!
//! let old = "{\"id\":\"x\",\"v\":1}\n{\"id\":\"y\",\"v\":2}\n";
//! let new = "{\"id\":\"y\",\"v\":2}\n{\"id\":\"x\",\"v\":1}\n";
//! assert!(Suppressor::saved_objects().suppress(old, new));
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compare::{equal, first_difference};
use crate::document::{normalize, Exclusions};
use crate::error::DiffError;
use crate::ndjson::{match_records, parse_records, DEFAULT_IDENTITY_KEY};

/// How a text value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// A single JSON document.
    Json,
    /// Newline-delimited JSON records matched by identity.
    Ndjson,
}

/// Outcome of comparing two values.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The values are semantically the same.
    Equivalent,
    /// The values differ, or could not be proven equal.
    Different(Difference),
}

impl Verdict {
    /// Whether the difference should be hidden from the plan.
    pub fn is_equivalent(&self) -> bool {
        matches!(self, Verdict::Equivalent)
    }
}

/// Why two values were judged different.
#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    /// Both sides parsed and matched, but content diverges at `path`.
    Content {
        /// Identity of the NDJSON record, if any.
        record: Option<String>,
        /// Path of the first divergence, rooted at `$`.
        path: String,
    },
    /// The comparison could not be completed.
    Failed(DiffError),
}

/// Receives the verdict of each suppression decision.
///
/// Implementations are for diagnostics only; the verdict never depends on
/// them.
pub trait DiffReporter {
    /// Called once per decision.
    fn report(&self, mode: DiffMode, verdict: &Verdict);
}

/// Reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl DiffReporter for NoopReporter {
    fn report(&self, _mode: DiffMode, _verdict: &Verdict) {}
}

/// Emits a `tracing` event per decision.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    attribute: Option<String>,
}

impl TracingReporter {
    /// A reporter that tags events with an attribute path.
    pub fn for_attribute(attribute: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
        }
    }
}

impl DiffReporter for TracingReporter {
    fn report(&self, mode: DiffMode, verdict: &Verdict) {
        let attribute = self.attribute.as_deref().unwrap_or("");
        match verdict {
            Verdict::Equivalent => {
                debug!(?mode, attribute, "Values are equivalent, suppressing diff");
            },
            Verdict::Different(Difference::Content { record, path }) => {
                debug!(?mode, attribute, record = ?record, path = %path, "Values differ");
            },
            Verdict::Different(Difference::Failed(err)) => {
                debug!(?mode, attribute, error = %err, "Values could not be compared, treating as changed");
            },
        }
    }
}

/// A configured suppression decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppressor {
    mode: DiffMode,
    exclusions: Exclusions,
    identity_key: String,
}

impl Suppressor {
    /// Create a suppressor for the given mode with no exclusions.
    pub fn new(mode: DiffMode) -> Self {
        Self {
            mode,
            exclusions: Exclusions::new(),
            identity_key: DEFAULT_IDENTITY_KEY.to_string(),
        }
    }

    /// Single JSON documents.
    pub fn json() -> Self {
        Self::new(DiffMode::Json)
    }

    /// NDJSON records matched by `id`.
    pub fn ndjson() -> Self {
        Self::new(DiffMode::Ndjson)
    }

    /// NDJSON saved-object exports, ignoring fields Kibana rewrites.
    pub fn saved_objects() -> Self {
        Self::ndjson().with_exclusions(Exclusions::saved_objects())
    }

    /// Replace the exclusion set.
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Set the field used to pair NDJSON records.
    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = key.into();
        self
    }

    /// The configured mode.
    pub fn mode(&self) -> DiffMode {
        self.mode
    }

    /// The configured exclusion set.
    pub fn exclusions(&self) -> &Exclusions {
        &self.exclusions
    }

    /// Compare two texts and explain the outcome.
    pub fn verdict(&self, old: &str, new: &str) -> Verdict {
        verdict(self.mode, &self.exclusions, &self.identity_key, old, new)
    }

    /// Whether the change from `old` to `new` should be hidden.
    pub fn suppress(&self, old: &str, new: &str) -> bool {
        self.verdict(old, new).is_equivalent()
    }

    /// Like [`Suppressor::suppress`], reporting the verdict.
    pub fn suppress_with(&self, old: &str, new: &str, reporter: &dyn DiffReporter) -> bool {
        let verdict = self.verdict(old, new);
        reporter.report(self.mode, &verdict);
        verdict.is_equivalent()
    }
}

fn verdict(mode: DiffMode, exclusions: &Exclusions, identity_key: &str, old: &str, new: &str) -> Verdict {
    let result = match mode {
        DiffMode::Json => compare_json(exclusions, old, new),
        DiffMode::Ndjson => compare_ndjson(exclusions, identity_key, old, new),
    };
    match result {
        Ok(None) => Verdict::Equivalent,
        Ok(Some(difference)) => Verdict::Different(difference),
        Err(err) => Verdict::Different(Difference::Failed(err)),
    }
}

fn compare_json(exclusions: &Exclusions, old: &str, new: &str) -> Result<Option<Difference>, DiffError> {
    let old = normalize(old, exclusions)?;
    let new = normalize(new, exclusions)?;
    if equal(&old, &new) {
        return Ok(None);
    }
    Ok(Some(Difference::Content {
        record: None,
        path: first_difference(&old, &new).unwrap_or_else(|| "$".to_string()),
    }))
}

fn compare_ndjson(
    exclusions: &Exclusions,
    identity_key: &str,
    old: &str,
    new: &str,
) -> Result<Option<Difference>, DiffError> {
    let old = parse_records(old, exclusions)?;
    let new = parse_records(new, exclusions)?;
    for (a, b) in match_records(&old, &new, identity_key)? {
        if !equal(a, b) {
            return Ok(Some(Difference::Content {
                record: a.get(identity_key).and_then(|id| id.as_str()).map(str::to_string),
                path: first_difference(a, b).unwrap_or_else(|| "$".to_string()),
            }));
        }
    }
    Ok(None)
}

/// Decide whether the change from `old` to `new` is not a real change.
///
/// In [`DiffMode::Json`] both texts are compared as single documents, with
/// empty text standing for `{}`. In [`DiffMode::Ndjson`] records are paired
/// by `id` and compared pairwise. Fields in `exclusions` are ignored. Any
/// parse, cardinality or identity failure returns `false`.
pub fn should_suppress_diff(old: &str, new: &str, mode: DiffMode, exclusions: &Exclusions) -> bool {
    verdict(mode, exclusions, DEFAULT_IDENTITY_KEY, old, new).is_equivalent()
}
