//! Outcome aggregation
//!
//! Every (record, field) unit produces exactly one [`Outcome`] per run. The
//! [`Reporter`] folds them into a [`BatchSummary`]: counts by kind plus the
//! ordered list of everything that needs human review. Pure aggregation, no
//! I/O.

use serde::Serialize;
use std::collections::BTreeMap;

/// Why a unit was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Empty,
    AlreadyCanonical,
    AlreadyMigrated,
    UnrecognizedFormat,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Empty => "empty",
            SkipReason::AlreadyCanonical => "already-canonical",
            SkipReason::AlreadyMigrated => "already-migrated",
            SkipReason::UnrecognizedFormat => "unrecognized-format",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one (record, field) unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Outcome {
    /// Nothing to do; reason says why
    Skipped { reason: SkipReason },
    /// The stored value now holds the canonical identifier
    UploadedAndNormalized { identifier: String },
    /// Classified as local but absent on disk; record untouched
    MissingLocalFile { expected_path: String },
    /// Remote interaction failed after retries; record untouched
    UploadFailed { cause: String },
    /// Upload succeeded but the record write failed; the identifier is in
    /// the cause chain and the next run can retry just the save
    SaveFailed { cause: String },
}

impl Outcome {
    pub fn is_skip(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::UploadFailed { .. } | Outcome::SaveFailed { .. })
    }

    /// Short label for counting and table rows.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Skipped { .. } => "skipped",
            Outcome::UploadedAndNormalized { .. } => "uploaded",
            Outcome::MissingLocalFile { .. } => "missing-local",
            Outcome::UploadFailed { .. } => "upload-failed",
            Outcome::SaveFailed { .. } => "save-failed",
        }
    }
}

/// One outcome attributed to its (record, field) unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOutcome {
    pub record_key: String,
    pub field: String,
    pub outcome: Outcome,
}

/// Aggregated result of one batch, immutable once the batch completes
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Units processed
    pub total: usize,
    pub skipped: usize,
    pub uploaded: usize,
    pub missing_local: usize,
    pub upload_failed: usize,
    pub save_failed: usize,
    /// Skip counts broken down by reason
    pub skip_reasons: BTreeMap<&'static str, usize>,
    /// Every non-skip outcome, in completion order, for human review
    pub details: Vec<UnitOutcome>,
    /// Set when a permanent remote failure stopped the batch early
    pub aborted: Option<String>,
}

impl BatchSummary {
    /// True when nothing failed and the batch ran to completion.
    pub fn is_clean(&self) -> bool {
        self.upload_failed == 0 && self.save_failed == 0 && self.aborted.is_none()
    }
}

/// Accumulates outcomes for one batch
#[derive(Debug, Default)]
pub struct Reporter {
    summary: BatchSummary,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record_key: String, field: String, outcome: Outcome) {
        self.summary.total += 1;
        match &outcome {
            Outcome::Skipped { reason } => {
                self.summary.skipped += 1;
                *self.summary.skip_reasons.entry(reason.as_str()).or_insert(0) += 1;
            }
            Outcome::UploadedAndNormalized { .. } => self.summary.uploaded += 1,
            Outcome::MissingLocalFile { .. } => self.summary.missing_local += 1,
            Outcome::UploadFailed { .. } => self.summary.upload_failed += 1,
            Outcome::SaveFailed { .. } => self.summary.save_failed += 1,
        }

        if !outcome.is_skip() {
            self.summary.details.push(UnitOutcome {
                record_key,
                field,
                outcome,
            });
        }
    }

    pub fn abort(&mut self, cause: String) {
        if self.summary.aborted.is_none() {
            self.summary.aborted = Some(cause);
        }
    }

    pub fn finish(self) -> BatchSummary {
        self.summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut reporter = Reporter::new();
        reporter.record(
            "1".into(),
            "cover".into(),
            Outcome::Skipped {
                reason: SkipReason::Empty,
            },
        );
        reporter.record(
            "1".into(),
            "gallery1".into(),
            Outcome::UploadedAndNormalized {
                identifier: "properties/house-abc123.jpg".into(),
            },
        );
        reporter.record(
            "2".into(),
            "cover".into(),
            Outcome::MissingLocalFile {
                expected_path: "/media/properties/missing.jpg".into(),
            },
        );
        reporter.record(
            "3".into(),
            "cover".into(),
            Outcome::Skipped {
                reason: SkipReason::AlreadyMigrated,
            },
        );

        let summary = reporter.finish();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.missing_local, 1);
        assert_eq!(summary.skip_reasons.get("empty"), Some(&1));
        assert_eq!(summary.skip_reasons.get("already-migrated"), Some(&1));
        assert!(summary.is_clean());
    }

    #[test]
    fn test_details_list_every_non_skip_outcome() {
        let mut reporter = Reporter::new();
        for i in 0..3 {
            reporter.record(
                i.to_string(),
                "cover".into(),
                Outcome::UploadFailed {
                    cause: "timeout".into(),
                },
            );
        }
        reporter.record(
            "9".into(),
            "cover".into(),
            Outcome::Skipped {
                reason: SkipReason::Empty,
            },
        );

        let summary = reporter.finish();
        assert_eq!(summary.details.len(), 3);
        assert_eq!(summary.upload_failed, 3);
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_abort_keeps_first_cause() {
        let mut reporter = Reporter::new();
        reporter.abort("bad credentials".into());
        reporter.abort("second cause".into());
        let summary = reporter.finish();
        assert_eq!(summary.aborted.as_deref(), Some("bad credentials"));
        assert!(!summary.is_clean());
    }
}
