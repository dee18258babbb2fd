//! Validation outcomes and per-entity aggregation.

use std::collections::BTreeSet;

use crate::progress::Feed;

/// Importance of a validation outcome, independent of pass/fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// What a summary aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
    Game,
    Standings,
}

impl ValidationScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationScope::Game => "game",
            ValidationScope::Standings => "standings",
        }
    }
}

/// One rule outcome. Immutable once built.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Unique rule id, e.g. `goals_home[boxscore~play_by_play]`.
    pub rule: String,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,
    /// Structured actual/expected values for failures.
    pub details: Option<serde_json::Value>,
    /// Feed whose data the rule judged (for cross rules, the feed compared
    /// against the boxscore reference).
    pub feed: Feed,
    /// Sub-entity the rule applies to (team abbrev, player id).
    pub entity: Option<String>,
}

impl ValidationResult {
    pub fn pass(rule: impl Into<String>, feed: Feed, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            passed: true,
            severity: Severity::Info,
            message: message.into(),
            details: None,
            feed,
            entity: None,
        }
    }

    pub fn fail(
        rule: impl Into<String>,
        feed: Feed,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            passed: false,
            severity,
            message: message.into(),
            details: None,
            feed,
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Per-entity aggregate over an ordered rule-result list.
///
/// Counting policy: `total_checks` is the full result count; `passed` counts
/// passing results; `failed` counts non-passing results with severity Error;
/// `warnings` counts non-passing results with severity Warning. Non-passing
/// Info results count toward none of the three but stay visible in
/// `results`.
#[derive(Debug, Clone)]
pub struct ValidationSummary {
    pub scope: ValidationScope,
    pub entity: String,
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub results: Vec<ValidationResult>,
}

impl ValidationSummary {
    /// Single-pass count derivation; the only place counts are computed.
    pub fn from_results(
        scope: ValidationScope,
        entity: impl Into<String>,
        results: Vec<ValidationResult>,
    ) -> Self {
        let mut passed = 0usize;
        let mut failed = 0usize;
        let mut warnings = 0usize;
        for result in &results {
            if result.passed {
                passed += 1;
            } else {
                match result.severity {
                    Severity::Error => failed += 1,
                    Severity::Warning => warnings += 1,
                    Severity::Info => {}
                }
            }
        }
        Self {
            scope,
            entity: entity.into(),
            total_checks: results.len(),
            passed,
            failed,
            warnings,
            results,
        }
    }

    /// True when any error-severity rule failed.
    pub fn has_discrepancies(&self) -> bool {
        self.failed > 0
    }

    /// Feeds implicated by error-severity failures, for re-fetch
    /// prioritization.
    pub fn feeds_with_errors(&self) -> BTreeSet<Feed> {
        self.results
            .iter()
            .filter(|r| !r.passed && r.severity == Severity::Error)
            .map(|r| r.feed)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(passed: bool, severity: Severity) -> ValidationResult {
        ValidationResult {
            rule: "r".into(),
            passed,
            severity,
            message: String::new(),
            details: None,
            feed: Feed::Boxscore,
            entity: None,
        }
    }

    #[test]
    fn summary_counts_by_severity() {
        let mut results = vec![result(true, Severity::Info); 7];
        results.push(result(false, Severity::Error));
        results.push(result(false, Severity::Error));
        results.push(result(false, Severity::Warning));

        let summary = ValidationSummary::from_results(ValidationScope::Game, "g", results);
        assert_eq!(summary.total_checks, 10);
        assert_eq!(summary.passed, 7);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.warnings, 1);
        assert!(summary.has_discrepancies());
    }

    #[test]
    fn info_failures_count_toward_neither_bucket() {
        let results = vec![
            result(true, Severity::Info),
            result(false, Severity::Info),
        ];
        let summary = ValidationSummary::from_results(ValidationScope::Game, "g", results);
        assert_eq!(summary.total_checks, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.warnings, 0);
        assert!(!summary.has_discrepancies());
    }

    #[test]
    fn feeds_with_errors_only_reports_error_failures() {
        let mut shifts_fail = result(false, Severity::Error);
        shifts_fail.feed = Feed::Shifts;
        let mut pbp_warn = result(false, Severity::Warning);
        pbp_warn.feed = Feed::PlayByPlay;

        let summary = ValidationSummary::from_results(
            ValidationScope::Game,
            "g",
            vec![shifts_fail, pbp_warn, result(true, Severity::Info)],
        );
        let feeds = summary.feeds_with_errors();
        assert!(feeds.contains(&Feed::Shifts));
        assert!(!feeds.contains(&Feed::PlayByPlay));
        assert!(!feeds.contains(&Feed::Boxscore));
    }
}
