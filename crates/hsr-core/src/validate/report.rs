//! Plain-text validation report rendering.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::result::ValidationSummary;
use super::run::SeasonValidation;

/// Render a season validation to `validation-<season>.txt` in `output_dir`.
/// Returns the written path.
pub fn render_report(validation: &SeasonValidation, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create report dir {}", output_dir.display()))?;
    let path = output_dir.join(format!("validation-{}.txt", validation.season));
    fs::write(&path, render_text(validation))
        .with_context(|| format!("write report {}", path.display()))?;
    Ok(path)
}

fn render_text(validation: &SeasonValidation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Validation report for season {}", validation.season);
    let _ = writeln!(
        out,
        "Games validated: {}  with discrepancies: {}  skipped (no boxscore): {}",
        validation.games.len(),
        validation.games_with_discrepancies(),
        validation.games_without_boxscore
    );
    let _ = writeln!(out);

    if let Some(standings) = &validation.standings {
        render_summary(&mut out, standings);
    }
    for game in &validation.games {
        render_summary(&mut out, game);
    }
    out
}

fn render_summary(out: &mut String, summary: &ValidationSummary) {
    let _ = writeln!(
        out,
        "{} {}: {} checks, {} passed, {} failed, {} warnings",
        summary.scope.as_str(),
        summary.entity,
        summary.total_checks,
        summary.passed,
        summary.failed,
        summary.warnings
    );
    for result in summary.results.iter().filter(|r| !r.passed) {
        let _ = writeln!(
            out,
            "  [{}] {}: {}",
            result.severity.as_str(),
            result.rule,
            result.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Feed;
    use crate::validate::result::{Severity, ValidationResult, ValidationScope};

    #[test]
    fn report_lists_failures_only() {
        let summary = ValidationSummary::from_results(
            ValidationScope::Game,
            "2023020001",
            vec![
                ValidationResult::pass("goals_home[x]", Feed::PlayByPlay, "ok"),
                ValidationResult::fail(
                    "goals_away[x]",
                    Feed::PlayByPlay,
                    Severity::Error,
                    "TOR: play_by_play reports 3 but boxscore reports 2",
                ),
            ],
        );
        let validation = SeasonValidation {
            season: 20232024,
            games: vec![summary],
            standings: None,
            games_without_boxscore: 0,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = render_report(&validation, dir.path()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("season 20232024"));
        assert!(text.contains("game 2023020001: 2 checks, 1 passed, 1 failed"));
        assert!(text.contains("[error] goals_away[x]"));
        assert!(!text.contains("goals_home[x]: ok"));
    }
}
