//! `hsr validate` – reconcile stored data and report discrepancies.

use std::path::Path;

use anyhow::Result;
use hsr_core::config::HsrConfig;
use hsr_core::progress::{GameId, SeasonId};
use hsr_core::store::StatsDb;
use hsr_core::validate::{self, ValidationSummary};

pub async fn run_validate(
    db: &StatsDb,
    cfg: &HsrConfig,
    season: SeasonId,
    game: Option<GameId>,
    report: bool,
    output_dir: Option<&str>,
) -> Result<()> {
    if let Some(game) = game {
        let summary = validate::validate_game(db, season, game).await?;
        print_summary(&summary);
        return Ok(());
    }

    let validation = validate::validate_season(db, season).await?;
    if let Some(standings) = &validation.standings {
        print_summary(standings);
    }
    for summary in &validation.games {
        print_summary(summary);
    }
    println!(
        "season {}: {} game(s) validated, {} with discrepancies, {} skipped (no boxscore)",
        season,
        validation.games.len(),
        validation.games_with_discrepancies(),
        validation.games_without_boxscore
    );

    if report {
        let dir = output_dir
            .or(cfg.report_dir.as_deref())
            .unwrap_or(".");
        let path = validate::render_report(&validation, Path::new(dir))?;
        println!("report written to {}", path.display());
    }
    Ok(())
}

fn print_summary(summary: &ValidationSummary) {
    println!(
        "{:<10} {:<16} {} checks, {} passed, {} failed, {} warnings",
        summary.scope.as_str(),
        summary.entity,
        summary.total_checks,
        summary.passed,
        summary.failed,
        summary.warnings
    );
    for result in summary.results.iter().filter(|r| !r.passed) {
        println!(
            "  [{}] {}: {}",
            result.severity.as_str(),
            result.rule,
            result.message
        );
    }
}
