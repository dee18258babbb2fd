//! `hsr fetch` – download a season from every source and reconcile it.

use std::sync::Arc;

use anyhow::Result;
use hsr_core::config::HsrConfig;
use hsr_core::control::RunControl;
use hsr_core::http::CurlClient;
use hsr_core::orchestrate::{self, SourceHandle};
use hsr_core::progress::{SeasonId, SourceKind};
use hsr_core::store::StatsDb;

pub async fn run_fetch(
    db: &StatsDb,
    cfg: &HsrConfig,
    season: SeasonId,
    sources: &[String],
    force: bool,
) -> Result<()> {
    let selected = parse_sources(sources)?;
    let control = Arc::new(RunControl::new());
    let handles = orchestrate::default_sources(
        Arc::new(CurlClient::new()),
        db,
        cfg,
        Some(Arc::clone(&control)),
    );
    let handles: Vec<SourceHandle> = handles
        .into_iter()
        .filter(|h| selected.as_ref().map_or(true, |s| s.contains(&h.source())))
        .collect();

    // Ctrl-C aborts every registered pass; unstarted items stay pending and
    // the next run resumes them.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received; aborting season passes");
                control.request_abort_all();
            }
        });
    }

    let report = orchestrate::run_season(db, &handles, season, force).await?;

    for outcome in &report.sources {
        let name = outcome
            .source
            .map(SourceKind::as_str)
            .unwrap_or("unknown");
        match &outcome.error {
            Some(error) => println!("{:<10} aborted: {}", name, error),
            None => println!(
                "{:<10} {} completed, {} failed, {} skipped",
                name, outcome.completed, outcome.failed, outcome.skipped
            ),
        }
    }
    println!(
        "validated {} game(s), {} with discrepancies; {} item(s) requeued",
        report.validation.games.len(),
        report.validation.games_with_discrepancies(),
        report.requeued
    );
    Ok(())
}

fn parse_sources(names: &[String]) -> Result<Option<Vec<SourceKind>>> {
    if names.is_empty() {
        return Ok(None);
    }
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let source = SourceKind::parse(name)
            .ok_or_else(|| anyhow::anyhow!("unknown source: {} (expected api, events, shifts, standings)", name))?;
        out.push(source);
    }
    Ok(Some(out))
}
