//! `hsr health` – probe each source's reachability.

use std::sync::Arc;

use anyhow::Result;
use hsr_core::config::HsrConfig;
use hsr_core::http::CurlClient;
use hsr_core::orchestrate;
use hsr_core::store::StatsDb;

pub async fn run_health(db: &StatsDb, cfg: &HsrConfig) -> Result<()> {
    let handles = orchestrate::default_sources(Arc::new(CurlClient::new()), db, cfg, None);
    for (source, healthy) in orchestrate::health_report(&handles).await {
        println!(
            "{:<12} {}",
            source.as_str(),
            if healthy { "ok" } else { "unreachable" }
        );
    }
    Ok(())
}
