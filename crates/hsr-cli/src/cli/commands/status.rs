//! `hsr status` – per-source download progress for a season.

use anyhow::Result;
use hsr_core::progress::{DownloadStatus, SeasonId, SourceKind};
use hsr_core::store::StatsDb;

pub async fn run_status(db: &StatsDb, season: SeasonId) -> Result<()> {
    println!(
        "{:<12} {:<8} {:<12} {:<10} {:<8} {:<8}",
        "SOURCE", "PENDING", "DOWNLOADING", "COMPLETED", "FAILED", "SKIPPED"
    );
    let mut any = false;
    for source in SourceKind::ALL {
        let entries = db.load_progress(source, season).await?;
        if entries.is_empty() {
            continue;
        }
        any = true;
        let count = |status: DownloadStatus| entries.iter().filter(|e| e.status == status).count();
        println!(
            "{:<12} {:<8} {:<12} {:<10} {:<8} {:<8}",
            source.as_str(),
            count(DownloadStatus::Pending),
            count(DownloadStatus::Downloading),
            count(DownloadStatus::Completed),
            count(DownloadStatus::Failed),
            count(DownloadStatus::Skipped),
        );
    }
    if !any {
        println!("No progress recorded for season {}.", season);
    }
    Ok(())
}
