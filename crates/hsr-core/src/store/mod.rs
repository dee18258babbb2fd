//! Persistent stats/progress database (SQLite via sqlx).
//!
//! Stores per-item download progress, parsed feed payloads, and archived raw
//! response bytes keyed by content digest. All writes are natural-key
//! upserts so re-running a job never duplicates rows.

mod db;
mod payloads;
mod progress_rows;

pub use db::StatsDb;
pub use payloads::digest_hex;

#[cfg(test)]
pub(crate) use db::open_memory;
