//! Validation and reconciliation.
//!
//! Two rule families: internal consistency of a single source's records
//! (standings arithmetic) and cross-source agreement on the same game
//! (exact rules and tolerance rules). Discrepancies are never errors; every
//! rule outcome is a structured `ValidationResult`, and per-entity counts
//! are derived exactly once in `ValidationSummary::from_results`.

pub mod cross;
pub mod internal;
mod records;
mod report;
mod result;
mod run;

pub use records::{
    GameBoxscore, GameFeeds, PbpSummary, PlayerLine, ScheduleGame, ScheduleRecord, ShiftRecord,
    ShiftsRecord, StandingsRecord, TeamSide, TeamStanding,
};
pub use report::render_report;
pub use result::{Severity, ValidationResult, ValidationScope, ValidationSummary};
pub use run::{validate_game, validate_season, SeasonValidation};
