//! Typed views of stored feed payloads.
//!
//! These are the parsed records the validators compare. How a source's raw
//! report becomes this shape is the parser boundary's business; validation
//! only deserializes stored payload JSON into these structs.

use serde::{Deserialize, Serialize};

use crate::progress::GameId;

/// One team's row in a standings table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub ot_losses: u32,
    pub points: u32,
    #[serde(default)]
    pub regulation_wins: Option<u32>,
    pub goals_for: u32,
    pub goals_against: u32,
    #[serde(default)]
    pub goal_differential: Option<i64>,
    /// Points percentage on a 0..=100 scale.
    #[serde(default)]
    pub points_pct: Option<f64>,
}

/// Standings payload: `{"teams": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingsRecord {
    pub teams: Vec<TeamStanding>,
}

/// Per-side aggregate line of a boxscore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSide {
    pub team: String,
    pub goals: u32,
    pub shots: u32,
}

/// Per-player line of a boxscore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLine {
    pub player_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub toi_seconds: u32,
    #[serde(default)]
    pub shift_count: Option<u32>,
}

/// Boxscore payload; the validation reference for a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameBoxscore {
    pub home: TeamSide,
    pub away: TeamSide,
    #[serde(default)]
    pub players: Vec<PlayerLine>,
}

/// Aggregates derived from the play-by-play event feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PbpSummary {
    pub home_goals: u32,
    pub away_goals: u32,
    #[serde(default)]
    pub home_shots: Option<u32>,
    #[serde(default)]
    pub away_shots: Option<u32>,
}

/// One player's aggregate from the shift chart feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub player_id: i64,
    pub toi_seconds: u32,
    pub shift_count: u32,
}

/// Shift chart payload: `{"players": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftsRecord {
    pub players: Vec<ShiftRecord>,
}

impl ShiftsRecord {
    pub fn player(&self, player_id: i64) -> Option<&ShiftRecord> {
        self.players.iter().find(|p| p.player_id == player_id)
    }
}

/// One game row of the schedule payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleGame {
    pub id: GameId,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
}

/// Schedule payload: `{"games": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub games: Vec<ScheduleGame>,
}

impl ScheduleRecord {
    pub fn game(&self, id: GameId) -> Option<&ScheduleGame> {
        self.games.iter().find(|g| g.id == id)
    }
}

/// Whatever feeds are on hand for one game. The boxscore is mandatory (the
/// reference); the rest are optional and their absence is not a failure.
#[derive(Debug, Clone)]
pub struct GameFeeds {
    pub boxscore: GameBoxscore,
    pub play_by_play: Option<PbpSummary>,
    pub shifts: Option<ShiftsRecord>,
    pub schedule: Option<ScheduleGame>,
}
