//! Cross-source agreement rules: the same game's facts across feeds.
//!
//! The boxscore is the reference. Exact rules fail at error severity on any
//! difference; tolerance rules pass inside the tolerance and fail beyond it,
//! escalating from warning to error with the size of the breach when the
//! rule declares a warning band.

use serde_json::json;

use crate::progress::Feed;

use super::records::{GameBoxscore, GameFeeds, PbpSummary, ScheduleGame, ShiftsRecord};
use super::result::{Severity, ValidationResult};

/// Shot count agreement between boxscore and play-by-play.
pub const SHOT_TOLERANCE: i64 = 2;
const SHOT_WARN_BAND: i64 = 2;

/// Time-on-ice agreement between boxscore and shift charts, in seconds.
/// Any breach is an error; there is no warning band.
pub const TOI_TOLERANCE_SECS: i64 = 5;

/// Shift count agreement between boxscore and shift charts.
pub const SHIFT_TOLERANCE: i64 = 1;
const SHIFT_WARN_BAND: i64 = 2;

/// Canonical id for a feed pair, independent of argument order.
fn pair_id(a: Feed, b: Feed) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{}~{}", first.as_str(), second.as_str())
}

fn rule_id(name: &str, a: Feed, b: Feed) -> String {
    format!("{}[{}]", name, pair_id(a, b))
}

/// Exact agreement; any difference is an error.
fn exact_rule(
    name: &str,
    feed: Feed,
    entity: &str,
    reference: i64,
    other: i64,
) -> ValidationResult {
    let rule = rule_id(name, Feed::Boxscore, feed);
    if reference == other {
        ValidationResult::pass(rule, feed, format!("{} agrees across sources", name))
            .with_entity(entity)
    } else {
        ValidationResult::fail(
            rule,
            feed,
            Severity::Error,
            format!(
                "{}: {} reports {} but boxscore reports {}",
                entity,
                feed.as_str(),
                other,
                reference
            ),
        )
        .with_details(json!({"actual": other, "expected": reference}))
        .with_entity(entity)
    }
}

/// Agreement within a tolerance. Differences inside the tolerance pass at
/// info severity; beyond it, severity is warning inside `warn_band` extra
/// units (when given) and error farther out.
fn tolerance_rule(
    name: &str,
    feed: Feed,
    entity: &str,
    reference: i64,
    other: i64,
    tolerance: i64,
    warn_band: Option<i64>,
) -> ValidationResult {
    let rule = rule_id(name, Feed::Boxscore, feed);
    let diff = (reference - other).abs();
    if diff <= tolerance {
        return ValidationResult::pass(
            rule,
            feed,
            format!("{} within tolerance ({} vs {})", name, other, reference),
        )
        .with_entity(entity);
    }
    let severity = match warn_band {
        Some(band) if diff <= tolerance + band => Severity::Warning,
        _ => Severity::Error,
    };
    ValidationResult::fail(
        rule,
        feed,
        severity,
        format!(
            "{}: {} differs by {} (tolerance {})",
            entity, name, diff, tolerance
        ),
    )
    .with_details(json!({
        "actual": other,
        "expected": reference,
        "difference": diff,
        "tolerance": tolerance,
    }))
    .with_entity(entity)
}

/// Goal counts: boxscore vs play-by-play, exact.
pub fn compare_goals(boxscore: &GameBoxscore, pbp: &PbpSummary) -> Vec<ValidationResult> {
    vec![
        exact_rule(
            "goals_home",
            Feed::PlayByPlay,
            &boxscore.home.team,
            boxscore.home.goals as i64,
            pbp.home_goals as i64,
        ),
        exact_rule(
            "goals_away",
            Feed::PlayByPlay,
            &boxscore.away.team,
            boxscore.away.goals as i64,
            pbp.away_goals as i64,
        ),
    ]
}

/// Final score: boxscore vs schedule, exact. Schedule rows without a score
/// (game not yet final there) produce nothing.
pub fn compare_final_score(
    boxscore: &GameBoxscore,
    schedule: &ScheduleGame,
) -> Vec<ValidationResult> {
    let (Some(home), Some(away)) = (schedule.home_score, schedule.away_score) else {
        return Vec::new();
    };
    vec![
        exact_rule(
            "final_score_home",
            Feed::Schedule,
            &boxscore.home.team,
            boxscore.home.goals as i64,
            home as i64,
        ),
        exact_rule(
            "final_score_away",
            Feed::Schedule,
            &boxscore.away.team,
            boxscore.away.goals as i64,
            away as i64,
        ),
    ]
}

/// Shot counts: boxscore vs play-by-play, tolerance ±2.
pub fn compare_shots(boxscore: &GameBoxscore, pbp: &PbpSummary) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    if let Some(shots) = pbp.home_shots {
        results.push(tolerance_rule(
            "shots_home",
            Feed::PlayByPlay,
            &boxscore.home.team,
            boxscore.home.shots as i64,
            shots as i64,
            SHOT_TOLERANCE,
            Some(SHOT_WARN_BAND),
        ));
    }
    if let Some(shots) = pbp.away_shots {
        results.push(tolerance_rule(
            "shots_away",
            Feed::PlayByPlay,
            &boxscore.away.team,
            boxscore.away.shots as i64,
            shots as i64,
            SHOT_TOLERANCE,
            Some(SHOT_WARN_BAND),
        ));
    }
    results
}

/// Per-player time on ice and shift counts: boxscore vs shift charts.
/// Boxscore players missing from the shift feed fail at warning severity;
/// extra shift-feed players are ignored.
pub fn compare_shifts(boxscore: &GameBoxscore, shifts: &ShiftsRecord) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    for player in &boxscore.players {
        let entity = player
            .name
            .clone()
            .unwrap_or_else(|| player.player_id.to_string());
        let Some(shift) = shifts.player(player.player_id) else {
            results.push(
                ValidationResult::fail(
                    rule_id("shift_coverage", Feed::Boxscore, Feed::Shifts),
                    Feed::Shifts,
                    Severity::Warning,
                    format!("{}: no shift records for player", entity),
                )
                .with_details(json!({"player_id": player.player_id}))
                .with_entity(entity),
            );
            continue;
        };

        results.push(tolerance_rule(
            "toi_seconds",
            Feed::Shifts,
            &entity,
            player.toi_seconds as i64,
            shift.toi_seconds as i64,
            TOI_TOLERANCE_SECS,
            None,
        ));
        if let Some(count) = player.shift_count {
            results.push(tolerance_rule(
                "shift_count",
                Feed::Shifts,
                &entity,
                count as i64,
                shift.shift_count as i64,
                SHIFT_TOLERANCE,
                Some(SHIFT_WARN_BAND),
            ));
        }
    }
    results
}

/// Run every comparison whose inputs are on hand. The boxscore is required
/// by construction of `GameFeeds`; absence of an optional feed silently
/// skips its comparisons.
pub fn validate_all(feeds: &GameFeeds) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    if let Some(pbp) = &feeds.play_by_play {
        results.extend(compare_goals(&feeds.boxscore, pbp));
        results.extend(compare_shots(&feeds.boxscore, pbp));
    }
    if let Some(schedule) = &feeds.schedule {
        results.extend(compare_final_score(&feeds.boxscore, schedule));
    }
    if let Some(shifts) = &feeds.shifts {
        results.extend(compare_shifts(&feeds.boxscore, shifts));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::records::{PlayerLine, ShiftRecord, TeamSide};

    fn boxscore() -> GameBoxscore {
        GameBoxscore {
            home: TeamSide {
                team: "BOS".into(),
                goals: 4,
                shots: 30,
            },
            away: TeamSide {
                team: "TOR".into(),
                goals: 2,
                shots: 28,
            },
            players: vec![PlayerLine {
                player_id: 8475745,
                name: Some("Marchand".into()),
                toi_seconds: 1130,
                shift_count: Some(22),
            }],
        }
    }

    fn pbp(home_goals: u32, away_goals: u32) -> PbpSummary {
        PbpSummary {
            home_goals,
            away_goals,
            home_shots: Some(30),
            away_shots: Some(28),
        }
    }

    fn shifts(toi: u32, count: u32) -> ShiftsRecord {
        ShiftsRecord {
            players: vec![ShiftRecord {
                player_id: 8475745,
                toi_seconds: toi,
                shift_count: count,
            }],
        }
    }

    #[test]
    fn pair_id_is_order_independent() {
        assert_eq!(
            pair_id(Feed::Boxscore, Feed::PlayByPlay),
            pair_id(Feed::PlayByPlay, Feed::Boxscore)
        );
        assert_eq!(
            pair_id(Feed::Shifts, Feed::Boxscore),
            "boxscore~shifts"
        );
    }

    #[test]
    fn matching_goals_pass() {
        let results = compare_goals(&boxscore(), &pbp(4, 2));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
    }

    #[test]
    fn goal_mismatch_is_an_error() {
        let results = compare_goals(&boxscore(), &pbp(3, 2));
        let home = &results[0];
        assert!(!home.passed);
        assert_eq!(home.severity, Severity::Error);
        let details = home.details.as_ref().unwrap();
        assert_eq!(details["actual"], 3);
        assert_eq!(details["expected"], 4);
    }

    #[test]
    fn toi_at_tolerance_boundary_passes() {
        let results = compare_shifts(&boxscore(), &shifts(1135, 22));
        let toi = results
            .iter()
            .find(|r| r.rule.starts_with("toi_seconds"))
            .unwrap();
        assert!(toi.passed, "5s difference is exactly the tolerance");
    }

    #[test]
    fn toi_beyond_tolerance_fails_with_error() {
        let results = compare_shifts(&boxscore(), &shifts(1136, 22));
        let toi = results
            .iter()
            .find(|r| r.rule.starts_with("toi_seconds"))
            .unwrap();
        assert!(!toi.passed);
        assert_eq!(toi.severity, Severity::Error);
        assert_eq!(toi.details.as_ref().unwrap()["difference"], 6);
    }

    #[test]
    fn shift_count_escalates_from_warning_to_error() {
        // Difference 1: within tolerance.
        let within = compare_shifts(&boxscore(), &shifts(1130, 23));
        assert!(within
            .iter()
            .find(|r| r.rule.starts_with("shift_count"))
            .unwrap()
            .passed);

        // Difference 3: tolerance 1 + warn band 2 -> warning.
        let warn = compare_shifts(&boxscore(), &shifts(1130, 25));
        let r = warn
            .iter()
            .find(|r| r.rule.starts_with("shift_count"))
            .unwrap();
        assert!(!r.passed);
        assert_eq!(r.severity, Severity::Warning);

        // Difference 4: beyond the band -> error.
        let err = compare_shifts(&boxscore(), &shifts(1130, 26));
        let r = err
            .iter()
            .find(|r| r.rule.starts_with("shift_count"))
            .unwrap();
        assert_eq!(r.severity, Severity::Error);
    }

    #[test]
    fn shot_difference_within_tolerance_passes_as_info() {
        let mut p = pbp(4, 2);
        p.home_shots = Some(32);
        let results = compare_shots(&boxscore(), &p);
        let home = results.iter().find(|r| r.rule.starts_with("shots_home")).unwrap();
        assert!(home.passed);
        assert_eq!(home.severity, Severity::Info);
    }

    #[test]
    fn missing_shift_player_is_a_warning() {
        let empty = ShiftsRecord { players: vec![] };
        let results = compare_shifts(&boxscore(), &empty);
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert_eq!(results[0].severity, Severity::Warning);
    }

    #[test]
    fn validate_all_skips_absent_feeds() {
        let feeds = GameFeeds {
            boxscore: boxscore(),
            play_by_play: None,
            shifts: None,
            schedule: None,
        };
        assert!(validate_all(&feeds).is_empty());

        let feeds = GameFeeds {
            boxscore: boxscore(),
            play_by_play: Some(pbp(4, 2)),
            shifts: Some(shifts(1130, 22)),
            schedule: Some(ScheduleGame {
                id: 1,
                home_team: "BOS".into(),
                away_team: "TOR".into(),
                home_score: Some(4),
                away_score: Some(2),
            }),
        };
        let results = validate_all(&feeds);
        assert!(results.len() >= 8);
        assert!(results.iter().all(|r| r.passed));
    }

    #[test]
    fn schedule_without_scores_produces_nothing() {
        let schedule = ScheduleGame {
            id: 1,
            home_team: "BOS".into(),
            away_team: "TOR".into(),
            home_score: None,
            away_score: None,
        };
        assert!(compare_final_score(&boxscore(), &schedule).is_empty());
    }
}
