//! Internal consistency rules: one source's data against itself.
//!
//! Pure functions, one per invariant. Each returns one result per relevant
//! team; running the same input twice produces identical results.

use serde_json::json;

use crate::progress::Feed;

use super::records::{StandingsRecord, TeamStanding};
use super::result::{Severity, ValidationResult, ValidationSummary, ValidationScope};

/// Run every standings invariant over every team.
pub fn validate_standings(record: &StandingsRecord) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    for team in &record.teams {
        results.push(check_games_played(team));
        results.push(check_points(team));
        if let Some(r) = check_goal_differential(team) {
            results.push(r);
        }
        if let Some(r) = check_regulation_wins(team) {
            results.push(r);
        }
        if let Some(r) = check_points_pct_range(team) {
            results.push(r);
        }
    }
    results
}

/// Convenience wrapper producing the season-level summary.
pub fn summarize_standings(record: &StandingsRecord, entity: impl Into<String>) -> ValidationSummary {
    ValidationSummary::from_results(
        ValidationScope::Standings,
        entity,
        validate_standings(record),
    )
}

/// games_played = wins + losses + ot_losses
pub fn check_games_played(team: &TeamStanding) -> ValidationResult {
    let expected = team.wins + team.losses + team.ot_losses;
    equality_rule(
        "standings_games_played",
        team,
        team.games_played as i64,
        expected as i64,
        "games played equals wins + losses + OT losses",
    )
}

/// points = 2 * wins + ot_losses
pub fn check_points(team: &TeamStanding) -> ValidationResult {
    let expected = 2 * team.wins + team.ot_losses;
    equality_rule(
        "standings_points",
        team,
        team.points as i64,
        expected as i64,
        "points equal 2*wins + OT losses",
    )
}

/// goal_differential = goals_for - goals_against (when reported)
pub fn check_goal_differential(team: &TeamStanding) -> Option<ValidationResult> {
    let reported = team.goal_differential?;
    let expected = team.goals_for as i64 - team.goals_against as i64;
    Some(equality_rule(
        "standings_goal_differential",
        team,
        reported,
        expected,
        "goal differential equals goals for minus goals against",
    ))
}

/// regulation_wins <= wins (when reported)
pub fn check_regulation_wins(team: &TeamStanding) -> Option<ValidationResult> {
    let regulation = team.regulation_wins?;
    let result = if regulation <= team.wins {
        ValidationResult::pass(
            "standings_regulation_wins",
            Feed::Standings,
            "regulation wins within total wins",
        )
    } else {
        ValidationResult::fail(
            "standings_regulation_wins",
            Feed::Standings,
            Severity::Error,
            format!(
                "{} regulation wins {} exceed total wins {}",
                team.team, regulation, team.wins
            ),
        )
        .with_details(json!({"actual": regulation, "maximum": team.wins}))
    };
    Some(result.with_entity(&team.team))
}

/// points percentage within [0, 100] (when reported)
pub fn check_points_pct_range(team: &TeamStanding) -> Option<ValidationResult> {
    let pct = team.points_pct?;
    let result = if (0.0..=100.0).contains(&pct) {
        ValidationResult::pass(
            "standings_points_pct_range",
            Feed::Standings,
            "points percentage in range",
        )
    } else {
        ValidationResult::fail(
            "standings_points_pct_range",
            Feed::Standings,
            Severity::Error,
            format!("{} points percentage {} outside [0, 100]", team.team, pct),
        )
        .with_details(json!({"actual": pct, "minimum": 0.0, "maximum": 100.0}))
    };
    Some(result.with_entity(&team.team))
}

fn equality_rule(
    rule: &str,
    team: &TeamStanding,
    actual: i64,
    expected: i64,
    description: &str,
) -> ValidationResult {
    let result = if actual == expected {
        ValidationResult::pass(rule, Feed::Standings, description)
    } else {
        ValidationResult::fail(
            rule,
            Feed::Standings,
            Severity::Error,
            format!(
                "{}: {} reported {} but calculated {}",
                team.team, rule, actual, expected
            ),
        )
        .with_details(json!({"actual": actual, "expected": expected}))
    };
    result.with_entity(&team.team)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> TeamStanding {
        TeamStanding {
            team: "BOS".into(),
            games_played: 80,
            wins: 40,
            losses: 30,
            ot_losses: 10,
            points: 90,
            regulation_wins: Some(34),
            goals_for: 250,
            goals_against: 220,
            goal_differential: Some(30),
            points_pct: Some(56.25),
        }
    }

    #[test]
    fn games_played_passes_when_sum_matches() {
        let r = check_games_played(&team());
        assert!(r.passed);
        assert_eq!(r.severity, Severity::Info);
        assert_eq!(r.entity.as_deref(), Some("BOS"));
    }

    #[test]
    fn games_played_failure_reports_calculated_value() {
        let mut t = team();
        t.games_played = 79;
        let r = check_games_played(&t);
        assert!(!r.passed);
        assert_eq!(r.severity, Severity::Error);
        let details = r.details.unwrap();
        assert_eq!(details["actual"], 79);
        assert_eq!(details["expected"], 80);
    }

    #[test]
    fn points_formula() {
        assert!(check_points(&team()).passed);
        let mut t = team();
        t.points = 91;
        let r = check_points(&t);
        assert!(!r.passed);
        assert_eq!(r.details.unwrap()["expected"], 90);
    }

    #[test]
    fn goal_differential_and_regulation_wins() {
        assert!(check_goal_differential(&team()).unwrap().passed);
        assert!(check_regulation_wins(&team()).unwrap().passed);

        let mut t = team();
        t.goal_differential = Some(31);
        assert!(!check_goal_differential(&t).unwrap().passed);

        t = team();
        t.regulation_wins = Some(41);
        assert!(!check_regulation_wins(&t).unwrap().passed);

        t = team();
        t.goal_differential = None;
        assert!(check_goal_differential(&t).is_none());
    }

    #[test]
    fn points_pct_range() {
        assert!(check_points_pct_range(&team()).unwrap().passed);
        let mut t = team();
        t.points_pct = Some(105.0);
        assert!(!check_points_pct_range(&t).unwrap().passed);
        t.points_pct = Some(-0.5);
        assert!(!check_points_pct_range(&t).unwrap().passed);
    }

    #[test]
    fn standings_run_is_deterministic() {
        let record = StandingsRecord {
            teams: vec![team(), {
                let mut t = team();
                t.team = "TOR".into();
                t.points = 95;
                t
            }],
        };
        let first = validate_standings(&record);
        let second = validate_standings(&record);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.rule, b.rule);
            assert_eq!(a.passed, b.passed);
            assert_eq!(a.entity, b.entity);
        }
        // One failing rule: TOR's points arithmetic.
        let failures: Vec<_> = first.iter().filter(|r| !r.passed).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].entity.as_deref(), Some("TOR"));
    }
}
