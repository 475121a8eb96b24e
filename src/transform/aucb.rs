//! cricket.com.au document set → replay inputs.
//!
//! A match arrives as a fixture summary, a scorecard (carrying the player
//! roster), and up to four innings documents of nested overs and balls.

use anyhow::Result;
use chrono::NaiveDateTime;
use serde_json::Value;

use super::types::{DismissalKind, MatchContext, PlayerLookup, PlayerRef, RawEvent};

/// Format `2024-11-22T03:30:00Z` as `2024-11-22`, falling back to the raw
/// string when the timestamp doesn't parse.
fn format_date(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ") {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Legal-delivery cap by game type; extended formats have none, which
/// also disables chase metrics for them.
fn max_balls_for_game_type(game_type: Option<&str>) -> Option<i64> {
    match game_type {
        Some(t) if t.contains("T20") => Some(120),
        Some(t) if t.contains("One Day") || t.contains("ODI") => Some(300),
        _ => None,
    }
}

/// Build the player lookup from the scorecard roster
pub fn build_players(scorecard: &Value) -> PlayerLookup {
    let mut players = PlayerLookup::new();

    for player in scorecard["players"].as_array().into_iter().flatten() {
        let Some(id) = player["id"].as_i64() else {
            continue;
        };
        players.insert(
            id,
            PlayerRef {
                name: player["displayName"].as_str().map(str::to_string),
                date_of_birth: player["dob"].as_str().map(format_date),
                country: player["nationality"].as_str().map(str::to_string),
                ..PlayerRef::default()
            },
        );
    }

    players
}

/// Extract the match-level fields shared by every record
pub fn build_context(fixture: &Value, scorecard: &Value) -> MatchContext {
    let home = fixture["homeTeam"]["name"].as_str().map(str::to_string);
    let away = fixture["awayTeam"]["name"].as_str().map(str::to_string);

    let toss = if fixture["homeTeam"]["isTossWinner"].as_bool().unwrap_or(false) {
        home.clone()
    } else {
        away.clone()
    };
    let winner = if fixture["homeTeam"]["isMatchWinner"].as_bool().unwrap_or(false) {
        home.clone()
    } else {
        away.clone()
    };

    let date = fixture["startDateTime"].as_str().map(format_date);
    let year = date
        .as_deref()
        .and_then(|d| d.split('-').next())
        .map(str::to_string);
    let game_type = fixture["gameType"].as_str();

    MatchContext {
        match_id: fixture["id"]
            .as_i64()
            .map(|id| id.to_string())
            .unwrap_or_default(),
        team1: home,
        team2: away,
        date,
        year,
        ground: fixture["venue"]["name"].as_str().map(str::to_string),
        country: fixture["venue"]["country"]["name"].as_str().map(str::to_string),
        competition: fixture["competition"]["name"].as_str().map(str::to_string),
        format: game_type.map(str::to_string),
        winner,
        toss,
        toss_decision: fixture["tossDecision"].as_str().map(str::to_string),
        win_type: scorecard["fixture"]["winType"].as_str().map(str::to_string),
        win_margin: scorecard["fixture"]["winningMargin"].as_i64(),
        target: None,
        max_balls: max_balls_for_game_type(game_type),
    }
}

/// Flatten one innings document's overs into events
pub fn build_events(inning_number: u8, inning_doc: &Value) -> Vec<RawEvent> {
    let mut events = Vec::new();

    for over in inning_doc["inning"]["overs"].as_array().into_iter().flatten() {
        let over_number = over["overNumber"].as_u64().unwrap_or(0) as u32;

        for ball in over["balls"].as_array().into_iter().flatten() {
            let runs = ball["runs"].as_i64().unwrap_or(0);
            let wides = ball["wides"].as_i64().unwrap_or(0);
            let noballs = ball["noBalls"].as_i64().unwrap_or(0);
            let byes = ball["byes"].as_i64().unwrap_or(0);
            let legbyes = ball["legByes"].as_i64().unwrap_or(0);
            let ball_number = ball["ballNumber"].as_u64().unwrap_or(0) as u32;
            let dismissal_text = ball["dismissalTypeName"]
                .as_str()
                .or(ball["dismissalText"].as_str())
                .map(str::to_string);

            events.push(RawEvent {
                innings: inning_number,
                over: over_number,
                ball_in_over: ball_number,
                ball_id: Some(format!("{}.{:02}", over_number, ball_number)),
                batter: ball["battingPlayerId"].as_i64(),
                bowler: ball["bowlerPlayerId"].as_i64(),
                non_striker: ball["nonStrikeBattingPlayerId"].as_i64(),
                dismissed: ball["dismissalPlayerId"].as_i64(),
                batsman_runs: runs,
                wides,
                noballs,
                byes,
                legbyes,
                total_runs: runs + wides + noballs + byes + legbyes,
                is_wicket: ball["isWicket"].as_bool().unwrap_or(false),
                dismissal: dismissal_text.as_deref().map(DismissalKind::from_name),
                dismissal_text,
                is_four: ball["isFour"].as_bool().unwrap_or(false),
                is_six: ball["isSix"].as_bool().unwrap_or(false),
                ..RawEvent::default()
            });
        }
    }

    events
}

/// Assemble replay inputs from a full aucb document set.
///
/// Returns the context, the roster lookup, and the flattened event list;
/// the first-innings total (when present) fixes the chase target.
pub fn prepare(
    fixture: &Value,
    scorecard: &Value,
    innings: &[(u8, Value)],
) -> Result<(MatchContext, PlayerLookup, Vec<RawEvent>)> {
    let mut context = build_context(fixture, scorecard);
    let players = build_players(scorecard);

    let mut events = Vec::new();
    for (number, doc) in innings {
        events.extend(build_events(*number, doc));
    }

    let first_innings_runs: i64 = events
        .iter()
        .filter(|e| e.innings == 1)
        .map(|e| e.total_runs)
        .sum();
    if events.iter().any(|e| e.innings == 2) {
        context.target = Some(first_innings_runs + 1);
    }

    Ok((context, players, events))
}
