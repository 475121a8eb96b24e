//! ESPNcricinfo commentary document → replay inputs.
//!
//! The second-provider format carries everything in one document: match
//! metadata, per-innings rosters, and the comment stream holding one entry
//! per delivery (plus over summaries, which carry no player ids and are
//! dropped during replay).

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::{DismissalKind, MatchContext, PlayerLookup, PlayerRef, RawEvent};

/// International team id → country name
fn country_name(team_id: i64) -> Option<&'static str> {
    let name = match team_id {
        0 => "Unknown",
        40 => "Afghanistan",
        2 => "Australia",
        25 => "Bangladesh",
        1 => "England",
        6 => "India",
        29 => "Ireland",
        5 => "New Zealand",
        7 => "Pakistan",
        3 => "South Africa",
        8 => "Sri Lanka",
        4 => "West Indies",
        9 => "Zimbabwe",
        28 => "Namibia",
        33 => "Nepal",
        15 => "Netherlands",
        37 => "Oman",
        20 => "Papua New Guinea",
        30 => "Scotland",
        27 => "United Arab Emirates",
        11 => "United States of America",
        _ => return None,
    };
    Some(name)
}

/// Map a detailed bowling style to its general kind
fn bowling_kind(style: Option<&str>) -> Option<String> {
    let style = style?.to_lowercase();
    if style.contains("fast") || style.contains("medium") || style.contains("pace") {
        Some("pace bowler".to_string())
    } else {
        Some("spin bowler".to_string())
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// Validate and format a component date of birth, clamping out-of-range
/// days into the month instead of discarding the date.
fn validate_dob(dob: &Value) -> Option<String> {
    let year = dob["year"].as_i64()? as i32;
    let month = dob["month"].as_i64()? as u32;
    let mut day = dob["date"].as_i64()? as u32;

    if !(1..=12).contains(&month) {
        return None;
    }
    let last_day = days_in_month(year, month);
    day = day.clamp(1, last_day);

    Some(format!("{:04}-{:02}-{:02}", year, month, day))
}

fn first_style(player: &Value, key: &str) -> Option<String> {
    player[key]
        .as_array()
        .and_then(|styles| styles.first())
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn player_country(player: &Value) -> Option<String> {
    country_name(player["countryTeamId"].as_i64().unwrap_or(0)).map(str::to_string)
}

/// Team id → name, in document order
fn team_names(match_info: &Value) -> BTreeMap<i64, String> {
    let mut names = BTreeMap::new();
    for entry in match_info["teams"].as_array().into_iter().flatten() {
        if let (Some(id), Some(name)) = (
            entry["team"]["id"].as_i64(),
            entry["team"]["longName"].as_str(),
        ) {
            names.insert(id, name.to_string());
        }
    }
    names
}

/// Build the player lookup from captains and the per-innings rosters.
///
/// A bowler first seen in an innings is assigned to the side not batting
/// it; players whose team is still unknown get the same opposite-side
/// inference when they reappear.
pub fn build_players(match_info: &Value, innings_data: &[Value]) -> PlayerLookup {
    let teams = team_names(match_info);
    let mut players = PlayerLookup::new();

    for entry in match_info["teams"].as_array().into_iter().flatten() {
        let team_name = entry["team"]["longName"].as_str().map(str::to_string);
        let captain = &entry["captain"];
        let Some(id) = captain["id"].as_i64() else {
            continue;
        };
        players.entry(id).or_insert_with(|| {
            let bowl_style = first_style(captain, "longBowlingStyles");
            PlayerRef {
                name: captain["longName"].as_str().map(str::to_string),
                date_of_birth: validate_dob(&captain["dateOfBirth"]),
                country: player_country(captain),
                team_name,
                bat_hand: first_style(captain, "longBattingStyles"),
                bowl_kind: bowling_kind(bowl_style.as_deref()),
                bowl_style,
            }
        });
    }

    for inn in innings_data {
        let batting_team_id = inn["team"]["id"].as_i64();
        let batting_team = batting_team_id.and_then(|id| teams.get(&id).cloned());
        let opposite_team = teams
            .iter()
            .find(|(id, _)| Some(**id) != batting_team_id)
            .map(|(_, name)| name.clone());

        for batsman in inn["inningBatsmen"].as_array().into_iter().flatten() {
            let player = &batsman["player"];
            let Some(id) = player["id"].as_i64() else {
                continue;
            };
            let bat_hand = first_style(player, "longBattingStyles");
            let bowl_style = first_style(player, "longBowlingStyles");

            let entry = players.entry(id).or_insert_with(|| PlayerRef {
                name: player["longName"].as_str().map(str::to_string),
                date_of_birth: validate_dob(&player["dateOfBirth"]),
                country: player_country(player),
                team_name: batting_team.clone(),
                bowl_kind: bowling_kind(bowl_style.as_deref()),
                bowl_style,
                bat_hand: None,
            });
            entry.bat_hand = bat_hand;
            if entry.team_name.is_none() {
                entry.team_name = batting_team.clone();
            }
        }

        for bowler in inn["inningBowlers"].as_array().into_iter().flatten() {
            let player = &bowler["player"];
            let Some(id) = player["objectId"].as_i64() else {
                continue;
            };
            let bat_hand = first_style(player, "longBattingStyles");
            let bowl_style = first_style(player, "longBowlingStyles");
            let bowl_kind = bowling_kind(bowl_style.as_deref());

            let entry = players.entry(id).or_insert_with(|| PlayerRef {
                name: player["longName"].as_str().map(str::to_string),
                date_of_birth: validate_dob(&player["dateOfBirth"]),
                country: player_country(player),
                team_name: opposite_team.clone(),
                bat_hand,
                bowl_style: None,
                bowl_kind: None,
            });
            entry.bowl_style = bowl_style;
            entry.bowl_kind = bowl_kind;
            if entry.team_name.is_none() {
                entry.team_name = opposite_team.clone();
            }
        }
    }

    players
}

/// Extract the match-level fields shared by every record
pub fn build_context(match_info: &Value, innings_data: &[Value]) -> MatchContext {
    let teams = team_names(match_info);
    let team_list = match_info["teams"].as_array();
    let team_at = |index: usize| {
        team_list
            .and_then(|t| t.get(index))
            .and_then(|e| e["team"]["longName"].as_str())
            .map(str::to_string)
    };

    let date = match_info["startDate"]
        .as_str()
        .map(|s| s.split('T').next().unwrap_or(s).to_string());
    let year = date
        .as_deref()
        .and_then(|d| d.split('-').next())
        .map(str::to_string);

    let winner = match_info["winnerTeamId"]
        .as_i64()
        .and_then(|id| teams.get(&id).cloned());
    let toss = match_info["tossWinnerTeamId"]
        .as_i64()
        .and_then(|id| teams.get(&id).cloned());

    let competition = if match_info["internationalClassId"].as_i64().unwrap_or(0) != 0 {
        Some("T20I".to_string())
    } else {
        match_info["series"]["longName"].as_str().map(str::to_string)
    };

    let status_text = match_info["statusText"].as_str().unwrap_or("");
    let win_type = if status_text.contains("wickets") {
        "wickets"
    } else {
        "runs"
    };
    let margin_re = Regex::new(r"by (\d+) (runs|wickets)").expect("static regex");
    let win_margin = margin_re
        .captures(status_text)
        .and_then(|caps| caps[1].parse::<i64>().ok());

    let max_balls = match match_info["scheduledOvers"].as_i64() {
        Some(overs) if overs > 0 => Some(overs * 6),
        _ => Some(120),
    };
    let target = innings_data
        .first()
        .and_then(|inn| inn["runs"].as_i64())
        .map(|runs| runs + 1);

    MatchContext {
        match_id: match_info["objectId"]
            .as_i64()
            .map(|id| id.to_string())
            .unwrap_or_default(),
        team1: team_at(0),
        team2: team_at(1),
        date,
        year,
        ground: match_info["ground"]["name"].as_str().map(str::to_string),
        country: match_info["ground"]["country"]["name"]
            .as_str()
            .map(str::to_string),
        competition,
        format: match_info["format"].as_str().map(str::to_string),
        winner,
        toss,
        toss_decision: Some(
            if match_info["tossWinnerChoice"].as_i64() == Some(1) {
                "bat"
            } else {
                "bowl"
            }
            .to_string(),
        ),
        win_type: Some(win_type.to_string()),
        win_margin,
        target,
        max_balls,
    }
}

/// One comment stream entry → one event, when it describes a delivery
fn build_event(comment: &Value) -> Option<RawEvent> {
    // Over summaries and other chatter lack the sequence keys
    let innings = comment["inningNumber"].as_u64()? as u8;
    let over = comment["overNumber"].as_u64()? as u32;
    let ball_in_over = comment["ballNumber"].as_u64()? as u32;
    comment.get("oversActual")?;

    let batsman_runs = comment["batsmanRuns"].as_i64().unwrap_or(0);
    let wides = comment["wides"].as_i64().unwrap_or(0);
    let noballs = comment["noballs"].as_i64().unwrap_or(0);
    let byes = comment["byes"].as_i64().unwrap_or(0);
    let legbyes = comment["legbyes"].as_i64().unwrap_or(0);
    let is_wicket = comment["isWicket"].as_bool().unwrap_or(false);

    let dismissal_text = comment["dismissalText"]["short"]
        .as_str()
        .or(comment["dismissalText"]["long"].as_str())
        .filter(|_| is_wicket)
        .map(str::to_string);

    // 1 is controlled, 2 uncontrolled
    let control = match comment["shotControl"].as_i64() {
        Some(1) => Some(1.0),
        Some(2) => Some(0.0),
        _ => None,
    };

    Some(RawEvent {
        innings,
        over,
        ball_in_over,
        ball_id: comment["oversUnique"].as_str().map(str::to_string),
        batter: comment["batsmanPlayerId"].as_i64().filter(|&id| id != 0),
        bowler: comment["bowlerPlayerId"].as_i64().filter(|&id| id != 0),
        non_striker: comment["nonStrikerPlayerId"].as_i64().filter(|&id| id != 0),
        dismissed: comment["outPlayerId"].as_i64().filter(|&id| id != 0),
        batsman_runs,
        wides,
        noballs,
        byes,
        legbyes,
        total_runs: comment["totalRuns"].as_i64().unwrap_or(0),
        is_wicket,
        dismissal: comment["dismissalType"].as_i64().map(DismissalKind::from_code),
        dismissal_text,
        is_four: comment["isFour"].as_bool().unwrap_or(false),
        is_six: comment["isSix"].as_bool().unwrap_or(false),
        wagon_x: comment["wagonX"].as_i64().unwrap_or(0),
        wagon_y: comment["wagonY"].as_i64().unwrap_or(0),
        wagon_zone: comment["wagonZone"].as_i64().unwrap_or(0),
        line: comment["pitchLine"].as_str().map(str::to_string),
        length: comment["pitchLength"].as_str().map(str::to_string),
        shot: comment["shotType"].as_str().map(str::to_string),
        control,
        predscore: comment["predictions"]["score"].as_i64(),
        win_prob: comment["predictions"]["winProbability"].as_f64(),
    })
}

/// Assemble replay inputs from a commentary document
pub fn prepare(commentary: &Value) -> Result<(MatchContext, PlayerLookup, Vec<RawEvent>)> {
    let match_info = &commentary["match"];
    let content = &commentary["content"];

    let innings_data: Vec<Value> = content["innings"].as_array().cloned().unwrap_or_default();
    let context = build_context(match_info, &innings_data);
    let players = build_players(match_info, &innings_data);

    let events = content["comments"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(build_event)
        .collect();

    Ok((context, players, events))
}
