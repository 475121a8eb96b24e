//! Retention predicate for fetched scorecards.

use chrono::{DateTime, Datelike};
use serde_json::Value;

/// Game-type ids retained by the pipeline
pub const ALLOWED_GAME_TYPE_IDS: [i64; 5] = [1, 2, 3, 6, 24];

/// Earliest match year retained
pub const MIN_MATCH_YEAR: i32 = 2019;

/// Whether a fetched scorecard qualifies for retention.
///
/// Fail-closed: anything missing or unparseable rejects the match.
pub fn is_valid_match(data: &Value) -> bool {
    let fixture = &data["fixture"];

    // Women's competitions are out of scope; an absent flag rejects
    let is_womens = fixture["competition"]["isWomensCompetition"]
        .as_bool()
        .unwrap_or(true);
    if is_womens {
        return false;
    }

    let Some(start) = fixture["startDateTime"].as_str() else {
        return false;
    };
    let Ok(start_date) = DateTime::parse_from_rfc3339(start) else {
        return false;
    };
    if start_date.year() < MIN_MATCH_YEAR {
        return false;
    }

    let Some(game_type_id) = fixture["gameTypeId"].as_i64() else {
        return false;
    };
    if !ALLOWED_GAME_TYPE_IDS.contains(&game_type_id) {
        return false;
    }

    let result = fixture["resultType"].as_str().unwrap_or("No Result");
    if result == "No Result" || result == "Abandoned" {
        return false;
    }

    true
}
