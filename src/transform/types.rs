//! Data model for the ball-by-ball transform.
//!
//! Provider adapters reduce their raw document sets to the same three
//! inputs (match context, player lookup, event list); the replay engine
//! only ever sees these types.

use serde::Serialize;
use std::collections::HashMap;

/// Match-level fields shared by every output record.
///
/// Built once per match and referenced read-only by the record builder;
/// never mutated during replay.
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    pub match_id: String,
    pub team1: Option<String>,
    pub team2: Option<String>,
    pub date: Option<String>,
    pub year: Option<String>,
    pub ground: Option<String>,
    pub country: Option<String>,
    pub competition: Option<String>,
    pub format: Option<String>,
    pub winner: Option<String>,
    pub toss: Option<String>,
    pub toss_decision: Option<String>,
    pub win_type: Option<String>,
    pub win_margin: Option<i64>,
    /// First-innings total + 1, when known
    pub target: Option<i64>,
    /// Legal-delivery cap of the format; absent for unlimited formats
    pub max_balls: Option<i64>,
}

impl MatchContext {
    /// Batting side for an innings when the rosters don't pin it down:
    /// odd innings are batted by team1, even by team2.
    pub fn batting_team(&self, innings: u8) -> Option<String> {
        if innings % 2 == 1 {
            self.team1.clone()
        } else {
            self.team2.clone()
        }
    }

    pub fn bowling_team(&self, innings: u8) -> Option<String> {
        if innings % 2 == 1 {
            self.team2.clone()
        } else {
            self.team1.clone()
        }
    }
}

/// Denormalized player attributes, resolved once per match
#[derive(Debug, Clone, Default)]
pub struct PlayerRef {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub country: Option<String>,
    pub team_name: Option<String>,
    pub bat_hand: Option<String>,
    pub bowl_style: Option<String>,
    pub bowl_kind: Option<String>,
}

/// Lookup from player id to resolved attributes
pub type PlayerLookup = HashMap<i64, PlayerRef>;

/// Dismissal kind of a wicket event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissalKind {
    Caught,
    Bowled,
    Lbw,
    RunOut,
    Stumped,
    HitWicket,
    Other,
}

impl DismissalKind {
    /// Decode the provider-B numeric dismissal code
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => DismissalKind::Caught,
            2 => DismissalKind::Bowled,
            3 => DismissalKind::Lbw,
            4 => DismissalKind::RunOut,
            5 => DismissalKind::Stumped,
            11 => DismissalKind::HitWicket,
            _ => DismissalKind::Other,
        }
    }

    /// Decode a provider-A dismissal name
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("run out") {
            DismissalKind::RunOut
        } else if name.contains("caught") {
            DismissalKind::Caught
        } else if name.contains("bowled") {
            DismissalKind::Bowled
        } else if name.contains("lbw") || name.contains("leg before") {
            DismissalKind::Lbw
        } else if name.contains("stumped") {
            DismissalKind::Stumped
        } else if name.contains("hit wicket") {
            DismissalKind::HitWicket
        } else {
            DismissalKind::Other
        }
    }

    /// Whether the bowler is credited with this wicket.
    /// Run-outs and the like count against the innings but not the bowler.
    pub fn credits_bowler(&self) -> bool {
        matches!(
            self,
            DismissalKind::Caught
                | DismissalKind::Bowled
                | DismissalKind::Lbw
                | DismissalKind::Stumped
                | DismissalKind::HitWicket
        )
    }
}

/// One atomic scoring event inside an innings
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    pub innings: u8,
    pub over: u32,
    pub ball_in_over: u32,
    /// Provider ball identifier, e.g. "18.04"
    pub ball_id: Option<String>,

    pub batter: Option<i64>,
    pub bowler: Option<i64>,
    pub non_striker: Option<i64>,
    pub dismissed: Option<i64>,

    pub batsman_runs: i64,
    pub wides: i64,
    pub noballs: i64,
    pub byes: i64,
    pub legbyes: i64,
    pub total_runs: i64,

    pub is_wicket: bool,
    pub dismissal: Option<DismissalKind>,
    pub dismissal_text: Option<String>,
    pub is_four: bool,
    pub is_six: bool,

    pub wagon_x: i64,
    pub wagon_y: i64,
    pub wagon_zone: i64,
    pub line: Option<String>,
    pub length: Option<String>,
    pub shot: Option<String>,
    pub control: Option<f64>,
    pub predscore: Option<i64>,
    pub win_prob: Option<f64>,
}

impl RawEvent {
    /// (innings, over, ball) ordering key; the replay order
    pub fn sort_key(&self) -> (u8, u32, u32) {
        (self.innings, self.over, self.ball_in_over)
    }

    /// Neither a wide nor a no-ball; only these count toward ball quotas
    pub fn is_legal_delivery(&self) -> bool {
        self.wides == 0 && self.noballs == 0
    }

    /// Runs charged to the bowler: everything except byes and leg-byes
    pub fn runs_conceded(&self) -> i64 {
        self.total_runs - self.byes - self.legbyes
    }
}

/// Outcome label of one delivery, exactly one per event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Wicket,
    Wide,
    NoballFour,
    NoballSix,
    NoballRun,
    Noball,
    Four,
    Six,
    Run,
    NoRun,
}

impl Outcome {
    /// Classify a delivery. Precedence is fixed: wicket, wide, no-ball
    /// (sub-labelled by off-bat runs), four, six, any runs, no run.
    pub fn classify(event: &RawEvent) -> Self {
        if event.is_wicket {
            return Outcome::Wicket;
        }
        if event.wides > 0 {
            return Outcome::Wide;
        }
        if event.noballs > 0 {
            return match event.batsman_runs {
                4 => Outcome::NoballFour,
                6 => Outcome::NoballSix,
                r if r > 0 => Outcome::NoballRun,
                _ => Outcome::Noball,
            };
        }
        if event.is_four {
            return Outcome::Four;
        }
        if event.is_six {
            return Outcome::Six;
        }
        if event.batsman_runs > 0 || event.byes > 0 || event.legbyes > 0 {
            return Outcome::Run;
        }
        Outcome::NoRun
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Wicket => "wicket",
            Outcome::Wide => "wide",
            Outcome::NoballFour => "noball+four",
            Outcome::NoballSix => "noball+six",
            Outcome::NoballRun => "noball+run",
            Outcome::Noball => "noball",
            Outcome::Four => "four",
            Outcome::Six => "six",
            Outcome::Run => "run",
            Outcome::NoRun => "no run",
        }
    }
}

/// Flattened output record: one per substantive delivery
#[derive(Debug, Clone, Serialize)]
pub struct BallRecord {
    pub p_match: String,
    pub inns: u8,
    pub team1: Option<String>,
    pub team2: Option<String>,

    pub p_bat: Option<i64>,
    pub bat: Option<String>,
    pub bat_country: Option<String>,
    pub bat_date_of_birth: Option<String>,

    pub p_non_striker: Option<i64>,
    pub non_striker: Option<String>,
    pub non_striker_date_of_birth: Option<String>,
    pub non_striker_country: Option<String>,

    pub team_bat: Option<String>,
    pub team_bowl: Option<String>,

    pub p_bowl: Option<i64>,
    pub bowl: Option<String>,
    pub bowl_date_of_birth: Option<String>,
    pub bowl_country: Option<String>,

    pub ball: u32,
    pub ball_id: Option<String>,
    pub outcome: &'static str,
    pub score: i64,
    pub out: bool,
    pub dismissal: Option<String>,
    pub p_out: Option<i64>,
    pub over: u32,
    pub noball: i64,
    pub wide: i64,
    pub byes: i64,
    pub legbyes: i64,

    pub cur_bat_runs: i64,
    pub cur_bat_bf: i64,
    pub cur_bowl_ovr: f64,
    pub cur_bowl_wkts: i64,
    pub cur_bowl_runs: i64,
    pub inns_runs: i64,
    pub inns_wkts: i64,
    pub inns_balls: i64,
    pub inns_runs_rem: Option<f64>,
    pub inns_balls_rem: Option<i64>,
    pub inns_rr: Option<f64>,
    pub inns_rrr: Option<f64>,
    pub target: Option<f64>,
    pub max_balls: Option<i64>,

    pub date: Option<String>,
    pub year: Option<String>,
    pub ground: Option<String>,
    pub country: Option<String>,
    pub winner: Option<String>,
    pub toss: Option<String>,
    pub toss_decision: Option<String>,
    pub win_type: Option<String>,
    pub win_margin: Option<i64>,
    pub competition: Option<String>,
    pub bat_hand: Option<String>,
    pub bowl_style: Option<String>,
    pub bowl_kind: Option<String>,

    pub batruns: i64,
    pub ballfaced: i64,
    pub bowlruns: i64,
    #[serde(rename = "wagonX")]
    pub wagon_x: i64,
    #[serde(rename = "wagonY")]
    pub wagon_y: i64,
    #[serde(rename = "wagonZone")]
    pub wagon_zone: i64,
    pub line: Option<String>,
    pub length: Option<String>,
    pub shot: Option<String>,
    pub control: Option<f64>,
    pub predscore: i64,
    pub wprob: f64,
}
