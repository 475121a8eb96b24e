//! Stateful replay of one match's events into enriched records.
//!
//! Events are replayed strictly in (innings, over, ball) order; every
//! downstream aggregate assumes that ordering. All state is local to one
//! `replay` call and discarded afterwards — aggregates are only ever
//! persisted as the snapshot embedded in each output record.

use std::collections::HashMap;

use super::types::{BallRecord, MatchContext, Outcome, PlayerLookup, PlayerRef, RawEvent};

/// Per-innings running totals
#[derive(Debug, Default, Clone, Copy)]
struct InningsTotals {
    runs: i64,
    wkts: i64,
    balls: i64,
}

/// Per-(innings, batter) running totals
#[derive(Debug, Default, Clone, Copy)]
struct BatterTotals {
    runs: i64,
    balls_faced: i64,
}

/// Per-(innings, bowler) running totals
#[derive(Debug, Default, Clone, Copy)]
struct BowlerTotals {
    balls: i64,
    runs: i64,
    wkts: i64,
}

/// Replay a match's events in chronological order, emitting one enriched
/// record per substantive event.
///
/// Events missing a batter or bowler id are skipped without touching any
/// aggregate. The input order does not matter; the engine establishes the
/// replay order itself.
pub fn replay(ctx: &MatchContext, players: &PlayerLookup, mut events: Vec<RawEvent>) -> Vec<BallRecord> {
    events.sort_by_key(RawEvent::sort_key);

    let mut innings_stats: HashMap<u8, InningsTotals> = HashMap::new();
    let mut batter_stats: HashMap<(u8, i64), BatterTotals> = HashMap::new();
    let mut bowler_stats: HashMap<(u8, i64), BowlerTotals> = HashMap::new();

    let mut records = Vec::with_capacity(events.len());

    for event in &events {
        let (Some(batter_id), Some(bowler_id)) = (event.batter, event.bowler) else {
            // Over summaries and other non-deliveries carry no player ids
            continue;
        };

        let innings = innings_stats.entry(event.innings).or_default();
        let batter = batter_stats.entry((event.innings, batter_id)).or_default();
        let bowler = bowler_stats.entry((event.innings, bowler_id)).or_default();

        innings.runs += event.total_runs;
        if event.is_legal_delivery() {
            innings.balls += 1;
            batter.balls_faced += 1;
            bowler.balls += 1;
        }
        batter.runs += event.batsman_runs;
        bowler.runs += event.runs_conceded();

        if event.is_wicket {
            innings.wkts += 1;
            if event.dismissal.is_some_and(|kind| kind.credits_bowler()) {
                bowler.wkts += 1;
            }
        }

        records.push(build_record(
            ctx, players, event, batter_id, bowler_id, *innings, *batter, *bowler,
        ));
    }

    records
}

#[allow(clippy::too_many_arguments)]
fn build_record(
    ctx: &MatchContext,
    players: &PlayerLookup,
    event: &RawEvent,
    batter_id: i64,
    bowler_id: i64,
    innings: InningsTotals,
    batter: BatterTotals,
    bowler: BowlerTotals,
) -> BallRecord {
    let empty = PlayerRef::default();
    let batter_ref = players.get(&batter_id).unwrap_or(&empty);
    let bowler_ref = players.get(&bowler_id).unwrap_or(&empty);
    let non_striker_ref = event
        .non_striker
        .and_then(|id| players.get(&id))
        .unwrap_or(&empty);

    let team_bat = batter_ref
        .team_name
        .clone()
        .or_else(|| ctx.batting_team(event.innings));
    let team_bowl = bowler_ref
        .team_name
        .clone()
        .or_else(|| ctx.bowling_team(event.innings));

    // Bowler's overs figure: completed overs, tenths are balls into the over
    let cur_bowl_ovr = (bowler.balls / 6) as f64 + (bowler.balls % 6) as f64 / 10.0;

    let (inns_runs_rem, inns_balls_rem, inns_rrr) = chase_metrics(ctx, event.innings, innings);
    let inns_rr = if innings.balls > 0 {
        Some(round2(innings.runs as f64 * 6.0 / innings.balls as f64))
    } else {
        None
    };

    BallRecord {
        p_match: ctx.match_id.clone(),
        inns: event.innings,
        team1: ctx.team1.clone(),
        team2: ctx.team2.clone(),

        p_bat: Some(batter_id),
        bat: batter_ref.name.clone(),
        bat_country: batter_ref.country.clone(),
        bat_date_of_birth: batter_ref.date_of_birth.clone(),

        p_non_striker: event.non_striker,
        non_striker: non_striker_ref.name.clone(),
        non_striker_date_of_birth: non_striker_ref.date_of_birth.clone(),
        non_striker_country: non_striker_ref.country.clone(),

        team_bat,
        team_bowl,

        p_bowl: Some(bowler_id),
        bowl: bowler_ref.name.clone(),
        bowl_date_of_birth: bowler_ref.date_of_birth.clone(),
        bowl_country: bowler_ref.country.clone(),

        ball: event.ball_in_over,
        ball_id: event.ball_id.clone(),
        outcome: Outcome::classify(event).as_str(),
        score: event.total_runs,
        out: event.is_wicket,
        dismissal: event.dismissal_text.clone(),
        p_out: event.dismissed,
        over: event.over,
        noball: event.noballs,
        wide: event.wides,
        byes: event.byes,
        legbyes: event.legbyes,

        cur_bat_runs: batter.runs,
        cur_bat_bf: batter.balls_faced,
        cur_bowl_ovr,
        cur_bowl_wkts: bowler.wkts,
        cur_bowl_runs: bowler.runs,
        inns_runs: innings.runs,
        inns_wkts: innings.wkts,
        inns_balls: innings.balls,
        inns_runs_rem,
        inns_balls_rem,
        inns_rr,
        inns_rrr,
        target: ctx.target.map(|t| t as f64),
        max_balls: ctx.max_balls,

        date: ctx.date.clone(),
        year: ctx.year.clone(),
        ground: ctx.ground.clone(),
        country: ctx.country.clone(),
        winner: ctx.winner.clone(),
        toss: ctx.toss.clone(),
        toss_decision: ctx.toss_decision.clone(),
        win_type: ctx.win_type.clone(),
        win_margin: ctx.win_margin,
        competition: ctx.competition.clone(),
        bat_hand: batter_ref.bat_hand.clone(),
        bowl_style: bowler_ref.bowl_style.clone(),
        bowl_kind: bowler_ref.bowl_kind.clone(),

        batruns: event.batsman_runs,
        ballfaced: if event.is_legal_delivery() { 1 } else { 0 },
        bowlruns: event.runs_conceded(),
        wagon_x: event.wagon_x,
        wagon_y: event.wagon_y,
        wagon_zone: event.wagon_zone,
        line: event.line.clone(),
        length: event.length.clone(),
        shot: event.shot.clone(),
        control: event.control,
        predscore: event.predscore.unwrap_or(-1),
        wprob: event.win_prob.unwrap_or(-1.0),
    }
}

/// Remaining runs/balls and required run-rate, second innings only.
///
/// With the target met the required rate is 0.0; with balls exhausted and
/// runs still required it is absent rather than infinite.
fn chase_metrics(
    ctx: &MatchContext,
    innings_number: u8,
    innings: InningsTotals,
) -> (Option<f64>, Option<i64>, Option<f64>) {
    if innings_number != 2 {
        return (None, None, None);
    }
    let (Some(target), Some(max_balls)) = (ctx.target, ctx.max_balls) else {
        return (None, None, None);
    };

    let runs_rem = (target - innings.runs) as f64;
    let balls_rem = max_balls - innings.balls;

    let rrr = if balls_rem > 0 {
        if runs_rem > 0.0 {
            Some(round2(runs_rem * 6.0 / balls_rem as f64))
        } else {
            Some(0.0)
        }
    } else if runs_rem <= 0.0 {
        Some(0.0)
    } else {
        None
    };

    (Some(runs_rem), Some(balls_rem), rrr)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
