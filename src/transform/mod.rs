//! Parallel per-match transform orchestration.
//!
//! Each persisted raw match is one independent unit of work: read its
//! document set, replay the deliveries, write one NDJSON file. Units fan
//! out over a worker pool; a failed unit never stops the run.

pub mod aucb;
pub mod cricinfo;
pub mod engine;
pub mod types;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use crate::config::TransformConfig;
use crate::provider::{self, DocKind, Provider};
use crate::storage::{self, BlobStore};
use types::BallRecord;

/// Counts reported by one transform run
#[derive(Debug, Default, Clone, Copy)]
pub struct TransformReport {
    pub processed: usize,
    pub succeeded: usize,
    /// Already transformed, or recorded as void upstream
    pub skipped: usize,
    pub failed: usize,
}

impl TransformReport {
    /// A run succeeds when it produced or confirmed at least one output
    pub fn is_success(&self) -> bool {
        self.succeeded + self.skipped >= 1
    }
}

enum UnitStatus {
    Done,
    Skipped,
    Failed,
}

/// Transformer for one provider over one store
pub struct Transformer<'a> {
    provider: Provider,
    config: &'a TransformConfig,
    raw_root: &'a str,
    output_root: &'a str,
    store: &'a dyn BlobStore,
}

impl<'a> Transformer<'a> {
    pub fn new(
        provider: Provider,
        config: &'a TransformConfig,
        raw_root: &'a str,
        output_root: &'a str,
        store: &'a dyn BlobStore,
    ) -> Self {
        Self {
            provider,
            config,
            raw_root,
            output_root,
            store,
        }
    }

    /// Transform every raw match found in the store
    pub fn run(&self) -> Result<TransformReport> {
        let ids = self.list_units()?;
        let total = ids.len();
        info!("Found {} {} matches to transform", total, self.provider);

        if ids.is_empty() {
            return Ok(TransformReport::default());
        }

        let workers = self.worker_count();
        info!("Transforming with {} workers", workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("building worker pool")?;

        let interval = self.config.progress_interval.max(1);
        let completed = AtomicUsize::new(0);

        let statuses: Vec<UnitStatus> = pool.install(|| {
            ids.par_iter()
                .map(|&match_id| {
                    let status = self.transform_unit(match_id);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if done % interval == 0 {
                        info!("Processed {}/{} matches", done, total);
                    }
                    status
                })
                .collect()
        });

        let mut report = TransformReport::default();
        for status in statuses {
            report.processed += 1;
            match status {
                UnitStatus::Done => report.succeeded += 1,
                UnitStatus::Skipped => report.skipped += 1,
                UnitStatus::Failed => report.failed += 1,
            }
        }

        info!(
            "{} transform finished: {} processed, {} succeeded, {} skipped, {} failed",
            self.provider, report.processed, report.succeeded, report.skipped, report.failed
        );
        Ok(report)
    }

    fn worker_count(&self) -> usize {
        self.config
            .workers
            .unwrap_or_else(|| {
                let cores = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(2);
                cores.saturating_sub(1)
            })
            .max(1)
    }

    /// Enumerate transformable match ids by scanning for the document that
    /// anchors a unit: the fixture for aucb, the commentary for cricinfo.
    fn list_units(&self) -> Result<BTreeSet<i64>> {
        let marker = match self.provider {
            Provider::Aucb => DocKind::Fixture,
            Provider::Cricinfo => DocKind::Commentary,
        }
        .file_name();
        let prefix = provider::matches_prefix(self.raw_root, self.provider);
        let mut ids = BTreeSet::new();

        for path in self.store.list(&prefix)? {
            let mut parts = path.rsplit('/');
            if parts.next() != Some(marker.as_str()) {
                continue;
            }
            if let Some(Ok(id)) = parts.next().map(str::parse::<i64>) {
                ids.insert(id);
            }
        }

        Ok(ids)
    }

    /// Transform one match, classifying the result for the report
    fn transform_unit(&self, match_id: i64) -> UnitStatus {
        let output = provider::output_path(self.output_root, self.provider, match_id);
        if self.store.exists(&output) {
            debug!("Output exists for match {}, skipping", match_id);
            return UnitStatus::Skipped;
        }

        match self.replay_match(match_id) {
            Ok(None) => {
                debug!("Match {} is void, skipping", match_id);
                UnitStatus::Skipped
            }
            Ok(Some(records)) => match write_ndjson(self.store, &output, &records) {
                Ok(()) => {
                    debug!("Wrote {} records for match {}", records.len(), match_id);
                    UnitStatus::Done
                }
                Err(e) => {
                    warn!("Failed to write output for match {}: {:#}", match_id, e);
                    UnitStatus::Failed
                }
            },
            Err(e) => {
                warn!("Failed to transform {} match {}: {:#}", self.provider, match_id, e);
                UnitStatus::Failed
            }
        }
    }

    /// Load the raw document set and replay it. `None` means the match is
    /// void upstream and has no output.
    fn replay_match(&self, match_id: i64) -> Result<Option<Vec<BallRecord>>> {
        let (context, players, events) = match self.provider {
            Provider::Aucb => {
                let fixture: Value = self.read_doc(match_id, DocKind::Fixture)?;
                if is_void_result(&fixture) {
                    return Ok(None);
                }
                let scorecard: Value = self.read_doc(match_id, DocKind::Scorecard)?;

                let mut innings = Vec::new();
                for number in 1..=4u8 {
                    let path =
                        provider::doc_path(self.raw_root, self.provider, match_id, DocKind::Inning(number));
                    if !self.store.exists(&path) {
                        // A completed match always has its first two innings
                        if number <= 2 {
                            anyhow::bail!("missing required document {}", path);
                        }
                        continue;
                    }
                    innings.push((number, storage::read_json(self.store, &path)?));
                }

                aucb::prepare(&fixture, &scorecard, &innings)?
            }
            Provider::Cricinfo => {
                let commentary: Value = self.read_doc(match_id, DocKind::Commentary)?;
                cricinfo::prepare(&commentary)?
            }
        };

        Ok(Some(engine::replay(&context, &players, events)))
    }

    fn read_doc(&self, match_id: i64, kind: DocKind) -> Result<Value> {
        let path = provider::doc_path(self.raw_root, self.provider, match_id, kind);
        if !self.store.exists(&path) {
            anyhow::bail!("missing required document {}", path);
        }
        storage::read_json(self.store, &path)
    }
}

/// Matches recorded as void upstream carry no deliveries worth replaying
fn is_void_result(fixture: &Value) -> bool {
    matches!(
        fixture["resultType"].as_str(),
        Some("No Result") | Some("Abandoned")
    )
}

/// Write records as newline-delimited JSON, one object per line
fn write_ndjson(store: &dyn BlobStore, path: &str, records: &[BallRecord]) -> Result<()> {
    let mut lines = String::new();
    for record in records {
        lines.push_str(&serde_json::to_string(record)?);
        lines.push('\n');
    }
    store.write(path, &lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn single_worker() -> TransformConfig {
        TransformConfig {
            workers: Some(1),
            ..TransformConfig::default()
        }
    }

    fn seed_aucb_match(store: &MemoryStore, match_id: i64) {
        let fixture = json!({
            "id": match_id,
            "homeTeam": { "name": "Australia", "isTossWinner": true, "isMatchWinner": true },
            "awayTeam": { "name": "India" },
            "venue": { "name": "MCG", "country": { "name": "Australia" } },
            "competition": { "name": "Series A" },
            "gameType": "T20",
            "tossDecision": "bat",
            "startDateTime": "2025-06-15T03:30:00Z",
            "resultType": "Standard"
        });
        let scorecard = json!({
            "fixture": { "winType": "runs", "winningMargin": 5 },
            "players": [
                { "id": 1, "displayName": "A Batter", "nationality": "Australia" },
                { "id": 2, "displayName": "B Batter", "nationality": "Australia" },
                { "id": 3, "displayName": "C Bowler", "nationality": "India" }
            ]
        });
        let inning = |batter: i64, bowler: i64| {
            json!({
                "inning": {
                    "overs": [{
                        "overNumber": 1,
                        "balls": [
                            {
                                "ballNumber": 1,
                                "battingPlayerId": batter,
                                "bowlerPlayerId": bowler,
                                "runs": 4,
                                "isFour": true
                            },
                            {
                                "ballNumber": 2,
                                "battingPlayerId": batter,
                                "bowlerPlayerId": bowler,
                                "runs": 1
                            }
                        ]
                    }]
                }
            })
        };

        let root = format!("json_data/aucb_matches/{}", match_id);
        store
            .write(&format!("{}/fixture.json", root), &fixture.to_string())
            .unwrap();
        store
            .write(&format!("{}/scorecard.json", root), &scorecard.to_string())
            .unwrap();
        store
            .write(&format!("{}/inning1.json", root), &inning(1, 3).to_string())
            .unwrap();
        store
            .write(&format!("{}/inning2.json", root), &inning(3, 1).to_string())
            .unwrap();
    }

    #[test]
    fn test_aucb_transform_writes_ndjson() {
        let store = MemoryStore::new();
        seed_aucb_match(&store, 700);
        let config = single_worker();
        let transformer =
            Transformer::new(Provider::Aucb, &config, "json_data", "bbb_data", &store);

        let report = transformer.run().unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.succeeded, 1);
        assert!(report.is_success());

        let output = store.read("bbb_data/aucb/700_commentary.ndjson").unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["p_match"], "700");
        assert_eq!(first["inns"], 1);
        assert_eq!(first["outcome"], "four");
        assert_eq!(first["team_bat"], "Australia");
        // 5-run first innings fixes the chase target
        let last: Value = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(last["inns"], 2);
        assert_eq!(last["target"], 6.0);
    }

    #[test]
    fn test_existing_output_is_skipped() {
        let store = MemoryStore::new();
        seed_aucb_match(&store, 700);
        store
            .write("bbb_data/aucb/700_commentary.ndjson", "stale\n")
            .unwrap();
        let config = single_worker();
        let transformer =
            Transformer::new(Provider::Aucb, &config, "json_data", "bbb_data", &store);

        let report = transformer.run().unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 0);
        assert!(report.is_success());
        // Existing output is never rewritten
        assert_eq!(store.read("bbb_data/aucb/700_commentary.ndjson").unwrap(), "stale\n");
    }

    #[test]
    fn test_void_match_is_skipped_without_output() {
        let store = MemoryStore::new();
        seed_aucb_match(&store, 700);
        let fixture = json!({ "id": 700, "resultType": "No Result" });
        store
            .write(
                "json_data/aucb_matches/700/fixture.json",
                &fixture.to_string(),
            )
            .unwrap();
        let config = single_worker();
        let transformer =
            Transformer::new(Provider::Aucb, &config, "json_data", "bbb_data", &store);

        let report = transformer.run().unwrap();

        assert_eq!(report.skipped, 1);
        assert!(!store.exists("bbb_data/aucb/700_commentary.ndjson"));
    }

    #[test]
    fn test_missing_required_document_fails_unit() {
        let store = MemoryStore::new();
        seed_aucb_match(&store, 700);
        store.remove("json_data/aucb_matches/700/scorecard.json");
        let config = single_worker();
        let transformer =
            Transformer::new(Provider::Aucb, &config, "json_data", "bbb_data", &store);

        let report = transformer.run().unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 0);
        assert!(!report.is_success());
    }

    #[test]
    fn test_failed_unit_does_not_stop_others() {
        let store = MemoryStore::new();
        seed_aucb_match(&store, 700);
        seed_aucb_match(&store, 800);
        store.remove("json_data/aucb_matches/700/inning1.json");
        let config = single_worker();
        let transformer =
            Transformer::new(Provider::Aucb, &config, "json_data", "bbb_data", &store);

        let report = transformer.run().unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 1);
        assert!(report.is_success());
        assert!(store.exists("bbb_data/aucb/800_commentary.ndjson"));
    }

    #[test]
    fn test_empty_store_is_not_success() {
        let store = MemoryStore::new();
        let config = single_worker();
        let transformer =
            Transformer::new(Provider::Aucb, &config, "json_data", "bbb_data", &store);

        let report = transformer.run().unwrap();
        assert_eq!(report.processed, 0);
        assert!(!report.is_success());
    }

    #[test]
    fn test_cricinfo_transform() {
        let store = MemoryStore::new();
        let commentary = json!({
            "match": {
                "objectId": 901,
                "startDate": "2024-11-22T14:00:00Z",
                "ground": { "name": "Eden Gardens", "country": { "name": "India" } },
                "winnerTeamId": 10,
                "tossWinnerTeamId": 10,
                "tossWinnerChoice": 2,
                "internationalClassId": 3,
                "scheduledOvers": 20,
                "statusText": "Australia won by 7 wickets",
                "teams": [
                    { "team": { "id": 10, "longName": "Australia" } },
                    { "team": { "id": 20, "longName": "India" } }
                ]
            },
            "content": {
                "innings": [{ "team": { "id": 20 }, "runs": 150, "inningBatsmen": [], "inningBowlers": [] }],
                "comments": [{
                    "inningNumber": 1,
                    "overNumber": 1,
                    "ballNumber": 1,
                    "oversActual": 0.1,
                    "oversUnique": "0.01",
                    "batsmanPlayerId": 55,
                    "bowlerPlayerId": 66,
                    "batsmanRuns": 6,
                    "totalRuns": 6,
                    "isSix": true
                }]
            }
        });
        store
            .write(
                "json_data/cricinfo_matches/901/commentary.json",
                &commentary.to_string(),
            )
            .unwrap();
        let config = single_worker();
        let transformer =
            Transformer::new(Provider::Cricinfo, &config, "json_data", "bbb_data", &store);

        let report = transformer.run().unwrap();

        assert_eq!(report.succeeded, 1);
        let output = store.read("bbb_data/cricinfo/901_commentary.ndjson").unwrap();
        let first: Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(first["p_match"], "901");
        assert_eq!(first["outcome"], "six");
        assert_eq!(first["win_type"], "wickets");
    }
}
