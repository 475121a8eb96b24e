//! Resumable, concurrency-bounded crawler.
//!
//! One run discovers candidate fixtures per year, persists the ones that
//! pass the retention filter, then fetches every missing per-match
//! sub-resource found by scanning the store. Absence of an output file is
//! the only work queue: a failed item simply stays absent and is retried
//! by the next run.

pub mod validate;

use anyhow::{Context, Result};
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::CrawlerConfig;
use crate::fetch::{ProxyRotator, Transport};
use crate::provider::{self, DocKind, Provider};
use crate::storage::BlobStore;
use validate::{ALLOWED_GAME_TYPE_IDS, is_valid_match};

/// Counts reported by one crawl run
#[derive(Debug, Default, Clone, Copy)]
pub struct CrawlReport {
    /// Fixtures retained and persisted by discovery
    pub discovered: usize,
    /// Sub-resources fetched with a usable payload
    pub fetched: usize,
    /// Sub-resources persisted to the store
    pub persisted: usize,
}

/// One pending sub-resource request
#[derive(Debug, Clone)]
struct WorkItem {
    match_id: i64,
    kind: DocKind,
    url: String,
    path: String,
}

/// Crawler for one provider over one store and transport
pub struct Crawler<'a, T: Transport> {
    provider: Provider,
    config: &'a CrawlerConfig,
    raw_root: &'a str,
    store: &'a dyn BlobStore,
    transport: &'a T,
    rotator: Mutex<ProxyRotator>,
}

impl<'a, T: Transport> Crawler<'a, T> {
    pub fn new(
        provider: Provider,
        config: &'a CrawlerConfig,
        raw_root: &'a str,
        store: &'a dyn BlobStore,
        transport: &'a T,
    ) -> Self {
        let rotator = Mutex::new(ProxyRotator::new(transport.pool_size()));
        Self {
            provider,
            config,
            raw_root,
            store,
            transport,
            rotator,
        }
    }

    /// Run discovery and the bounded sub-resource fetch
    pub async fn crawl(&self) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();

        info!("Starting {} fixture discovery", self.provider);
        report.discovered = self.discover().await?;

        let frontier = self.load_frontier()?;
        if frontier.is_empty() {
            warn!(
                "No {} fixture ids found in the store; nothing to fetch",
                self.provider
            );
            return Ok(report);
        }

        let work = self.generate_work(&frontier);
        info!(
            "Generated {} requests for {} known {} fixtures",
            work.len(),
            frontier.len(),
            self.provider
        );

        let semaphore = Semaphore::new(self.config.concurrency);
        let batch_count = work.len().div_ceil(self.config.batch_size.max(1));

        for (batch_index, batch) in work.chunks(self.config.batch_size.max(1)).enumerate() {
            info!("Processing batch {}/{}", batch_index + 1, batch_count);

            let fetches = batch.iter().map(|item| self.fetch_item(&semaphore, item));
            let results = join_all(fetches).await;

            for (item, payload) in results.into_iter().flatten() {
                report.fetched += 1;
                if self.persist_payload(&item, &payload) {
                    report.persisted += 1;
                }
            }
        }

        info!(
            "{} crawl finished: {} fixtures discovered, {} fetched, {} persisted",
            self.provider, report.discovered, report.fetched, report.persisted
        );
        Ok(report)
    }

    /// Fetch the per-year fixture lists, filter, and persist retained
    /// fixtures. Returns the number persisted.
    async fn discover(&self) -> Result<usize> {
        let semaphore = Semaphore::new(self.config.discovery_concurrency);
        let delay = Duration::from_secs(self.config.discovery_delay_secs);

        let years: Vec<i32> = (self.config.first_year..=self.config.last_year).collect();
        let fetches = years
            .iter()
            .map(|&year| self.fetch_discovery_year(&semaphore, delay, year));
        let yearly: Vec<Vec<Value>> = join_all(fetches).await;

        let all_fixtures: Vec<Value> = yearly.into_iter().flatten().collect();
        info!("Fetched a total of {} candidate fixtures", all_fixtures.len());

        let mut saved = 0;
        for fixture in &all_fixtures {
            if !self.fixture_qualifies(fixture) {
                continue;
            }
            let Some(id) = fixture_id(self.provider, fixture) else {
                warn!("Skipping fixture due to missing id");
                continue;
            };
            let path = provider::doc_path(self.raw_root, self.provider, id, DocKind::Fixture);
            match crate::storage::write_json(self.store, &path, fixture) {
                Ok(()) => {
                    debug!("Saved fixture {}", id);
                    saved += 1;
                }
                Err(e) => error!("Error saving fixture {}: {:#}", id, e),
            }
        }

        info!("Persisted {} qualifying fixtures", saved);
        Ok(saved)
    }

    /// One discovery request. The post-fetch delay is held while the permit
    /// is still owned, throttling discovery below the limiter's capacity.
    async fn fetch_discovery_year(
        &self,
        semaphore: &Semaphore,
        delay: Duration,
        year: i32,
    ) -> Vec<Value> {
        let _permit = semaphore.acquire().await.expect("semaphore never closed");
        let url = provider::discovery_url(self.provider, year);

        info!("Fetching {} fixtures for year {}", self.provider, year);
        let result = self.fetch_json(&url).await;
        tokio::time::sleep(delay).await;

        match result {
            Ok(payload) => {
                let fixtures = fixture_list(self.provider, &payload);
                info!("Year {} returned {} fixtures", year, fixtures.len());
                fixtures
            }
            Err(e) => {
                error!("Error fetching fixtures for year {}: {:#}", year, e);
                Vec::new()
            }
        }
    }

    fn fixture_qualifies(&self, fixture: &Value) -> bool {
        if let Some(allowed) = allowed_game_types(self.provider) {
            match fixture["gameTypeId"].as_i64() {
                Some(id) if allowed.contains(&id) => {}
                _ => return false,
            }
        }
        let start = fixture[start_date_field(self.provider)]
            .as_str()
            .unwrap_or("");
        let date = truncate(start, 10);
        date > self.config.since_date.as_str()
    }

    /// Enumerate previously persisted fixture ids from the store.
    ///
    /// This is the crawl frontier; it is read once per run and never
    /// re-derived from upstream pagination state.
    pub fn load_frontier(&self) -> Result<BTreeSet<i64>> {
        let prefix = provider::matches_prefix(self.raw_root, self.provider);
        let mut ids = BTreeSet::new();

        for path in self.store.list(&prefix)? {
            let mut parts = path.rsplit('/');
            if parts.next() != Some("fixture.json") {
                continue;
            }
            match parts.next().map(str::parse::<i64>) {
                Some(Ok(id)) => {
                    ids.insert(id);
                }
                _ => warn!("Ignoring non-numeric match directory in {}", path),
            }
        }

        info!("Found {} fixture ids in the store", ids.len());
        Ok(ids)
    }

    /// Build the pending request list: newest fixtures first, one item per
    /// missing sub-resource, capped to bound a single run's cost.
    fn generate_work(&self, frontier: &BTreeSet<i64>) -> Vec<WorkItem> {
        let mut work = Vec::new();

        for &match_id in frontier.iter().rev() {
            for &kind in self.provider.doc_kinds() {
                let path = provider::doc_path(self.raw_root, self.provider, match_id, kind);
                if self.store.exists(&path) {
                    continue;
                }
                work.push(WorkItem {
                    match_id,
                    kind,
                    url: provider::doc_url(self.provider, match_id, kind),
                    path,
                });
            }
            // Remaining fixtures are picked up on the next run
            if work.len() > self.config.max_pending {
                break;
            }
        }

        work
    }

    /// Fetch one work item under the main limiter and classify the response
    async fn fetch_item(&self, semaphore: &Semaphore, item: &WorkItem) -> Option<(WorkItem, Value)> {
        let _permit = semaphore.acquire().await.expect("semaphore never closed");

        let payload = match self.fetch_json(&item.url).await {
            Ok(payload) => payload,
            // An undecodable body is an upstream fault; a bad status is routine
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                error!(
                    "Undecodable {} {} payload for match {}: {:#}",
                    self.provider, item.kind, item.match_id, e
                );
                return None;
            }
            Err(e) => {
                warn!(
                    "Failed to fetch {} {} for match {}: {:#}",
                    self.provider, item.kind, item.match_id, e
                );
                return None;
            }
        };

        // A payload with at most one top-level key carries no match data
        if payload.as_object().is_some_and(|o| o.len() <= 1) {
            debug!("No useful data for match {}, kind {}", item.match_id, item.kind);
            return None;
        }

        debug!("Fetched match {}, kind {}", item.match_id, item.kind);
        Some((item.clone(), payload))
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let proxy_index = self.rotator.lock().expect("rotator lock poisoned").next();
        let response = self.transport.get(url, proxy_index).await?;

        if response.status != 200 {
            anyhow::bail!("status {}", response.status);
        }
        serde_json::from_str(&response.body)
            .with_context(|| format!("undecodable body: {}...", truncate(&response.body, 200)))
    }

    /// Validate (scorecards only) and persist one payload
    fn persist_payload(&self, item: &WorkItem, payload: &Value) -> bool {
        if item.kind == DocKind::Scorecard && !is_valid_match(payload) {
            debug!("Match {} does not meet criteria - skipping", item.match_id);
            return false;
        }

        match crate::storage::write_json(self.store, &item.path, payload) {
            Ok(()) => {
                info!("Saved {}", item.path);
                true
            }
            Err(e) => {
                error!("Error saving {}: {:#}", item.path, e);
                false
            }
        }
    }
}

/// Truncate to at most `max` bytes without splitting a character
fn truncate(s: &str, max: usize) -> &str {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Allowed game-type classifier set for a provider's discovery filter.
/// The cricinfo season index carries no comparable classifier; everything
/// it lists is eligible.
fn allowed_game_types(provider: Provider) -> Option<&'static [i64]> {
    match provider {
        Provider::Aucb => Some(&ALLOWED_GAME_TYPE_IDS),
        Provider::Cricinfo => None,
    }
}

fn start_date_field(provider: Provider) -> &'static str {
    match provider {
        Provider::Aucb => "startDateTime",
        Provider::Cricinfo => "startDate",
    }
}

/// Candidate fixture objects inside a discovery payload
fn fixture_list(provider: Provider, payload: &Value) -> Vec<Value> {
    let key = match provider {
        Provider::Aucb => "fixtures",
        Provider::Cricinfo => "matches",
    };
    payload[key].as_array().cloned().unwrap_or_default()
}

/// Stable integer id of a discovered fixture
fn fixture_id(provider: Provider, fixture: &Value) -> Option<i64> {
    match provider {
        Provider::Aucb => fixture["id"].as_i64(),
        Provider::Cricinfo => fixture["objectId"].as_i64().or(fixture["id"].as_i64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchResponse;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned transport: URL -> (status, body), counting every request
    struct StubTransport {
        responses: HashMap<String, (u16, String)>,
        requests: AtomicUsize,
    }

    impl StubTransport {
        fn new(responses: HashMap<String, (u16, String)>) -> Self {
            Self {
                responses,
                requests: AtomicUsize::new(0),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    impl Transport for StubTransport {
        async fn get(&self, url: &str, _proxy_index: usize) -> Result<FetchResponse> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(url) {
                Some((status, body)) => Ok(FetchResponse {
                    status: *status,
                    body: body.clone(),
                }),
                None => Ok(FetchResponse {
                    status: 404,
                    body: String::new(),
                }),
            }
        }

        fn pool_size(&self) -> usize {
            1
        }
    }

    fn test_config() -> CrawlerConfig {
        CrawlerConfig {
            first_year: 2025,
            last_year: 2025,
            since_date: "2025-01-01".to_string(),
            discovery_delay_secs: 0,
            ..CrawlerConfig::default()
        }
    }

    fn scorecard_body() -> String {
        json!({
            "fixture": {
                "competition": { "isWomensCompetition": false },
                "startDateTime": "2025-06-15T03:30:00Z",
                "gameTypeId": 1,
                "resultType": "Standard"
            },
            "players": []
        })
        .to_string()
    }

    fn inning_body() -> String {
        json!({ "inning": { "overs": [] }, "meta": {} }).to_string()
    }

    fn aucb_responses(fixture_id: i64) -> HashMap<String, (u16, String)> {
        let mut responses = HashMap::new();
        responses.insert(
            provider::aucb_fixtures_url(2025),
            (
                200,
                json!({
                    "fixtures": [{
                        "id": fixture_id,
                        "gameTypeId": 1,
                        "startDateTime": "2025-06-15T03:30:00Z"
                    }]
                })
                .to_string(),
            ),
        );
        responses.insert(
            provider::aucb_scorecard_url(fixture_id),
            (200, scorecard_body()),
        );
        for inning in 1..=2u8 {
            responses.insert(
                provider::aucb_comments_url(fixture_id, inning),
                (200, inning_body()),
            );
        }
        // Innings 3 and 4 return the "no data" single-key shape
        for inning in 3..=4u8 {
            responses.insert(
                provider::aucb_comments_url(fixture_id, inning),
                (200, json!({ "status": "no data" }).to_string()),
            );
        }
        responses
    }

    #[tokio::test]
    async fn test_crawl_fetches_and_persists() {
        let store = MemoryStore::new();
        let transport = StubTransport::new(aucb_responses(700));
        let config = test_config();
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        let report = crawler.crawl().await.unwrap();

        assert_eq!(report.discovered, 1);
        // Scorecard + innings 1-2 fetched; innings 3-4 dropped as no-data
        assert_eq!(report.fetched, 3);
        assert_eq!(report.persisted, 3);
        assert!(store.exists("json_data/aucb_matches/700/fixture.json"));
        assert!(store.exists("json_data/aucb_matches/700/scorecard.json"));
        assert!(store.exists("json_data/aucb_matches/700/inning1.json"));
        assert!(!store.exists("json_data/aucb_matches/700/inning3.json"));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let store = MemoryStore::new();
        let transport = StubTransport::new(aucb_responses(700));
        let config = test_config();
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        crawler.crawl().await.unwrap();
        let first_run_requests = transport.request_count();

        let report = crawler.crawl().await.unwrap();

        // Discovery re-runs, but only the two absent innings are retried
        assert_eq!(
            transport.request_count(),
            first_run_requests + 1 + 2,
            "second run must only re-request discovery and absent outputs"
        );
        assert_eq!(report.persisted, 0);
    }

    #[tokio::test]
    async fn test_invalid_scorecard_not_persisted() {
        let mut responses = aucb_responses(700);
        responses.insert(
            provider::aucb_scorecard_url(700),
            (
                200,
                json!({
                    "fixture": { "resultType": "Abandoned" },
                    "players": []
                })
                .to_string(),
            ),
        );
        let store = MemoryStore::new();
        let transport = StubTransport::new(responses);
        let config = test_config();
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        let report = crawler.crawl().await.unwrap();

        assert!(!store.exists("json_data/aucb_matches/700/scorecard.json"));
        // Fetched but dropped by validation; innings still persist
        assert_eq!(report.fetched, 3);
        assert_eq!(report.persisted, 2);
    }

    #[tokio::test]
    async fn test_fetch_failures_are_isolated() {
        let mut responses = aucb_responses(700);
        responses.insert(provider::aucb_scorecard_url(700), (503, String::new()));
        responses.insert(
            provider::aucb_comments_url(700, 1),
            (200, "not json".to_string()),
        );
        let store = MemoryStore::new();
        let transport = StubTransport::new(responses);
        let config = test_config();
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        let report = crawler.crawl().await.unwrap();

        // Only inning2 survives classification
        assert_eq!(report.fetched, 1);
        assert_eq!(report.persisted, 1);
        assert!(store.exists("json_data/aucb_matches/700/inning2.json"));
    }

    #[tokio::test]
    async fn test_discovery_filter_drops_late_and_wrong_type() {
        let mut responses = HashMap::new();
        responses.insert(
            provider::aucb_fixtures_url(2025),
            (
                200,
                json!({
                    "fixtures": [
                        { "id": 1, "gameTypeId": 99, "startDateTime": "2025-06-15T00:00:00Z" },
                        { "id": 2, "gameTypeId": 1, "startDateTime": "2024-01-01T00:00:00Z" },
                        { "gameTypeId": 1, "startDateTime": "2025-06-15T00:00:00Z" },
                        { "id": 4, "gameTypeId": 1, "startDateTime": "2025-06-15T00:00:00Z" }
                    ]
                })
                .to_string(),
            ),
        );
        let store = MemoryStore::new();
        let transport = StubTransport::new(responses);
        let config = test_config();
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        let report = crawler.crawl().await.unwrap();

        assert_eq!(report.discovered, 1);
        assert!(store.exists("json_data/aucb_matches/4/fixture.json"));
        assert!(!store.exists("json_data/aucb_matches/1/fixture.json"));
        assert!(!store.exists("json_data/aucb_matches/2/fixture.json"));
    }

    #[tokio::test]
    async fn test_multibyte_garbage_body_is_dropped_not_fatal() {
        // 199 ASCII bytes followed by a two-byte character straddling the
        // 200-byte error-snippet cut
        let garbage = format!("{}é rest of the page", "x".repeat(199));
        let mut responses = aucb_responses(700);
        responses.insert(provider::aucb_comments_url(700, 1), (200, garbage));
        let store = MemoryStore::new();
        let transport = StubTransport::new(responses);
        let config = test_config();
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        let report = crawler.crawl().await.unwrap();

        // The undecodable item is dropped; everything else still lands
        assert_eq!(report.fetched, 2);
        assert_eq!(report.persisted, 2);
        assert!(!store.exists("json_data/aucb_matches/700/inning1.json"));
        assert!(store.exists("json_data/aucb_matches/700/inning2.json"));
    }

    #[tokio::test]
    async fn test_multibyte_start_date_does_not_abort_discovery() {
        let mut responses = HashMap::new();
        responses.insert(
            provider::aucb_fixtures_url(2025),
            (
                200,
                json!({
                    "fixtures": [
                        { "id": 5, "gameTypeId": 1, "startDateTime": "2025-06-1é" },
                        { "id": 6, "gameTypeId": 1, "startDateTime": "2025-06-15T00:00:00Z" }
                    ]
                })
                .to_string(),
            ),
        );
        let store = MemoryStore::new();
        let transport = StubTransport::new(responses);
        let config = test_config();
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        let report = crawler.crawl().await.unwrap();

        // Truncated to "2025-06-1", still past the watermark
        assert_eq!(report.discovered, 2);
        assert!(store.exists("json_data/aucb_matches/5/fixture.json"));
        assert!(store.exists("json_data/aucb_matches/6/fixture.json"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("2025-06-15", 10), "2025-06-15");
        assert_eq!(truncate("2025-06-1é", 10), "2025-06-1");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééé", 3), "é");
    }

    #[test]
    fn test_work_generation_descending_with_cap() {
        let store = MemoryStore::new();
        let transport = StubTransport::new(HashMap::new());
        let config = CrawlerConfig {
            max_pending: 7,
            ..test_config()
        };
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        let frontier: BTreeSet<i64> = [10, 30, 20].into_iter().collect();
        let work = crawler.generate_work(&frontier);

        // Newest fixture first, 5 kinds each; cap reached after fixture 20
        assert_eq!(work.len(), 10);
        assert!(work[..5].iter().all(|w| w.match_id == 30));
        assert!(work[5..].iter().all(|w| w.match_id == 20));
    }

    #[test]
    fn test_frontier_skips_non_numeric_dirs() {
        let store = MemoryStore::new();
        store
            .write("json_data/aucb_matches/123/fixture.json", "{}")
            .unwrap();
        store
            .write("json_data/aucb_matches/junk/fixture.json", "{}")
            .unwrap();
        store
            .write("json_data/aucb_matches/123/scorecard.json", "{}")
            .unwrap();
        let transport = StubTransport::new(HashMap::new());
        let config = test_config();
        let crawler = Crawler::new(Provider::Aucb, &config, "json_data", &store, &transport);

        let frontier = crawler.load_frontier().unwrap();
        assert_eq!(frontier.into_iter().collect::<Vec<_>>(), vec![123]);
    }
}
