//! Upstream providers, their endpoints, and blob-store path layout.
//!
//! Two independent providers feed the pipeline: the cricket.com.au API v2
//! ("aucb") and the ESPNcricinfo commentary API ("cricinfo"). Each has its
//! own raw-document layout under the storage root.

use clap::ValueEnum;
use std::fmt;

/// Base URL for the cricket.com.au API v2
pub const AUCB_BASE_URL: &str = "https://apiv2.cricket.com.au/web";

/// Base URL for the ESPNcricinfo core API
pub const CRICINFO_BASE_URL: &str = "https://hs-consumer-api.espncricinfo.com/v1";

/// An upstream match-data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Aucb,
    Cricinfo,
}

impl Provider {
    /// Short name used in storage paths and log lines
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Aucb => "aucb",
            Provider::Cricinfo => "cricinfo",
        }
    }

    /// Sub-resources fetched per discovered match
    pub fn doc_kinds(&self) -> &'static [DocKind] {
        match self {
            Provider::Aucb => &[
                DocKind::Scorecard,
                DocKind::Inning(1),
                DocKind::Inning(2),
                DocKind::Inning(3),
                DocKind::Inning(4),
            ],
            Provider::Cricinfo => &[DocKind::Commentary],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of raw per-match document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Fixture,
    Scorecard,
    Inning(u8),
    Commentary,
}

impl DocKind {
    /// File stem used in the blob store
    pub fn file_name(&self) -> String {
        match self {
            DocKind::Fixture => "fixture.json".to_string(),
            DocKind::Scorecard => "scorecard.json".to_string(),
            DocKind::Inning(n) => format!("inning{}.json", n),
            DocKind::Commentary => "commentary.json".to_string(),
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKind::Fixture => write!(f, "fixture"),
            DocKind::Scorecard => write!(f, "scorecard"),
            DocKind::Inning(n) => write!(f, "inning{}", n),
            DocKind::Commentary => write!(f, "commentary"),
        }
    }
}

/// Build the aucb completed-fixtures URL for a year
pub fn aucb_fixtures_url(year: i32) -> String {
    format!(
        "{}/fixtures/yearfilter?isCompleted=true&isWomenMatch=false&year={}&limit=999&isInningInclude=true&jsconfig=eccn%3Atrue&format=json",
        AUCB_BASE_URL, year
    )
}

/// Build the aucb scorecard URL for a fixture
pub fn aucb_scorecard_url(fixture_id: i64) -> String {
    format!(
        "{}/views/scorecard?fixtureId={}&jsconfig=eccn%3Atrue&format=json",
        AUCB_BASE_URL, fixture_id
    )
}

/// Build the aucb innings commentary URL for a fixture
pub fn aucb_comments_url(fixture_id: i64, inning: u8) -> String {
    format!(
        "{}/views/comments?fixtureId={}&inningNumber={}&commentType=&overLimit=499&jsconfig=eccn%3Atrue&format=json",
        AUCB_BASE_URL, fixture_id, inning
    )
}

/// Build the cricinfo season match-index URL
pub fn cricinfo_season_url(year: i32) -> String {
    format!("{}/pages/matches/season?year={}&format=json", CRICINFO_BASE_URL, year)
}

/// Build the cricinfo full-commentary URL for a match
pub fn cricinfo_commentary_url(match_id: i64) -> String {
    format!("{}/pages/match/comments?matchId={}&format=json", CRICINFO_BASE_URL, match_id)
}

/// Discovery URL for a provider and year
pub fn discovery_url(provider: Provider, year: i32) -> String {
    match provider {
        Provider::Aucb => aucb_fixtures_url(year),
        Provider::Cricinfo => cricinfo_season_url(year),
    }
}

/// Sub-resource URL for a provider, match and document kind
pub fn doc_url(provider: Provider, match_id: i64, kind: DocKind) -> String {
    match (provider, kind) {
        (Provider::Aucb, DocKind::Scorecard) => aucb_scorecard_url(match_id),
        (Provider::Aucb, DocKind::Inning(n)) => aucb_comments_url(match_id, n),
        (Provider::Cricinfo, DocKind::Commentary) => cricinfo_commentary_url(match_id),
        // Fixtures come from discovery, never from per-match fetches
        (p, k) => unreachable!("no endpoint for provider {} kind {}", p, k),
    }
}

/// Blob-store prefix holding one provider's raw match directories
pub fn matches_prefix(raw_root: &str, provider: Provider) -> String {
    format!("{}/{}_matches", raw_root, provider.name())
}

/// Blob-store path of one raw document
pub fn doc_path(raw_root: &str, provider: Provider, match_id: i64, kind: DocKind) -> String {
    format!(
        "{}/{}/{}",
        matches_prefix(raw_root, provider),
        match_id,
        kind.file_name()
    )
}

/// Blob-store path of the flattened ball-by-ball output for a match
pub fn output_path(output_root: &str, provider: Provider, match_id: i64) -> String {
    format!("{}/{}/{}_commentary.ndjson", output_root, provider.name(), match_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aucb_urls() {
        assert_eq!(
            aucb_fixtures_url(2025),
            "https://apiv2.cricket.com.au/web/fixtures/yearfilter?isCompleted=true&isWomenMatch=false&year=2025&limit=999&isInningInclude=true&jsconfig=eccn%3Atrue&format=json"
        );
        assert!(aucb_scorecard_url(12345).contains("fixtureId=12345"));
        assert!(aucb_comments_url(12345, 3).contains("inningNumber=3"));
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            doc_path("json_data", Provider::Aucb, 777, DocKind::Inning(2)),
            "json_data/aucb_matches/777/inning2.json"
        );
        assert_eq!(
            doc_path("json_data", Provider::Cricinfo, 42, DocKind::Commentary),
            "json_data/cricinfo_matches/42/commentary.json"
        );
        assert_eq!(
            output_path("bbb_data", Provider::Aucb, 777),
            "bbb_data/aucb/777_commentary.ndjson"
        );
    }

    #[test]
    fn test_doc_kinds_per_provider() {
        assert_eq!(Provider::Aucb.doc_kinds().len(), 5);
        assert_eq!(Provider::Cricinfo.doc_kinds(), &[DocKind::Commentary]);
    }
}
