//! # Sources Module
//!
//! Fans scrape queries out to the external scraping capability, one isolated
//! call at a time, and turns the records that come back into postings.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use tracing::{ info, warn };

use crate::error::Result;
use crate::posting::{ Posting, Record, JOB_URL };
use crate::proxies::{ ProxyPool, ProxyRotation };

/// Job sites understood by the scraping capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Indeed,
    Linkedin,
    ZipRecruiter,
    Glassdoor,
    Google,
}

impl Site {
    /// Boards searched when the config does not name any.
    pub fn default_boards() -> Vec<Site> {
        vec![Site::Indeed, Site::Linkedin, Site::ZipRecruiter, Site::Glassdoor]
    }
}

/// One call into the scraping capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapeRequest {
    pub sites: Vec<Site>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_indeed: Option<String>,
    pub results_wanted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_old: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    pub proxies: Vec<String>,
}

/// The external scraping capability.
///
/// Implementations are untrusted: they may fail, hang, or return records of
/// the wrong shape. [`SourceScraper`] guards against the first and last.
#[async_trait]
pub trait JobScraper: Send + Sync {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<Record>>;
}

/// A job-board search.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardQuery {
    pub search_term: String,
    /// Indeed matches on a different vocabulary, so it may get its own term.
    pub indeed_search_term: Option<String>,
    pub location: String,
    pub country: String,
    pub hours_old: u32,
    pub distance: u32,
    pub results_wanted: usize,
    pub sites: Vec<Site>,
}

/// A free-text Google jobs search.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorQuery {
    pub query: String,
    pub results_wanted: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceQuery {
    Board(BoardQuery),
    Aggregator(AggregatorQuery),
}

/// Drives [`JobScraper`] calls and isolates their failures.
pub struct SourceScraper {
    scraper: Arc<dyn JobScraper>,
    proxies: ProxyPool,
    rotation: ProxyRotation,
}

impl SourceScraper {
    pub fn new(scraper: Arc<dyn JobScraper>, proxies: ProxyPool, rotation: ProxyRotation) -> Self {
        SourceScraper {
            scraper,
            proxies,
            rotation,
        }
    }

    /// Runs one query. Never fails; a broken call contributes nothing.
    pub async fn fetch(&self, query: &SourceQuery) -> Vec<Posting> {
        match query {
            SourceQuery::Board(board) => self.fetch_board(board).await,
            SourceQuery::Aggregator(aggregator) => self.fetch_aggregator(aggregator).await,
        }
    }

    /// Runs every query in order and concatenates the results.
    pub async fn fetch_all(&self, queries: &[SourceQuery]) -> Vec<Posting> {
        let mut batch = Vec::new();
        for query in queries {
            batch.extend(self.fetch(query).await);
        }
        batch
    }

    async fn fetch_board(&self, query: &BoardQuery) -> Vec<Posting> {
        let (indeed, others): (Vec<Site>, Vec<Site>) = query.sites
            .iter()
            .copied()
            .partition(|site| *site == Site::Indeed);

        let mut postings = Vec::new();

        if !others.is_empty() {
            let request = self.board_request(query, others, &query.search_term);
            let label = format!("job boards '{}' in '{}'", query.search_term, query.location);
            postings.extend(self.call(&label, &request).await);
        }

        if !indeed.is_empty() {
            let term = query.indeed_search_term.as_deref().unwrap_or(&query.search_term);
            let request = self.board_request(query, indeed, term);
            let label = format!("indeed '{}' in '{}'", term, query.location);
            postings.extend(self.call(&label, &request).await);
        }

        postings
    }

    async fn fetch_aggregator(&self, query: &AggregatorQuery) -> Vec<Posting> {
        let request = ScrapeRequest {
            sites: vec![Site::Google],
            google_search_term: Some(query.query.clone()),
            results_wanted: query.results_wanted,
            proxies: self.proxy_list(),
            ..Default::default()
        };
        let label = format!("google '{}'", query.query);
        self.call(&label, &request).await
    }

    fn board_request(&self, query: &BoardQuery, sites: Vec<Site>, term: &str) -> ScrapeRequest {
        ScrapeRequest {
            sites,
            search_term: Some(term.to_string()),
            location: Some(query.location.clone()),
            country_indeed: Some(query.country.clone()),
            results_wanted: query.results_wanted,
            hours_old: Some(query.hours_old),
            distance: Some(query.distance),
            proxies: self.proxy_list(),
            ..Default::default()
        }
    }

    fn proxy_list(&self) -> Vec<String> {
        self.proxies
            .ordered(self.rotation)
            .into_iter()
            .map(|endpoint| endpoint.to_string())
            .collect()
    }

    async fn call(&self, label: &str, request: &ScrapeRequest) -> Vec<Posting> {
        let records = match self.scraper.scrape(request).await {
            Ok(records) => records,
            Err(err) => {
                warn!(source = label, error = %err, "scrape failed, continuing without it");
                return Vec::new();
            }
        };

        match validate_batch(records) {
            Some(postings) => {
                info!(source = label, count = postings.len(), "scraped postings");
                postings
            }
            None => {
                warn!(source = label, "scraped batch has no '{}' field, discarding", JOB_URL);
                Vec::new()
            }
        }
    }
}

/// Converts a raw batch into postings.
///
/// A non-empty batch in which no record carries a `job_url` key has the wrong
/// shape and is rejected as a whole.
pub fn validate_batch(records: Vec<Record>) -> Option<Vec<Posting>> {
    if !records.is_empty() && !records.iter().any(|record| record.contains_key(JOB_URL)) {
        return None;
    }
    Some(records.into_iter().map(Posting::from_record).collect())
}
