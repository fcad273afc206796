//! # Pipeline Module
//!
//! One run end to end: scrape every enabled query, drop what was seen
//! before, filter, then persist the new postings and the grown registry.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{ info, warn };

use crate::config::Config;
use crate::dedup::filter_against_registry;
use crate::error::Result;
use crate::filters;
use crate::judge::JobJudge;
use crate::proxies::ProxyPool;
use crate::retry::RetryPolicy;
use crate::sources::{ JobScraper, SourceScraper };
use crate::store::{ load_registry, save_registry, write_postings, WriteMode };

/// Files a run reads and writes.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub seen: PathBuf,
    pub output: PathBuf,
    pub proxies: PathBuf,
}

impl Default for RunPaths {
    fn default() -> Self {
        RunPaths {
            seen: PathBuf::from("seen.csv"),
            output: PathBuf::from("new_jobs.csv"),
            proxies: PathBuf::from("proxies.txt"),
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Postings returned by all scrape calls.
    pub scraped: usize,
    /// Postings left after dedup.
    pub new: usize,
    /// Postings left after every filter.
    pub kept: usize,
    /// Rows in the output file after writing; 0 if nothing was written.
    pub written: usize,
    pub registry_size: usize,
}

pub struct Pipeline {
    config: Config,
    scraper: Arc<dyn JobScraper>,
    judge: Option<Arc<dyn JobJudge>>,
    retry: RetryPolicy<bool>,
    write_mode: WriteMode,
}

impl Pipeline {
    pub fn new(config: Config, scraper: Arc<dyn JobScraper>) -> Self {
        let write_mode = config.output_mode;
        Pipeline {
            config,
            scraper,
            judge: None,
            retry: RetryPolicy::fail_open(),
            write_mode,
        }
    }

    /// Judge consulted when `filter_with_llm` is set.
    pub fn with_judge(mut self, judge: Arc<dyn JobJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy<bool>) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the config's `output_mode`.
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub async fn run(&self, paths: &RunPaths) -> Result<RunSummary> {
        let registry = load_registry(&paths.seen)?;

        let proxies = ProxyPool::load(&paths.proxies);
        let sources = SourceScraper::new(self.scraper.clone(), proxies, self.config.proxy_rotation);

        let queries = self.config.queries();
        info!(queries = queries.len(), "starting scrape");
        let batch = sources.fetch_all(&queries).await;
        let scraped = batch.len();
        info!(scraped, "scraping finished");

        let outcome = filter_against_registry(batch, registry);
        info!(
            new = outcome.new.len(),
            batch_duplicates = outcome.batch_duplicates,
            registry_hits = outcome.registry_hits,
            "dedup finished"
        );
        let new = outcome.new.len();

        let mut postings = filters::apply(outcome.new, &self.config.filter_specs());

        if self.config.filter_with_llm {
            match &self.judge {
                Some(judge) => {
                    postings = filters::apply_llm(postings, judge.as_ref(), &self.retry).await;
                }
                None => warn!("filter_with_llm is set but no LLM is configured, skipping"),
            }
        }
        let kept = postings.len();

        let written = write_postings(&paths.output, &postings, self.write_mode)?;
        save_registry(&paths.seen, &outcome.registry)?;

        let summary = RunSummary {
            scraped,
            new,
            kept,
            written,
            registry_size: outcome.registry.len(),
        };
        info!(?summary, "run finished");
        Ok(summary)
    }
}
