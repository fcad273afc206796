//! # Config Module
//!
//! Typed run configuration, read once from a JSON file at startup.
//!
//! Every key is optional and falls back to a default; only a missing file is
//! fatal. [`Config::validate`] then rejects combinations that cannot run.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ JobsiftError, Result };
use crate::filters::FilterSpec;
use crate::judge::{ DEFAULT_BASE_URL, DEFAULT_MODEL };
use crate::posting::PostingField;
use crate::proxies::ProxyRotation;
use crate::sources::{ AggregatorQuery, BoardQuery, Site, SourceQuery };
use crate::store::WriteMode;

/// Environment variable consulted when `llm_api_key` is empty.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// One job-board search entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardSearchTerm {
    pub search_term: String,
    pub location: String,
    pub country_indeed: String,
    pub indeed_search_term: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search_job_boards: bool,
    pub search_google_jobs: bool,
    pub board_search_terms: Vec<BoardSearchTerm>,
    pub google_search_terms: Vec<String>,

    pub filter_locations: bool,
    pub locations_to_filter: Vec<String>,
    pub filter_job_titles: bool,
    pub job_titles_to_filter: Vec<String>,
    pub filter_companies: bool,
    pub companies_to_filter: Vec<String>,

    pub filter_with_llm: bool,
    pub llm_api_key: String,
    pub llm_prompt: String,
    pub llm_model: String,
    pub llm_base_url: String,
    /// Per-request timeout for the LLM, in seconds.
    pub llm_timeout_seconds: u64,

    pub results_wanted: usize,
    pub google_results_wanted: usize,
    pub hours_old: u32,
    pub distance: u32,
    pub board_sites: Vec<Site>,

    /// Argv of the external scraper process.
    pub scraper_command: Vec<String>,
    pub proxy_rotation: ProxyRotation,
    pub output_mode: WriteMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            search_job_boards: false,
            search_google_jobs: false,
            board_search_terms: Vec::new(),
            google_search_terms: Vec::new(),
            filter_locations: false,
            locations_to_filter: Vec::new(),
            filter_job_titles: false,
            job_titles_to_filter: Vec::new(),
            filter_companies: false,
            companies_to_filter: Vec::new(),
            filter_with_llm: false,
            llm_api_key: String::new(),
            llm_prompt: String::new(),
            llm_model: DEFAULT_MODEL.to_string(),
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            llm_timeout_seconds: 30,
            results_wanted: 20,
            google_results_wanted: 20,
            hours_old: 72,
            distance: 200,
            board_sites: Site::default_boards(),
            scraper_command: Vec::new(),
            proxy_rotation: ProxyRotation::default(),
            output_mode: WriteMode::default(),
        }
    }
}

impl Config {
    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(JobsiftError::ConfigMissing(path.to_path_buf()));
            }
            Err(err) => {
                return Err(err.into());
            }
        };

        let mut config = Self::from_json(&raw)?;
        if config.llm_api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                config.llm_api_key = key;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses config JSON without validating it.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| JobsiftError::Config(e.to_string()))
    }

    /// Checks:
    /// - `scraper_command` is set whenever a search is enabled
    /// - `results_wanted` and `google_results_wanted` are greater than 0
    pub fn validate(&self) -> Result<()> {
        if (self.search_job_boards || self.search_google_jobs) && self.scraper_command.is_empty() {
            return Err(
                JobsiftError::Config("scraper_command is required when a search is enabled".into())
            );
        }
        if self.results_wanted == 0 {
            return Err(JobsiftError::Config("results_wanted must be greater than 0".into()));
        }
        if self.google_results_wanted == 0 {
            return Err(JobsiftError::Config("google_results_wanted must be greater than 0".into()));
        }
        Ok(())
    }

    /// Every enabled query, boards first, in config order.
    pub fn queries(&self) -> Vec<SourceQuery> {
        let mut queries = Vec::new();

        if self.search_job_boards {
            queries.extend(
                self.board_search_terms.iter().map(|entry| {
                    SourceQuery::Board(BoardQuery {
                        search_term: entry.search_term.clone(),
                        indeed_search_term: entry.indeed_search_term.clone(),
                        location: entry.location.clone(),
                        country: entry.country_indeed.clone(),
                        hours_old: self.hours_old,
                        distance: self.distance,
                        results_wanted: self.results_wanted,
                        sites: self.board_sites.clone(),
                    })
                })
            );
        }

        if self.search_google_jobs {
            queries.extend(
                self.google_search_terms.iter().map(|query| {
                    SourceQuery::Aggregator(AggregatorQuery {
                        query: query.clone(),
                        results_wanted: self.google_results_wanted,
                    })
                })
            );
        }

        queries
    }

    /// Field filters that are switched on: locations, then job titles, then companies.
    pub fn filter_specs(&self) -> Vec<FilterSpec> {
        let mut specs = Vec::new();
        if self.filter_locations {
            specs.push(FilterSpec::new(PostingField::Location, &self.locations_to_filter));
        }
        if self.filter_job_titles {
            specs.push(FilterSpec::new(PostingField::Title, &self.job_titles_to_filter));
        }
        if self.filter_companies {
            specs.push(FilterSpec::new(PostingField::Company, &self.companies_to_filter));
        }
        specs
    }
}
