pub mod command_scraper;
pub mod config;
pub mod dedup;
pub mod error;
pub mod filters;
pub mod judge;
pub mod markdown;
pub mod pipeline;
pub mod posting;
pub mod proxies;
pub mod retry;
pub mod sources;
pub mod store;

use std::path::Path;
use std::sync::Arc;

pub use command_scraper::CommandScraper;
pub use config::Config;
pub use dedup::{ filter_against_registry, DedupOutcome, SeenRegistry };
pub use error::{ JobsiftError, Result };
pub use filters::FilterSpec;
pub use judge::{ JobJudge, OpenAiJudge };
pub use pipeline::{ Pipeline, RunPaths, RunSummary };
pub use posting::{ Posting, PostingField };
pub use proxies::{ ProxyEndpoint, ProxyPool };
pub use retry::RetryPolicy;
pub use sources::{ JobScraper, SourceScraper };
pub use store::WriteMode;

/// Loads `config_path` and runs the pipeline with the external scraper process
/// and, when enabled, the OpenAI judge the config names.
///
/// # Arguments
///
/// * `config_path` - JSON config file; its absence is fatal.
/// * `paths` - Registry, output and proxy files.
/// * `write_mode` - Overrides the config's `output_mode` when set.
pub async fn run(
    config_path: &Path,
    paths: &RunPaths,
    write_mode: Option<WriteMode>
) -> Result<RunSummary> {
    let config = Config::load(config_path)?;

    let scraper: Arc<dyn JobScraper> = match CommandScraper::from_argv(&config.scraper_command) {
        Some(scraper) => Arc::new(scraper),
        None => Arc::new(NoScraper),
    };

    let judge = if config.filter_with_llm && !config.llm_api_key.is_empty() {
        let judge = OpenAiJudge::new(&config.llm_api_key, &config.llm_prompt, config.llm_timeout_seconds)?
            .with_model(&config.llm_model)
            .with_base_url(&config.llm_base_url);
        Some(Arc::new(judge) as Arc<dyn JobJudge>)
    } else {
        None
    };

    let mut pipeline = Pipeline::new(config, scraper);
    if let Some(judge) = judge {
        pipeline = pipeline.with_judge(judge);
    }
    if let Some(mode) = write_mode {
        pipeline = pipeline.with_write_mode(mode);
    }

    pipeline.run(paths).await
}

/// Used when no scraper command is configured, which validation only allows
/// with every search disabled.
struct NoScraper;

#[async_trait::async_trait]
impl JobScraper for NoScraper {
    async fn scrape(&self, _request: &sources::ScrapeRequest) -> Result<Vec<posting::Record>> {
        Err(JobsiftError::Scrape("no scraper_command configured".into()))
    }
}
