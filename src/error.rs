//! # Error Module
//!
//! Error types shared by every stage of the pipeline.

use std::path::PathBuf;

/// Errors that can occur while loading config, scraping, filtering or persisting postings.
#[derive(Debug, thiserror::Error)]
pub enum JobsiftError {
    /// The mandatory configuration file does not exist.
    #[error("config file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    /// The configuration file exists but is unusable.
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The external scraping capability failed for one call.
    #[error("scrape error: {0}")]
    Scrape(String),

    /// The LLM decision capability failed or answered with something unparsable.
    #[error("LLM error: {0}")]
    Llm(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, JobsiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_config_missing() {
        let err = JobsiftError::ConfigMissing(PathBuf::from("config.json"));
        assert_eq!(err.to_string(), "config file not found: config.json");
    }

    #[test]
    fn display_scrape() {
        let err = JobsiftError::Scrape("exit status 1".into());
        assert_eq!(err.to_string(), "scrape error: exit status 1");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: JobsiftError = io.into();
        assert!(matches!(err, JobsiftError::Io(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JobsiftError>();
    }
}
