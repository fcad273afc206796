//! # Command Scraper Module
//!
//! Bridges [`JobScraper`] to an external scraper process. The request is
//! written to the child's stdin as JSON and a JSON array of records is read
//! back from its stdout.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ JobsiftError, Result };
use crate::posting::Record;
use crate::sources::{ JobScraper, ScrapeRequest };

/// Runs `program args...` once per scrape call.
#[derive(Debug, Clone)]
pub struct CommandScraper {
    program: String,
    args: Vec<String>,
}

impl CommandScraper {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandScraper {
            program: program.into(),
            args,
        }
    }

    /// Builds a scraper from an argv list, `None` if the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(CommandScraper::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl JobScraper for CommandScraper {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<Record>> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| JobsiftError::Scrape(format!("failed to spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(
                JobsiftError::Scrape(format!("{} exited with {}: {}", self.program, output.status, stderr.trim()))
            );
        }

        let records: Vec<Record> = serde_json::from_slice(&output.stdout)
            .map_err(|e| JobsiftError::Scrape(format!("unparsable scraper output: {}", e)))?;
        debug!(program = %self.program, count = records.len(), "scraper process returned records");
        Ok(records)
    }
}
