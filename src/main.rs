use std::path::PathBuf;

use anyhow::{ Context, Result };
use clap::Parser;
use jobsift::{ RunPaths, WriteMode };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt, EnvFilter };

#[derive(Parser)]
#[command(name = "jobsift")]
#[command(about = "Scrape job boards, drop postings seen before, filter the rest")]
struct Cli {
    /// JSON run configuration
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Registry of postings emitted by earlier runs
    #[arg(long, default_value = "seen.csv")]
    seen: PathBuf,

    /// Where this run's new postings are written
    #[arg(long, default_value = "new_jobs.csv")]
    output: PathBuf,

    /// Proxy list, one endpoint per line
    #[arg(long, default_value = "proxies.txt")]
    proxies: PathBuf,

    /// Merge into the output file instead of replacing it
    #[arg(long)]
    append: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("warn,jobsift={}", level).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let paths = RunPaths {
        seen: cli.seen,
        output: cli.output,
        proxies: cli.proxies,
    };
    let write_mode = cli.append.then_some(WriteMode::Append);

    let summary = jobsift::run(&cli.config, &paths, write_mode).await
        .with_context(|| format!("run with config {} failed", cli.config.display()))?;

    println!(
        "scraped {} postings, {} new, {} kept after filters, {} rows in {}",
        summary.scraped,
        summary.new,
        summary.kept,
        summary.written,
        paths.output.display()
    );
    Ok(())
}
