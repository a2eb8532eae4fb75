use clap::{Args, Parser, Subcommand};
use loadprobe::prelude::*;
use loadprobe_core::{
    CLEANUP_TIMEOUT, DEFAULT_CANDIDATES, DEFAULT_REQUESTS, DEFAULT_WORKERS, HEALTH_PATH,
    PROBE_TIMEOUT, PROGRESS_EVERY, REQUEST_TIMEOUT,
};
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "loadprobe=info,loadprobe_core=info";

#[derive(Parser, Debug)]
#[command(version, about = "Probe a users REST API and measure it under concurrent load")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    target: TargetArgs,

    #[command(flatten)]
    load: LoadArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Health check every candidate base URL and report on each.
    Check,
    /// Probe, then run the load test and clean up (default).
    Run,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Candidate base URL, tried in order. Repeatable.
    #[arg(short, long = "url", global = true)]
    urls: Vec<String>,

    #[arg(long, default_value = HEALTH_PATH, global = true)]
    health_path: String,

    #[arg(long, default_value_t = PROBE_TIMEOUT.into(), global = true)]
    probe_timeout: humantime::Duration,
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Bulk phase kind: create, list or read.
    #[arg(short, long, default_value_t = Scenario::Create, global = true)]
    scenario: Scenario,

    #[arg(short = 'n', long, default_value_t = DEFAULT_REQUESTS, global = true)]
    requests: usize,

    #[arg(short, long, default_value_t = DEFAULT_WORKERS, global = true)]
    workers: NonZeroUsize,

    /// Per-request timeout, e.g. `10s` or `500ms`.
    #[arg(short, long, default_value_t = REQUEST_TIMEOUT.into(), global = true)]
    timeout: humantime::Duration,

    #[arg(long, default_value_t = CLEANUP_TIMEOUT.into(), global = true)]
    cleanup_timeout: humantime::Duration,

    /// Log progress every N completed requests (0 disables).
    #[arg(long, default_value_t = PROGRESS_EVERY, global = true)]
    progress_every: usize,
}

impl Cli {
    fn config(&self) -> RunConfig {
        let urls = if self.target.urls.is_empty() {
            DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect()
        } else {
            self.target.urls.clone()
        };

        RunConfig::new(urls)
            .health_path(&self.target.health_path)
            .probe_timeout(Duration::from(self.target.probe_timeout))
            .scenario(self.load.scenario)
            .requests(self.load.requests)
            .workers(self.load.workers)
            .request_timeout(Duration::from(self.load.timeout))
            .cleanup_timeout(Duration::from(self.load.cleanup_timeout))
            .progress_every(self.load.progress_every)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let probe = LoadProbe::new(cli.config());

    match cli.command.unwrap_or(Command::Run) {
        Command::Check => {
            let survey = probe.survey().await?;
            print!("{survey}");
            if survey.recommended().is_none() {
                anyhow::bail!("no candidate is reachable");
            }
        }
        Command::Run => match probe.run().await {
            Ok(report) => {
                print!("{report}");
                println!("Requests/second: {:.2}", report.summary.throughput);
            }
            Err(RunError::CanaryFailed { outcome, cleanup }) => {
                error!("Canary failed, check the API: {outcome}");
                println!("{cleanup}");
                anyhow::bail!("canary request failed");
            }
            Err(RunError::Interrupted { cleanup }) => {
                println!("{cleanup}");
                anyhow::bail!("interrupted");
            }
            Err(err) => return Err(err.into()),
        },
    }

    Ok(())
}
