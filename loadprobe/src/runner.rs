//! Whole-run orchestration: probe, canary and bulk phase, aggregation, and
//! a cleanup pass that runs whatever happened in between.
use crate::cleanup::{CleanupDriver, CleanupReport};
use crate::driver::RequestDriver;
use crate::harness::{CreatedResources, Exercised, Harness};
use crate::prober::{Prober, Survey};
use crate::RunError;
use futures_util::FutureExt;
use loadprobe_core::{RequestOutcome, RunConfig, RunSummary};
use reqwest::Client;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Everything a successful run produced.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub target: String,
    pub canary: RequestOutcome,
    pub summary: RunSummary,
    pub cleanup: CleanupReport,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target: {}", self.target)?;
        writeln!(f, "Canary: {}", self.canary)?;
        write!(f, "{}", self.summary)?;
        writeln!(f, "{}", self.cleanup)
    }
}

pub struct LoadProbe {
    config: RunConfig,
    client: Option<Client>,
}

impl LoadProbe {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Use a preconfigured client instead of building one.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn build_client(&self) -> Result<Client, RunError> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => Ok(Client::builder().build()?),
        }
    }

    /// Health checks every candidate and reports on each.
    pub async fn survey(&self) -> Result<Survey, RunError> {
        let client = self.build_client()?;
        let prober = Prober::new(client, &self.config.health_path, self.config.probe_timeout);
        Ok(prober.survey(&self.config.candidates).await)
    }

    /// Runs probe, canary, bulk phase and cleanup, stopping early on Ctrl-C.
    ///
    /// Only a failed probe, a failed canary or an interrupt stops a run. Once
    /// a target has been found, cleanup always runs before this returns.
    pub async fn run(self) -> Result<RunReport, RunError> {
        self.run_until(ctrl_c()).await
    }

    /// Like [`LoadProbe::run`], but the canary and bulk phase are abandoned
    /// as soon as `interrupt` completes. Records confirmed so far are still
    /// cleaned up.
    #[instrument(name = "loadprobe", skip_all)]
    pub async fn run_until<I>(self, interrupt: I) -> Result<RunReport, RunError>
    where
        I: Future<Output = ()>,
    {
        info!("Running with config {}", self.config);
        let client = self.build_client()?;

        let prober = Prober::new(
            client.clone(),
            &self.config.health_path,
            self.config.probe_timeout,
        );
        let target = prober.probe(&self.config.candidates).await?;
        info!("Connected to {target}");

        let driver = Arc::new(RequestDriver::new(
            client,
            &target,
            self.config.request_timeout,
        ));
        let harness = Harness::new(
            driver.clone(),
            self.config.workers,
            self.config.progress_every,
        );

        let mut created = CreatedResources::default();
        let exercise = AssertUnwindSafe(harness.exercise(
            self.config.scenario,
            self.config.requests,
            &mut created,
        ))
        .catch_unwind();

        let exercised = tokio::select! {
            exercised = exercise => Some(exercised),
            _ = interrupt => {
                warn!("Interrupted, cleaning up before exit.");
                None
            }
        };

        let cleanup = CleanupDriver::new(driver, self.config.cleanup_timeout)
            .run(created.ids())
            .await;

        let exercised = match exercised {
            None => return Err(RunError::Interrupted { cleanup }),
            Some(Ok(exercised)) => exercised,
            Some(Err(payload)) => {
                error!("Run aborted after cleaning up {} records.", cleanup.deleted);
                panic::resume_unwind(payload)
            }
        };

        match exercised {
            Ok(Exercised { canary, summary }) => Ok(RunReport {
                target,
                canary,
                summary,
                cleanup,
            }),
            Err(outcome) => Err(RunError::CanaryFailed { outcome, cleanup }),
        }
    }
}

/// Completes on the first Ctrl-C. If the handler cannot be installed the run
/// is simply never interrupted.
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}
