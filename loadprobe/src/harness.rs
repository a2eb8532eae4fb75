//! Concurrency Harness: a canary request, then a burst of requests spread
//! over a fixed pool of worker tasks.
use crate::driver::{NewUser, RequestDriver};
use loadprobe_core::{Endpoint, RequestOutcome, ResourceId, RunSummary, Scenario};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// Ids of records created during a run, in the order their creation was
/// confirmed. Append-only.
#[derive(Clone, Debug, Default)]
pub struct CreatedResources {
    ids: Vec<ResourceId>,
}

impl CreatedResources {
    pub fn push(&mut self, id: ResourceId) {
        self.ids.push(id);
    }

    pub fn ids(&self) -> &[ResourceId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A single unit of work for a worker.
#[derive(Clone, Debug)]
pub enum Operation {
    Create(NewUser),
    Fetch(Option<ResourceId>),
}

impl Operation {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Operation::Create(_) => Endpoint::CreateUser,
            Operation::Fetch(None) => Endpoint::ListUsers,
            Operation::Fetch(Some(_)) => Endpoint::GetUser,
        }
    }

    async fn execute(&self, driver: &RequestDriver) -> (RequestOutcome, Option<ResourceId>) {
        match self {
            Operation::Create(payload) => driver.create_resource(payload).await,
            Operation::Fetch(id) => (driver.fetch_resource(id.as_ref()).await, None),
        }
    }
}

/// Result of the pre-flight request.
#[derive(Clone, Debug)]
pub struct Canary {
    pub outcome: RequestOutcome,
    pub id: Option<ResourceId>,
}

/// A completed canary plus bulk phase.
#[derive(Clone, Debug)]
pub struct Exercised {
    pub canary: RequestOutcome,
    pub summary: RunSummary,
}

pub struct Harness {
    driver: Arc<RequestDriver>,
    workers: NonZeroUsize,
    progress_every: usize,
    tag: i64,
}

impl Harness {
    pub fn new(driver: Arc<RequestDriver>, workers: NonZeroUsize, progress_every: usize) -> Self {
        Self {
            driver,
            workers,
            progress_every,
            tag: crate::driver::run_tag(),
        }
    }

    /// Overrides the tag used to make generated emails unique.
    pub fn tag(mut self, tag: i64) -> Self {
        self.tag = tag;
        self
    }

    /// Canary, then `count` requests of `scenario`, then aggregation. The
    /// bulk phase is skipped and the failed canary returned if the canary
    /// does not succeed.
    #[instrument(name = "harness", skip_all, fields(scenario = %scenario, count = count))]
    pub async fn exercise(
        &self,
        scenario: Scenario,
        count: usize,
        created: &mut CreatedResources,
    ) -> Result<Exercised, RequestOutcome> {
        let canary = self.canary(scenario, created).await;
        if !canary.outcome.success {
            warn!("Canary failed: {}", canary.outcome);
            return Err(canary.outcome);
        }
        info!("Canary OK: {}", canary.outcome);

        let jobs = self.plan(scenario, count, canary.id.as_ref());

        let started_at = Instant::now();
        let outcomes = self.run_bulk(jobs, created).await;
        let summary = RunSummary::aggregate(
            scenario.test_name(),
            &outcomes,
            started_at,
            Instant::now(),
        );

        Ok(Exercised {
            canary: canary.outcome,
            summary,
        })
    }

    /// One synchronous request of the scenario's kind. A created record is
    /// added to `created` so it gets cleaned up with the rest.
    pub async fn canary(&self, scenario: Scenario, created: &mut CreatedResources) -> Canary {
        let op = if scenario.canary_creates() {
            Operation::Create(NewUser::canary(self.tag))
        } else {
            Operation::Fetch(None)
        };

        let (outcome, id) = op.execute(&self.driver).await;
        if let Some(id) = &id {
            created.push(id.clone());
        }
        Canary { outcome, id }
    }

    /// The bulk jobs for a scenario. `Read` reads back `read_target`, and
    /// falls back to listing when there is none.
    pub fn plan(
        &self,
        scenario: Scenario,
        count: usize,
        read_target: Option<&ResourceId>,
    ) -> Vec<Operation> {
        (0..count)
            .map(|i| match scenario {
                Scenario::Create => Operation::Create(NewUser::numbered(i, self.tag)),
                Scenario::List => Operation::Fetch(None),
                Scenario::Read => Operation::Fetch(read_target.cloned()),
            })
            .collect()
    }

    /// Runs every job on the worker pool and returns the outcomes in
    /// completion order. Every job yields exactly one outcome.
    #[instrument(name = "bulk", skip_all, fields(jobs = jobs.len(), workers = self.workers.get()))]
    pub async fn run_bulk(
        &self,
        jobs: Vec<Operation>,
        created: &mut CreatedResources,
    ) -> Vec<RequestOutcome> {
        let total = jobs.len();
        let endpoint = jobs.first().map(Operation::endpoint);
        info!("Starting {total} requests on {} workers", self.workers);

        let (job_tx, job_rx) = async_channel::unbounded();
        for job in jobs {
            if job_tx.try_send(job).is_err() {
                error!("Job queue closed unexpectedly.");
                break;
            }
        }
        job_tx.close();

        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        // Dropping the set aborts the workers, so an abandoned burst stops
        // issuing requests.
        let mut workers = JoinSet::new();
        for _ in 0..self.workers.get().min(total) {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            let driver = self.driver.clone();
            workers.spawn(
                async move {
                    while let Ok(job) = job_rx.recv().await {
                        let done = job.execute(&driver).await;
                        if done_tx.send(done).is_err() {
                            break;
                        }
                    }
                }
                .in_current_span(),
            );
        }
        drop(done_tx);
        drop(job_rx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some((outcome, id)) = done_rx.recv().await {
            debug!("{outcome}");
            if let Some(id) = id {
                created.push(id);
            }
            outcomes.push(outcome);

            if self.progress_every > 0 && outcomes.len() % self.progress_every == 0 {
                info!("Processed: {}/{total}", outcomes.len());
            }
        }

        while let Some(res) = workers.join_next().await {
            if let Err(err) = res {
                error!("Worker task failed: {err}");
            }
        }

        // A job lost to a failed worker still counts against the run.
        if let Some(endpoint) = endpoint {
            let missing = total.saturating_sub(outcomes.len());
            if missing > 0 {
                warn!("{missing} requests produced no outcome.");
            }
            outcomes.extend((0..missing).map(|_| {
                RequestOutcome::transport_failure(endpoint, Duration::ZERO, "worker task aborted")
            }));
        }

        outcomes
    }
}
