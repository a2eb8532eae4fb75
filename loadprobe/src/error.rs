use crate::cleanup::CleanupReport;
use loadprobe_core::RequestOutcome;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("No candidate base URLs were given.")]
    NoCandidates,

    #[error("None of the {tried} candidate base URLs answered the health check with 200.")]
    ProbeFailed { tried: usize },
}

/// Failures that stop a run. Individual request failures never surface here.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Canary request failed ({outcome}); bulk run skipped.")]
    CanaryFailed {
        outcome: RequestOutcome,
        cleanup: CleanupReport,
    },

    #[error("Run interrupted; bulk run abandoned.")]
    Interrupted { cleanup: CleanupReport },

    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
