//! Cleanup Driver: best-effort deletion of every record a run created.
use crate::driver::RequestDriver;
use loadprobe_core::ResourceId;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub attempted: usize,
    pub deleted: usize,
}

impl CleanupReport {
    pub fn skipped(&self) -> usize {
        self.attempted - self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Cleanup: nothing to clean")
        } else {
            write!(
                f,
                "Cleanup: {} of {} records removed ({} skipped)",
                self.deleted,
                self.attempted,
                self.skipped()
            )
        }
    }
}

pub struct CleanupDriver {
    driver: Arc<RequestDriver>,
    timeout: Duration,
}

impl CleanupDriver {
    pub fn new(driver: Arc<RequestDriver>, timeout: Duration) -> Self {
        Self { driver, timeout }
    }

    /// Deletes each id in turn. Failures are counted, never raised, so this
    /// is safe to call again on the same ids.
    #[instrument(name = "cleanup", skip_all, fields(ids = ids.len()))]
    pub async fn run(&self, ids: &[ResourceId]) -> CleanupReport {
        if ids.is_empty() {
            info!("Nothing to clean.");
            return CleanupReport::default();
        }

        info!("Cleaning up {} created records...", ids.len());

        let mut report = CleanupReport {
            attempted: ids.len(),
            deleted: 0,
        };
        for id in ids {
            let outcome = self.driver.delete_resource(id, self.timeout).await;
            if outcome.success {
                report.deleted += 1;
            } else {
                debug!("Skipping {id}: {outcome}");
            }
        }

        if report.skipped() > 0 {
            warn!("{} records could not be removed.", report.skipped());
        }
        info!("{} records removed.", report.deleted);
        report
    }
}
