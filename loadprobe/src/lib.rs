//! `loadprobe` checks that a users REST API is reachable, hits it with a
//! bounded-concurrency burst of requests, summarizes what came back, and
//! deletes every record it created.
//!
//! ```no_run
//! use loadprobe::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RunError> {
//!     let report = LoadProbe::new(RunConfig::default()).run().await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
pub mod cleanup;
pub mod driver;
pub mod harness;
pub mod prober;
pub mod runner;

mod error;

pub use error::{ProbeError, RunError};
pub use runner::{LoadProbe, RunReport};

pub use loadprobe_core as core;

pub mod prelude {
    pub use crate::cleanup::{CleanupDriver, CleanupReport};
    pub use crate::driver::{NewUser, RequestDriver};
    pub use crate::harness::{CreatedResources, Harness};
    pub use crate::prober::{ProbeAttempt, Prober, Survey};
    pub use crate::runner::{LoadProbe, RunReport};
    pub use crate::{ProbeError, RunError};

    pub use loadprobe_core::{
        Endpoint, RequestOutcome, ResourceId, RunConfig, RunSummary, Scenario,
    };
}
