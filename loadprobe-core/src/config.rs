use crate::{
    CLEANUP_TIMEOUT, DEFAULT_CANDIDATES, DEFAULT_REQUESTS, DEFAULT_WORKERS, HEALTH_PATH,
    PROBE_TIMEOUT, PROGRESS_EVERY, REQUEST_TIMEOUT,
};
use humantime::format_duration;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// What the bulk phase of a run exercises.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scenario {
    /// `POST /users` for every request.
    #[default]
    Create,
    /// `GET /users` for every request.
    List,
    /// `GET /users/{id}` for every request, reading back the canary's record.
    Read,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Create => "create",
            Scenario::List => "list",
            Scenario::Read => "read",
        }
    }

    /// Test name used in the run summary.
    pub fn test_name(&self) -> &'static str {
        match self {
            Scenario::Create => "CREATE USERS",
            Scenario::List => "LIST USERS",
            Scenario::Read => "READ USER",
        }
    }

    /// Whether the canary for this scenario creates a record.
    pub fn canary_creates(&self) -> bool {
        matches!(self, Scenario::Create | Scenario::Read)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown scenario `{0}` (expected one of: create, list, read)")]
pub struct ParseScenarioError(String);

impl FromStr for Scenario {
    type Err = ParseScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Scenario::Create),
            "list" => Ok(Scenario::List),
            "read" => Ok(Scenario::Read),
            _ => Err(ParseScenarioError(s.to_string())),
        }
    }
}

/// Parameters for a single run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub candidates: Vec<String>,
    pub health_path: String,
    pub scenario: Scenario,
    pub requests: usize,
    pub workers: NonZeroUsize,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    pub cleanup_timeout: Duration,
    pub progress_every: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect(),
            health_path: HEALTH_PATH.to_string(),
            scenario: Scenario::default(),
            requests: DEFAULT_REQUESTS,
            workers: DEFAULT_WORKERS,
            probe_timeout: PROBE_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            cleanup_timeout: CLEANUP_TIMEOUT,
            progress_every: PROGRESS_EVERY,
        }
    }
}

impl RunConfig {
    /// Default configuration aimed at the given candidate base URLs.
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().candidates(candidates)
    }

    pub fn candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates
            .into_iter()
            .map(|c| normalize_base_url(&c.into()))
            .collect();
        self
    }

    pub fn health_path(mut self, path: &str) -> Self {
        self.health_path = path.to_string();
        self
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn requests(mut self, requests: usize) -> Self {
        self.requests = requests;
        self
    }

    pub fn workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn cleanup_timeout(mut self, timeout: Duration) -> Self {
        self.cleanup_timeout = timeout;
        self
    }

    pub fn progress_every(mut self, every: usize) -> Self {
        self.progress_every = every;
        self
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scenario={}, requests={}, workers={}, timeout={}",
            self.scenario,
            self.requests,
            self.workers,
            format_duration(self.request_timeout),
        )
    }
}

/// Strips trailing slashes so paths can be appended verbatim.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
