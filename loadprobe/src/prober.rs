//! Target Prober: finds the first candidate base URL whose health check
//! answers 200.
use crate::ProbeError;
use loadprobe_core::normalize_base_url;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const BODY_PREVIEW_CHARS: usize = 200;

/// What one health request against one candidate produced.
#[derive(Clone, Debug)]
pub struct ProbeAttempt {
    pub base_url: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub error: Option<String>,
    pub latency: Duration,
}

impl ProbeAttempt {
    pub fn is_healthy(&self) -> bool {
        self.status == Some(StatusCode::OK.as_u16())
    }
}

impl fmt::Display for ProbeAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.latency.as_secs_f64() * 1e3;
        match (self.status, &self.error) {
            (Some(status), _) => {
                write!(f, "{} -> status {status} in {ms:.2}ms", self.base_url)?;
                if let Some(body) = &self.body {
                    write!(f, ", response: {body}")?;
                }
                Ok(())
            }
            (None, Some(error)) => write!(f, "{} -> failed in {ms:.2}ms: {error}", self.base_url),
            (None, None) => write!(f, "{} -> no response", self.base_url),
        }
    }
}

/// Health check results for every candidate.
#[derive(Clone, Debug)]
pub struct Survey {
    pub attempts: Vec<ProbeAttempt>,
}

impl Survey {
    /// First candidate that answered 200, in candidate order.
    pub fn recommended(&self) -> Option<&str> {
        self.attempts
            .iter()
            .find(|a| a.is_healthy())
            .map(|a| a.base_url.as_str())
    }
}

impl fmt::Display for Survey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attempt in &self.attempts {
            let mark = if attempt.is_healthy() { "ok  " } else { "FAIL" };
            writeln!(f, "[{mark}] {attempt}")?;
        }
        match self.recommended() {
            Some(url) => writeln!(f, "Use this base URL: {url}"),
            None => writeln!(f, "No candidate answered the health check."),
        }
    }
}

pub struct Prober {
    client: Client,
    health_path: String,
    timeout: Duration,
}

impl Prober {
    pub fn new(client: Client, health_path: &str, timeout: Duration) -> Self {
        let health_path = if health_path.starts_with('/') {
            health_path.to_string()
        } else {
            format!("/{health_path}")
        };
        Self {
            client,
            health_path,
            timeout,
        }
    }

    /// Tries each candidate in order and returns the first base URL whose
    /// health check answers exactly 200.
    #[instrument(name = "probe", skip_all)]
    pub async fn probe(&self, candidates: &[String]) -> Result<String, ProbeError> {
        if candidates.is_empty() {
            return Err(ProbeError::NoCandidates);
        }

        for candidate in candidates {
            let attempt = self.attempt(candidate).await;
            if attempt.is_healthy() {
                info!("{attempt}");
                return Ok(attempt.base_url);
            }
            warn!("{attempt}");
        }

        Err(ProbeError::ProbeFailed {
            tried: candidates.len(),
        })
    }

    /// Health checks every candidate, without stopping at the first success.
    #[instrument(name = "survey", skip_all)]
    pub async fn survey(&self, candidates: &[String]) -> Survey {
        let mut attempts = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let attempt = self.attempt(candidate).await;
            debug!("{attempt}");
            attempts.push(attempt);
        }
        Survey { attempts }
    }

    async fn attempt(&self, candidate: &str) -> ProbeAttempt {
        let base_url = normalize_base_url(candidate);
        let url = format!("{base_url}{}", self.health_path);
        debug!("Trying {url}");

        let start = Instant::now();
        let res = self.client.get(&url).timeout(self.timeout).send().await;

        match res {
            Ok(res) => {
                let status = res.status().as_u16();
                let body = res.text().await.ok().map(|body| preview(&body));
                ProbeAttempt {
                    base_url,
                    status: Some(status),
                    body,
                    error: None,
                    latency: start.elapsed(),
                }
            }
            Err(err) => ProbeAttempt {
                base_url,
                status: None,
                body: None,
                error: Some(err.to_string()),
                latency: start.elapsed(),
            },
        }
    }
}

fn preview(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > BODY_PREVIEW_CHARS {
        let cut: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}
