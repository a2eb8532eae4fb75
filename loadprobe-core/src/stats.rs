use crate::RequestOutcome;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::error;

/// Latency statistics over successful requests.
///
/// `median` is only reported when at least two samples exist.
#[derive(Clone, Debug, PartialEq)]
pub struct LatencyStats {
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub median: Option<Duration>,
}

impl LatencyStats {
    /// Returns `None` for an empty sample set rather than dividing by zero.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let secs: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
        let min = samples.iter().min().copied()?;
        let max = samples.iter().max().copied()?;
        let mean = statistical::mean(&secs);
        let median = if secs.len() > 1 {
            Some(to_duration(statistical::median(&secs)))
        } else {
            None
        };

        Some(Self {
            mean: to_duration(mean),
            min,
            max,
            median,
        })
    }
}

/// Histogram key for failed outcomes: the status code plus error text, if any.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorKey {
    pub status_code: u16,
    pub error: Option<String>,
}

impl From<&RequestOutcome> for ErrorKey {
    fn from(outcome: &RequestOutcome) -> Self {
        Self {
            status_code: outcome.status_code,
            error: outcome.error.clone(),
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status {}", self.status_code)?;
        if let Some(error) = &self.error {
            write!(f, " - {error}")?;
        }
        Ok(())
    }
}

/// Reduction of one run's outcomes.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub test_name: String,
    pub total_duration: Duration,
    pub success_count: usize,
    pub failure_count: usize,
    /// Successful requests per second of wall time.
    pub throughput: f64,
    pub latency: Option<LatencyStats>,
    pub errors: BTreeMap<ErrorKey, usize>,
}

impl RunSummary {
    /// Summarize `outcomes` collected between `started_at` and `now`.
    pub fn aggregate(
        test_name: &str,
        outcomes: &[RequestOutcome],
        started_at: Instant,
        now: Instant,
    ) -> Self {
        Self::from_elapsed(
            test_name,
            outcomes,
            now.saturating_duration_since(started_at),
        )
    }

    pub fn from_elapsed(test_name: &str, outcomes: &[RequestOutcome], elapsed: Duration) -> Self {
        let (successful, failed): (Vec<_>, Vec<_>) = outcomes.iter().partition(|o| o.success);

        let latencies: Vec<Duration> = successful.iter().map(|o| o.latency).collect();

        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0. {
            successful.len() as f64 / elapsed_secs
        } else {
            0.
        };

        let mut errors = BTreeMap::new();
        for outcome in &failed {
            *errors.entry(ErrorKey::from(*outcome)).or_insert(0) += 1;
        }

        Self {
            test_name: test_name.to_string(),
            total_duration: elapsed,
            success_count: successful.len(),
            failure_count: failed.len(),
            throughput,
            latency: LatencyStats::from_samples(&latencies),
            errors,
        }
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    /// Fraction of requests that succeeded, 0 when nothing ran.
    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.,
            total => self.success_count as f64 / total as f64,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==================== RESULTS {} ====================", self.test_name)?;
        writeln!(f, "Total time:          {:.2}s", self.total_duration.as_secs_f64())?;
        writeln!(f, "Successful requests: {}", self.success_count)?;
        writeln!(f, "Failed requests:     {}", self.failure_count)?;
        writeln!(f, "Success rate:        {:.1}%", self.success_rate() * 100.)?;

        match &self.latency {
            Some(latency) => {
                writeln!(f, "Requests/second:     {:.2}", self.throughput)?;
                writeln!(f, "Mean latency:        {}", Millis(latency.mean))?;
                writeln!(f, "Min latency:         {}", Millis(latency.min))?;
                writeln!(f, "Max latency:         {}", Millis(latency.max))?;
                if let Some(median) = latency.median {
                    writeln!(f, "Median latency:      {}", Millis(median))?;
                }
            }
            None => writeln!(f, "Latency:             no successful requests")?,
        }

        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for (key, count) in &self.errors {
                writeln!(f, "  {key}: {count} times")?;
            }
        }
        Ok(())
    }
}

struct Millis(Duration);

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}ms", self.0.as_secs_f64() * 1e3)
    }
}

fn to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs >= 0. {
        Duration::from_secs_f64(secs)
    } else {
        error!("Invalid latency calculation: {secs}");
        Duration::ZERO
    }
}
