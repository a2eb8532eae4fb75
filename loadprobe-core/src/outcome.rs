use std::fmt;
use std::time::Duration;

/// Label for the call an outcome was produced by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    CreateUser,
    ListUsers,
    GetUser,
    DeleteUser,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Health => "GET /health",
            Endpoint::CreateUser => "POST /users",
            Endpoint::ListUsers => "GET /users",
            Endpoint::GetUser => "GET /users/:id",
            Endpoint::DeleteUser => "DELETE /users/:id",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier handed back by the target for a created record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recorded result of one request. `status_code` is 0 when the transport
/// failed before any response arrived.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOutcome {
    pub success: bool,
    pub status_code: u16,
    pub latency: Duration,
    pub endpoint: Endpoint,
    pub error: Option<String>,
}

impl RequestOutcome {
    pub fn succeeded(endpoint: Endpoint, status_code: u16, latency: Duration) -> Self {
        Self {
            success: true,
            status_code,
            latency,
            endpoint,
            error: None,
        }
    }

    /// The target answered, but not in a way that counts as success.
    pub fn rejected(
        endpoint: Endpoint,
        status_code: u16,
        latency: Duration,
        error: Option<String>,
    ) -> Self {
        Self {
            success: false,
            status_code,
            latency,
            endpoint,
            error,
        }
    }

    /// No response was received at all.
    pub fn transport_failure(endpoint: Endpoint, latency: Duration, error: impl fmt::Display) -> Self {
        Self {
            success: false,
            status_code: 0,
            latency,
            endpoint,
            error: Some(error.to_string()),
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        !self.success && self.status_code == 0
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> success={}, status={}, latency={:.2}ms",
            self.endpoint,
            self.success,
            self.status_code,
            self.latency.as_secs_f64() * 1e3,
        )?;
        if let Some(error) = &self.error {
            write!(f, ", error={error}")?;
        }
        Ok(())
    }
}
