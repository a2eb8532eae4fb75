//! Request Driver: one HTTP call in, one [`RequestOutcome`] out.
//!
//! No method here returns an error. Timeouts, refused connections, bad
//! status codes and malformed bodies all become failed outcomes so that a
//! burst of requests can tolerate partial failure.
use loadprobe_core::{
    Endpoint, RequestOutcome, ResourceId, DEBUG_ECHO_RESPONSES, USERS_PATH,
};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Body of `POST /users`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    /// Payload for the `index`th request of a run tagged `tag`.
    pub fn numbered(index: usize, tag: i64) -> Self {
        Self {
            name: format!("User{index}"),
            email: format!("user{index}_{tag}_{index}@test.com"),
        }
    }

    pub fn canary(tag: i64) -> Self {
        Self {
            name: "Canary".to_string(),
            email: format!("canary_{tag}@test.com"),
        }
    }
}

/// Unix timestamp used to keep generated emails unique across runs.
pub fn run_tag() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub struct RequestDriver {
    client: Client,
    base_url: String,
    timeout: Duration,
    echoed: AtomicUsize,
}

impl RequestDriver {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: loadprobe_core::normalize_base_url(base_url),
            timeout,
            echoed: AtomicUsize::new(0),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn users_url(&self) -> String {
        format!("{}{USERS_PATH}", self.base_url)
    }

    fn user_url(&self, id: &ResourceId) -> String {
        format!("{}{USERS_PATH}/{id}", self.base_url)
    }

    /// `POST /users`. Success requires 200/201 and a JSON body carrying an
    /// `id`; the id is returned only in that case.
    pub async fn create_resource(&self, payload: &NewUser) -> (RequestOutcome, Option<ResourceId>) {
        let endpoint = Endpoint::CreateUser;
        let start = Instant::now();

        let res = self
            .client
            .post(self.users_url())
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                return (
                    RequestOutcome::transport_failure(endpoint, start.elapsed(), err),
                    None,
                )
            }
        };

        let status = res.status();
        let body = res.bytes().await;
        let latency = start.elapsed();

        // A body that never fully arrives is a transport failure, whatever
        // the headers said.
        let body = match body {
            Ok(body) => body,
            Err(err) => return (RequestOutcome::transport_failure(endpoint, latency, err), None),
        };

        self.echo(status, &body);

        if !matches!(status, StatusCode::OK | StatusCode::CREATED) {
            return (
                RequestOutcome::rejected(endpoint, status.as_u16(), latency, None),
                None,
            );
        }

        match extract_id(&body) {
            Ok(id) => (
                RequestOutcome::succeeded(endpoint, status.as_u16(), latency),
                Some(id),
            ),
            Err(reason) => (
                RequestOutcome::rejected(endpoint, status.as_u16(), latency, Some(reason)),
                None,
            ),
        }
    }

    /// `GET /users` when `id` is `None`, otherwise `GET /users/{id}`.
    /// Success iff the status is exactly 200.
    pub async fn fetch_resource(&self, id: Option<&ResourceId>) -> RequestOutcome {
        let (endpoint, url) = match id {
            Some(id) => (Endpoint::GetUser, self.user_url(id)),
            None => (Endpoint::ListUsers, self.users_url()),
        };
        let start = Instant::now();

        let res = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(res) => res,
            Err(err) => return RequestOutcome::transport_failure(endpoint, start.elapsed(), err),
        };

        let status = res.status();
        let body = res.bytes().await;
        let latency = start.elapsed();

        match body {
            Ok(_) if status == StatusCode::OK => {
                RequestOutcome::succeeded(endpoint, status.as_u16(), latency)
            }
            Ok(_) => RequestOutcome::rejected(endpoint, status.as_u16(), latency, None),
            Err(err) => RequestOutcome::transport_failure(endpoint, latency, err),
        }
    }

    /// `DELETE /users/{id}`. Success iff the status is 200 or 204.
    pub async fn delete_resource(&self, id: &ResourceId, timeout: Duration) -> RequestOutcome {
        let endpoint = Endpoint::DeleteUser;
        let start = Instant::now();

        match self
            .client
            .delete(self.user_url(id))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(res) => {
                let status = res.status();
                let latency = start.elapsed();
                if matches!(status, StatusCode::OK | StatusCode::NO_CONTENT) {
                    RequestOutcome::succeeded(endpoint, status.as_u16(), latency)
                } else {
                    RequestOutcome::rejected(endpoint, status.as_u16(), latency, None)
                }
            }
            Err(err) => RequestOutcome::transport_failure(endpoint, start.elapsed(), err),
        }
    }

    fn echo(&self, status: StatusCode, body: &[u8]) {
        if self.echoed.fetch_add(1, Ordering::Relaxed) < DEBUG_ECHO_RESPONSES {
            let text = String::from_utf8_lossy(body);
            let text: String = text.chars().take(100).collect();
            debug!("Status: {}, Response: {text}", status.as_u16());
        }
    }
}

/// Pulls a non-null `id` (string or number) out of a JSON object body.
fn extract_id(body: &[u8]) -> Result<ResourceId, String> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| format!("response is not valid JSON: {err}"))?;

    match value.get("id") {
        Some(serde_json::Value::String(id)) if !id.is_empty() => Ok(ResourceId::new(id.as_str())),
        Some(serde_json::Value::Number(id)) => Ok(ResourceId::new(id.to_string())),
        _ => Err("response missing `id` field".to_string()),
    }
}
