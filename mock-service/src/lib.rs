//! A small in-memory "users" API used as a stand-in target for `loadprobe`.
//!
//! Every route can be made to misbehave through [`MockBehavior`].
use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, RwLock,
};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub use axum::http::StatusCode;

/// Fault injection knobs.
#[derive(Clone, Debug)]
pub struct MockBehavior {
    pub health_status: StatusCode,
    pub health_delay: Option<Duration>,
    /// Answer every creation with this status instead of creating a record.
    pub create_status: Option<StatusCode>,
    /// Delay every `n`th creation request (1-based) by `slow_create_delay`.
    pub slow_create_every: Option<usize>,
    pub slow_create_delay: Duration,
    /// Reply 201 to creations without an `id` field.
    pub omit_id: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            health_status: StatusCode::OK,
            health_delay: None,
            create_status: None,
            slow_create_every: None,
            slow_create_delay: Duration::from_secs(1),
            omit_id: false,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

#[derive(Default)]
struct Inner {
    users: RwLock<HashMap<String, User>>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

#[derive(Clone)]
pub struct MockState {
    behavior: Arc<MockBehavior>,
    inner: Arc<Inner>,
}

impl MockState {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(behavior),
            inner: Arc::new(Inner::default()),
        }
    }

    /// Number of records currently stored.
    pub fn user_count(&self) -> usize {
        self.inner.users.read().map(|u| u.len()).unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .users
            .read()
            .map(|u| u.contains_key(id))
            .unwrap_or_default()
    }

    /// Number of `POST /users` requests received, whatever their outcome.
    pub fn create_calls(&self) -> usize {
        self.inner.create_calls.load(Ordering::Relaxed)
    }

    pub fn delete_calls(&self) -> usize {
        self.inner.delete_calls.load(Ordering::Relaxed)
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).delete(delete_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `addr` until the process exits.
pub async fn run(addr: SocketAddr, behavior: MockBehavior) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(MockState::new(behavior))).await?;
    Ok(())
}

/// A mock bound to an ephemeral local port, served on a background task.
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: MockState,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(behavior: MockBehavior) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = MockState::new(behavior);
        let app = router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("mock service stopped: {err}");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[debug_handler]
async fn health(State(state): State<MockState>) -> Response {
    if let Some(delay) = state.behavior.health_delay {
        tokio::time::sleep(delay).await;
    }
    (state.behavior.health_status, Json(json!({ "status": "ok" }))).into_response()
}

#[debug_handler]
async fn create_user(
    State(state): State<MockState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Response {
    let call = state.inner.create_calls.fetch_add(1, Ordering::Relaxed) + 1;
    let behavior = &state.behavior;

    if let Some(every) = behavior.slow_create_every {
        if every > 0 && call % every == 0 {
            debug!("delaying creation #{call}");
            tokio::time::sleep(behavior.slow_create_delay).await;
        }
    }

    if let Some(status) = behavior.create_status {
        return (status, Json(json!({ "error": "forced failure" }))).into_response();
    }

    let Json(req) = match body {
        Ok(req) => req,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid request body",
                    "details": rejection.body_text(),
                })),
            )
                .into_response()
        }
    };

    let now = timestamp();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name,
        email: req.email,
        created_at: now.clone(),
        updated_at: now,
    };

    {
        let Ok(mut users) = state.inner.users.write() else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        if users.values().any(|u| u.email == user.email) {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "email already exists" })),
            )
                .into_response();
        }
        users.insert(user.id.clone(), user.clone());
    }

    if behavior.omit_id {
        return (
            StatusCode::CREATED,
            Json(json!({ "name": user.name, "email": user.email })),
        )
            .into_response();
    }

    (StatusCode::CREATED, Json(user)).into_response()
}

#[debug_handler]
async fn list_users(State(state): State<MockState>) -> Response {
    let Ok(users) = state.inner.users.read() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let users: Vec<User> = users.values().cloned().collect();
    let total = users.len();
    Json(json!({ "users": users, "total": total })).into_response()
}

#[debug_handler]
async fn get_user(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    let Ok(users) = state.inner.users.read() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    match users.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "user not found" })),
        )
            .into_response(),
    }
}

#[debug_handler]
async fn delete_user(State(state): State<MockState>, Path(id): Path<String>) -> StatusCode {
    state.inner.delete_calls.fetch_add(1, Ordering::Relaxed);
    let Ok(mut users) = state.inner.users.write() else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    match users.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
