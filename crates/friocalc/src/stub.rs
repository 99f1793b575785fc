//! In-process stand-in for the history service, used by async tests.
//!
//! Sessions are cookie based like the real service. Tests can seed rows,
//! inject a failure or a slow reply for the next request and inspect what
//! was received.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::types::now_timestamp;

#[derive(Debug, Clone)]
struct Row {
    id: i64,
    owner: String,
    action: String,
    obs: String,
    timestamp: String,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, String>,
    sessions: HashMap<String, String>,
    rows: Vec<Row>,
    next_id: i64,
    next_token: u64,
    failure: Option<(StatusCode, Option<String>)>,
    delay: Option<Duration>,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<Inner>>;

fn lock(state: &Shared) -> MutexGuard<'_, Inner> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct StubServer {
    state: Shared,
    addr: std::net::SocketAddr,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(Inner {
            next_id: 1,
            ..Default::default()
        }));

        let app = Router::new()
            .route("/login", post(login))
            .route("/register", post(register))
            .route("/logout", post(logout))
            .route("/history", get(list).post(create))
            .route("/history/{id}", put(update).delete(remove))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            addr,
            handle,
        }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    pub fn add_user(&self, username: &str, password: &str) {
        lock(&self.state)
            .users
            .insert(username.to_string(), password.to_string());
    }

    /// Store a row directly, as if another client had created it
    pub fn seed(&self, owner: &str, action: &str, obs: &str) -> i64 {
        let mut inner = lock(&self.state);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.rows.push(Row {
            id,
            owner: owner.to_string(),
            action: action.to_string(),
            obs: obs.to_string(),
            timestamp: now_timestamp(),
        });
        id
    }

    /// Actions stored for a user, oldest first
    pub fn actions(&self, owner: &str) -> Vec<String> {
        lock(&self.state)
            .rows
            .iter()
            .filter(|r| r.owner == owner)
            .map(|r| r.action.clone())
            .collect()
    }

    /// Make the next history or logout request fail with this status
    pub fn fail_next(&self, status: StatusCode, message: Option<&str>) {
        lock(&self.state).failure = Some((status, message.map(str::to_string)));
    }

    /// Hold back the next history GET or POST response. The request is
    /// applied straight away; only the reply is late.
    pub fn delay_next(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    /// Requests received so far, as "METHOD /path"
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    pub fn count(&self, request: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.as_str() == request)
            .count()
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct EntryBody {
    action: String,
    #[serde(default)]
    obs: String,
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

/// Record the request and return the injected failure, if any
fn intercept(inner: &mut Inner, request: String) -> Option<Response> {
    inner.requests.push(request);
    inner.failure.take().map(|(status, text)| match text {
        Some(text) => message(status, &text),
        None => (status, "oops").into_response(),
    })
}

async fn pause(state: &Shared) {
    let delay = lock(state).delay.take();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

fn session_user(inner: &Inner, headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().strip_prefix("session="))
        .find_map(|token| inner.sessions.get(token).cloned())
}

fn unauthorized() -> Response {
    message(StatusCode::UNAUTHORIZED, "Not authenticated")
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let mut inner = lock(&state);
    inner.requests.push("POST /login".to_string());
    if inner.users.get(&body.username) != Some(&body.password) {
        return message(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    inner.next_token += 1;
    let token = format!("tok{}", inner.next_token);
    inner.sessions.insert(token.clone(), body.username.clone());
    (
        [(header::SET_COOKIE, format!("session={}; Path=/; HttpOnly", token))],
        Json(json!({ "message": "ok", "user": { "username": body.username } })),
    )
        .into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let mut inner = lock(&state);
    inner.requests.push("POST /register".to_string());
    if inner.users.contains_key(&body.username) {
        return message(StatusCode::CONFLICT, "User already exists");
    }
    inner.users.insert(body.username, body.password);
    message(StatusCode::CREATED, "registered")
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut inner = lock(&state);
    if let Some(failure) = intercept(&mut inner, "POST /logout".to_string()) {
        return failure;
    }
    let cookies = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    for token in cookies
        .split(';')
        .filter_map(|pair| pair.trim().strip_prefix("session="))
    {
        inner.sessions.remove(token);
    }
    message(StatusCode::OK, "bye")
}

async fn list(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let response = list_rows(&state, &headers);
    pause(&state).await;
    response
}

fn list_rows(state: &Shared, headers: &HeaderMap) -> Response {
    let mut inner = lock(state);
    if let Some(failure) = intercept(&mut inner, "GET /history".to_string()) {
        return failure;
    }
    let Some(owner) = session_user(&inner, headers) else {
        return unauthorized();
    };
    let history: Vec<_> = inner
        .rows
        .iter()
        .rev()
        .filter(|r| r.owner == owner)
        .map(|r| {
            json!({
                "id": r.id,
                "action": r.action,
                "obs": r.obs,
                "timestamp": r.timestamp,
            })
        })
        .collect();
    Json(json!({ "history": history })).into_response()
}

async fn create(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<EntryBody>,
) -> Response {
    let response = create_row(&state, &headers, body);
    pause(&state).await;
    response
}

fn create_row(state: &Shared, headers: &HeaderMap, body: EntryBody) -> Response {
    let mut inner = lock(state);
    if let Some(failure) = intercept(&mut inner, "POST /history".to_string()) {
        return failure;
    }
    let Some(owner) = session_user(&inner, headers) else {
        return unauthorized();
    };
    if body.action.trim().is_empty() {
        return message(StatusCode::BAD_REQUEST, "Action is required");
    }
    let id = inner.next_id;
    inner.next_id += 1;
    inner.rows.push(Row {
        id,
        owner,
        action: body.action,
        obs: body.obs,
        timestamp: now_timestamp(),
    });
    (StatusCode::CREATED, Json(json!({ "id": id }))).into_response()
}

async fn update(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<EntryBody>,
) -> Response {
    let mut inner = lock(&state);
    if let Some(failure) = intercept(&mut inner, format!("PUT /history/{}", id)) {
        return failure;
    }
    let Some(owner) = session_user(&inner, &headers) else {
        return unauthorized();
    };
    match inner
        .rows
        .iter_mut()
        .find(|r| r.id == id && r.owner == owner)
    {
        Some(row) => {
            row.action = body.action;
            row.obs = body.obs;
            row.timestamp = now_timestamp();
            Json(json!({})).into_response()
        }
        None => message(StatusCode::NOT_FOUND, "Entry not found"),
    }
}

async fn remove(State(state): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    let mut inner = lock(&state);
    if let Some(failure) = intercept(&mut inner, format!("DELETE /history/{}", id)) {
        return failure;
    }
    let Some(owner) = session_user(&inner, &headers) else {
        return unauthorized();
    };
    let before = inner.rows.len();
    inner.rows.retain(|r| !(r.id == id && r.owner == owner));
    if inner.rows.len() == before {
        return message(StatusCode::NOT_FOUND, "Entry not found");
    }
    Json(json!({})).into_response()
}
