#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use campus_admin::session::store::TokenStore;
use campus_admin::session::{MemoryTokenStore, SessionContext};

pub const PASSWORD: &str = "secret";
pub const SIGNING_KEY: &[u8] = b"campus-test-key";

/// One request as the mock backend saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    role_fetches: Arc<AtomicUsize>,
}

impl MockState {
    fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) {
        let headers = headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        self.requests.lock().unwrap().push(Recorded {
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }
}

/// In-process backend speaking the campus REST API
pub struct MockBackend {
    pub port: u16,
    pub base_url: String,
    state: MockState,
}

impl MockBackend {
    pub async fn start() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let state = MockState::default();

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;
        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let backend = Self { port, base_url, state };
        backend.wait_ready(Duration::from_secs(5)).await?;
        backend.state.requests.lock().unwrap().clear();
        Ok(backend)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("mock backend did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request recorded")
    }

    pub fn role_fetches(&self) -> usize {
        self.state.role_fetches.load(Ordering::SeqCst)
    }

    /// Session context over an in-memory token store
    pub fn context(&self) -> (SessionContext, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::default());
        let ctx = SessionContext::connect(&self.base_url, "/users/login", store.clone() as Arc<dyn TokenStore>)
            .expect("valid mock url");
        (ctx, store)
    }

    /// Session context already holding `token`
    pub fn context_with_token(&self, token: &str) -> SessionContext {
        let (ctx, store) = self.context();
        store.store(token).expect("memory store");
        ctx
    }
}

/// HS256 token with the given payload
pub fn mint_token(claims: Value) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SIGNING_KEY)).expect("token encodes")
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn user_token(username: &str) -> String {
    let (user_id, role_id) = match username {
        "admin" => (7, 1),
        "teacher" => (8, 2),
        _ => (9, 3),
    };
    mint_token(json!({
        "sub": username,
        "user_id": user_id,
        "role_id": role_id,
        "exp": now() + 3600,
    }))
}

fn router(state: MockState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/users/login", post(login))
        .route("/roles/", get(roles))
        .route("/users/:id", get(user_profile))
        .route("/users/:id/upload-photo", post(echo))
        .route("/courses/", get(list_courses).post(create_course))
        .route("/courses/:id", get(get_course).put(echo).delete(delete_course))
        .route("/students/:id", get(echo).patch(echo))
        .route("/enrollments/", get(list_enrollments).put(echo).delete(echo))
        .route("/reports/performance-report/:id", get(performance_report))
        .route("/reports/export/csv/students/:id", get(export_csv))
        .route("/errors/text", get(text_error))
        .route("/errors/blank", get(blank_error))
        .route("/errors/message", get(message_error))
        .route("/errors/detail-list", get(detail_list_error))
        .route("/missing", get(missing))
        .route("/plain", get(plain))
        .route("/empty", put(empty).delete(empty))
        .fallback(echo)
        .with_state(state)
}

async fn echo(State(state): State<MockState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    state.record(&method, &uri, &headers, &body);
    let parsed: Value = serde_json::from_slice(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "body": parsed,
    }))
    .into_response()
}

async fn login(State(state): State<MockState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    state.record(&method, &uri, &headers, &body);
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let username = request["username"].as_str().unwrap_or_default();

    if request["password"].as_str() != Some(PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect username or password" })),
        )
            .into_response();
    }

    let token = user_token(username);
    let body = match username {
        "nested" => json!({ "data": { "access_token": token } }),
        "camel" => json!({ "accessToken": token }),
        "plain" => json!({ "token": token }),
        "tokenless" => json!({ "ok": true }),
        _ => json!({ "access_token": token, "token_type": "bearer" }),
    };
    Json(body).into_response()
}

async fn roles(State(state): State<MockState>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&method, &uri, &headers, &[]);
    state.role_fetches.fetch_add(1, Ordering::SeqCst);
    Json(json!([
        { "id": 1, "name": "Администратор" },
        { "id": 2, "name": "Преподаватель" },
        { "id": 3, "name": "Студент" },
    ]))
    .into_response()
}

async fn user_profile(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.record(&method, &uri, &headers, &[]);
    match id {
        7 => Json(json!({
            "id": 7,
            "username": "admin",
            "email": "admin@campus.test",
            "role_id": 1,
            "photo_url": "/static/7.png",
            "registration_date_time": "2024-09-01 10:00",
        }))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "detail": "User not found" }))).into_response(),
    }
}

fn course(id: i64) -> Value {
    json!({ "id": id, "title": format!("Course {id}"), "description": "Intro", "duration": 36, "teacher_id": 8 })
}

async fn list_courses(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.record(&method, &uri, &headers, &[]);
    let limit = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(3);
    Json((1..=limit).map(course).collect::<Vec<_>>()).into_response()
}

async fn create_course(State(state): State<MockState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    state.record(&method, &uri, &headers, &body);
    let mut created: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
    created["id"] = json!(99);
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn get_course(State(state): State<MockState>, Path(id): Path<i64>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&method, &uri, &headers, &[]);
    if id > 100 {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Course not found" }))).into_response();
    }
    Json(course(id)).into_response()
}

async fn delete_course(State(state): State<MockState>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&method, &uri, &headers, &[]);
    Json(json!({ "message": "Course deleted" })).into_response()
}

async fn list_enrollments(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.record(&method, &uri, &headers, &[]);
    let rows = vec![
        json!({ "student_id": 3, "course_id": 14, "enrollment_date": "2024-09-02", "grade": 4.5 }),
        json!({ "student_id": 3, "course_id": 15, "enrollment_date": "2024-09-02", "grade": null }),
        json!({ "student_id": 4, "course_id": 14, "enrollment_date": "2024-09-03", "grade": 3.0 }),
    ];
    let wanted = |row: &Value, key: &str| match params.get(key) {
        Some(v) => row[key].to_string() == *v,
        None => true,
    };
    let rows: Vec<Value> = rows
        .into_iter()
        .filter(|r| wanted(r, "student_id") && wanted(r, "course_id"))
        .collect();
    Json(rows).into_response()
}

async fn performance_report(State(state): State<MockState>, Path(id): Path<i64>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&method, &uri, &headers, &[]);
    Json(json!({
        "course_id": id,
        "students": [
            { "student_name": "Ann Lee", "average_grade": 4.5 },
            { "first_name": "Bo", "last_name": "Chen", "average_grade": "3.25" },
            { "student_name": "Cy Dunn" },
        ]
    }))
    .into_response()
}

async fn export_csv(State(state): State<MockState>, Path(id): Path<i64>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&method, &uri, &headers, &[]);
    match id {
        1 => ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], "id,name\n3,Ann Lee\n").into_response(),
        2 => Json(json!({
            "content": "id,name\n4,Bo Chen\n",
            "filename": "../../escape.csv",
            "content_type": "text/csv",
        }))
        .into_response(),
        _ => Json(json!({ "rows": 0 })).into_response(),
    }
}

async fn text_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain")],
        "database exploded",
    )
        .into_response()
}

async fn blank_error() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, [(header::CONTENT_TYPE, "text/plain")], "   ").into_response()
}

async fn message_error() -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        [("x-request-id", "req-42")],
        Json(json!({ "message": "bad input" })),
    )
        .into_response()
}

async fn detail_list_error() -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": [{ "loc": ["body", "title"], "msg": "field required" }] })),
    )
        .into_response()
}

async fn missing() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "not found" }))).into_response()
}

async fn plain() -> Response {
    ([(header::CONTENT_TYPE, "text/plain")], "hello").into_response()
}

async fn empty() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
