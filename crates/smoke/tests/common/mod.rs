//! In-process mock of the EPD backend for smoke run tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use epd_client::ClientConfig;
use epd_smoke::{Credentials, SmokeConfig};
use serde_json::{json, Value};

pub const ADMIN_EMAIL: &str = "admin@example.test";
pub const THERAPIST_EMAIL: &str = "therapeut@example.test";
pub const PASSWORD: &str = "secret";

/// How the mock finishes an import job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Every row imported.
    #[default]
    Complete,
    /// Job completes, but the last row is rejected.
    LastRowRejected,
    /// Job fails after importing the first row.
    JobFailed,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub clients: BTreeMap<u64, Value>,
    pub next_id: u64,
    pub deleted: Vec<u64>,
    /// Data rows in the last uploaded file.
    pub imported_rows: u64,
    /// Answer `POST /api/clients` with a 500.
    pub fail_client_create: bool,
    /// `processing` answers before the job reaches its outcome.
    pub processing_polls: u32,
    pub import_outcome: ImportOutcome,
    /// Progress requests served so far.
    pub progress_polls: u32,
}

impl MockState {
    pub fn shared(self) -> Shared {
        Arc::new(Mutex::new(self))
    }

    pub fn failing_client_create() -> Self {
        Self {
            fail_client_create: true,
            ..Default::default()
        }
    }

    pub fn with_import(outcome: ImportOutcome, processing_polls: u32) -> Self {
        Self {
            import_outcome: outcome,
            processing_polls,
            ..Default::default()
        }
    }
}

pub type Shared = Arc<Mutex<MockState>>;

/// Serve `app` on an ephemeral localhost port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{addr}")
}

pub async fn spawn_backend(state: Shared) -> String {
    spawn_server(mock_backend(state)).await
}

pub fn smoke_config(base_url: &str, admin_password: &str) -> SmokeConfig {
    SmokeConfig {
        client: ClientConfig {
            base_url: base_url.to_string(),
            token: None,
            request_timeout_secs: 5,
        },
        admin: Credentials {
            email: ADMIN_EMAIL.to_string(),
            password: admin_password.to_string(),
        },
        therapist: Some(Credentials {
            email: THERAPIST_EMAIL.to_string(),
            password: PASSWORD.to_string(),
        }),
        client_user: None,
        import_poll_interval: Duration::from_millis(5),
        import_max_polls: 10,
    }
}

pub fn mock_backend(state: Shared) -> Router {
    Router::new()
        .route("/api/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/auth/login", post(login))
        .route("/api/clients", get(list_clients).post(create_client))
        .route(
            "/api/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/api/therapists", get(list_therapists))
        .route("/api/appointments", get(list_appointments))
        .route("/api/import/{kind}", post(start_import))
        .route("/api/import/progress/{id}", get(import_progress))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn role_of(headers: &HeaderMap) -> Option<&'static str> {
    match headers.get("authorization")?.to_str().ok()? {
        "Bearer admin-token" => Some("admin"),
        "Bearer therapist-token" => Some("therapist"),
        _ => None,
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let (token, role, id) = match (email, password) {
        (ADMIN_EMAIL, PASSWORD) => ("admin-token", "admin", 1),
        (THERAPIST_EMAIL, PASSWORD) => ("therapist-token", "therapist", 2),
        _ => return error(StatusCode::UNAUTHORIZED, "Ongeldige inloggegevens"),
    };
    ok(json!({
        "token": token,
        "user": { "id": id, "email": email, "role": role }
    }))
}

async fn list_clients(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if role_of(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Niet ingelogd");
    }
    let clients: Vec<Value> = state.lock().unwrap().clients.values().cloned().collect();
    ok(Value::Array(clients))
}

async fn create_client(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if role_of(&headers) != Some("admin") {
        return error(StatusCode::FORBIDDEN, "Geen toegang");
    }
    let mut state = state.lock().unwrap();
    if state.fail_client_create {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Database niet beschikbaar");
    }
    insert_client(&mut state, &mut body);
    ok(body)
}

async fn get_client(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if role_of(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Niet ingelogd");
    }
    match state.lock().unwrap().clients.get(&id) {
        Some(client) => ok(client.clone()),
        None => error(StatusCode::NOT_FOUND, "Cliënt niet gevonden"),
    }
}

async fn update_client(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(changes): Json<Value>,
) -> Response {
    if role_of(&headers) != Some("admin") {
        return error(StatusCode::FORBIDDEN, "Geen toegang");
    }
    let mut state = state.lock().unwrap();
    let Some(client) = state.clients.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Cliënt niet gevonden");
    };
    if let (Some(target), Some(changes)) = (client.as_object_mut(), changes.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
    ok(client.clone())
}

async fn delete_client(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if role_of(&headers) != Some("admin") {
        return error(StatusCode::FORBIDDEN, "Geen toegang");
    }
    let mut state = state.lock().unwrap();
    if state.clients.remove(&id).is_none() {
        return error(StatusCode::NOT_FOUND, "Cliënt niet gevonden");
    }
    state.deleted.push(id);
    Json(json!({ "success": true })).into_response()
}

async fn list_therapists(headers: HeaderMap) -> Response {
    if role_of(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Niet ingelogd");
    }
    ok(json!([{ "id": 2, "firstName": "Anna", "lastName": "de Boer" }]))
}

async fn list_appointments(headers: HeaderMap) -> Response {
    if role_of(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Niet ingelogd");
    }
    ok(json!({ "items": [], "total": 0 }))
}

async fn start_import(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Response {
    if role_of(&headers) != Some("admin") || kind != "clients" {
        return error(StatusCode::FORBIDDEN, "Geen toegang");
    }

    let mut csv = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            csv = field.text().await.unwrap();
        }
    }

    let mut state = state.lock().unwrap();
    let lines: Vec<&str> = csv
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .collect();
    let stored = match state.import_outcome {
        ImportOutcome::Complete => lines.len(),
        ImportOutcome::LastRowRejected => lines.len().saturating_sub(1),
        ImportOutcome::JobFailed => lines.len().min(1),
    };
    for line in &lines[..stored] {
        let cols: Vec<&str> = line.split(',').collect();
        let mut client = json!({
            "firstName": cols.first().copied().unwrap_or_default(),
            "lastName": cols.get(1).copied().unwrap_or_default(),
            "email": cols.get(2).copied().unwrap_or_default(),
            "phone": cols.get(3).copied().unwrap_or_default(),
        });
        insert_client(&mut state, &mut client);
    }
    state.imported_rows = lines.len() as u64;
    state.progress_polls = 0;

    Json(json!({ "success": true, "importId": "imp-1", "message": "Import gestart" }))
        .into_response()
}

async fn import_progress(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    if id != "imp-1" {
        return error(StatusCode::NOT_FOUND, "Import niet gevonden");
    }
    let mut state = state.lock().unwrap();
    state.progress_polls += 1;
    let rows = state.imported_rows;

    if state.progress_polls <= state.processing_polls {
        return ok(json!({
            "importId": id,
            "totalRows": rows,
            "processedRows": 0,
            "successfulRows": 0,
            "failedRows": 0,
            "status": "processing"
        }));
    }

    let progress = match state.import_outcome {
        ImportOutcome::Complete => json!({
            "importId": id,
            "totalRows": rows,
            "processedRows": rows,
            "successfulRows": rows,
            "failedRows": 0,
            "status": "completed",
            "errors": []
        }),
        ImportOutcome::LastRowRejected => json!({
            "importId": id,
            "totalRows": rows,
            "processedRows": rows,
            "successfulRows": rows.saturating_sub(1),
            "failedRows": 1,
            "status": "completed",
            "errors": [{ "rowNumber": rows + 1, "fieldName": "email", "message": "E-mailadres is al in gebruik" }]
        }),
        ImportOutcome::JobFailed => json!({
            "importId": id,
            "totalRows": rows,
            "processedRows": 1,
            "successfulRows": 1,
            "failedRows": 0,
            "status": "failed",
            "errors": []
        }),
    };
    ok(progress)
}

fn insert_client(state: &mut MockState, client: &mut Value) -> u64 {
    state.next_id += 1;
    let id = state.next_id;
    client["id"] = json!(id);
    state.clients.insert(id, client.clone());
    id
}
