//! Gateway tests against a stub backend
//!
//! The stub is an axum router bound to an ephemeral port, exercised through
//! the real reqwest client.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use medipedia_api::{ApiClientConfig, ApiClients};
use medipedia_core::{
    AccountGateway, AuthAction, Credentials, DocumentRepository, FailureReason, QueryGateway,
    RequestOutcome, RetryConfig, UploadFile,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// Requests observed by the stub, as `"METHOD detail"` lines
#[derive(Clone, Default)]
struct StubState {
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubState {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

async fn query_handler(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    let query = body["query"].as_str().unwrap_or_default().to_string();
    state.record(format!("POST /query {} {}", body["user_id"], query));

    match query.as_str() {
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"response": "too late"})).into_response()
        }
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response(),
        "html" => "<html>not json</html>".into_response(),
        "alias" => Json(json!({"answer": "x", "sources": ["s1"]})).into_response(),
        _ => Json(json!({
            "response": format!("About {}", query),
            "references": ["guidelines.pdf"],
            "confidence": 0.92
        }))
        .into_response(),
    }
}

async fn list_documents(State(state): State<StubState>) -> Json<Value> {
    state.record("GET /documents");
    Json(json!([
        {
            "name": "cardiology-guidelines.pdf",
            "size": 2048,
            "uploaded_at": "2024-03-01T10:15:00",
            "category": "cardiology"
        },
        {"name": "notes.txt"}
    ]))
}

/// Listing from an older backend that writes `null` and floats
async fn list_legacy_documents() -> Json<Value> {
    Json(json!([
        {"name": "ok.pdf", "size": 10, "uploaded_at": "2024-03-01T10:15:00", "category": "clinical"},
        {"name": "legacy.pdf", "size": null, "uploaded_at": null, "category": null},
        {"name": "scan.pdf", "size": 2048.0, "category": ""}
    ]))
}

async fn upload_document(State(state): State<StubState>, mut multipart: Multipart) -> Json<Value> {
    let mut file_name = String::new();
    let mut category = String::new();
    let mut size = 0;

    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
            }
            "category" => category = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }

    state.record(format!("POST /upload {} {} {}", file_name, category, size));
    Json(json!({"message": format!("Stored {}", file_name)}))
}

async fn delete_document(State(state): State<StubState>, Path(name): Path<String>) -> Response {
    state.record(format!("DELETE /documents/{}", name));
    if name == "missing.pdf" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found"}))).into_response();
    }
    Json(json!({})).into_response()
}

async fn signup(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    state.record(format!("POST /signup {}", email));
    if email == "taken@uol.edu.pk" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Email already registered"})),
        )
            .into_response();
    }
    Json(json!({"message": "User created", "user_id": 7})).into_response()
}

async fn signin(Json(body): Json<Value>) -> Response {
    if body["password"] == "correct-horse" {
        Json(json!({"user_id": "u-123"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid credentials"})),
        )
            .into_response()
    }
}

async fn spawn_backend() -> (String, StubState) {
    let state = StubState::default();
    let app = Router::new()
        .route("/query", post(query_handler))
        .route("/documents", get(list_documents))
        .route("/documents/{name}", delete(delete_document))
        .route("/legacy/documents", get(list_legacy_documents))
        .route("/upload", post(upload_document))
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

/// Base URL of a port nothing listens on
async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn clients(base_url: &str) -> ApiClients {
    ApiClients::new(ApiClientConfig::new(base_url)).unwrap()
}

#[tokio::test]
async fn query_is_answered_and_normalized() {
    let (base_url, state) = spawn_backend().await;
    let clients = clients(&base_url);

    let outcome = clients.queries.send("a@b.com", "hypertension").await;
    let response = outcome.ok().unwrap();
    assert_eq!(response.response, "About hypertension");
    assert_eq!(response.references, vec!["guidelines.pdf"]);
    assert!((response.confidence - 0.92).abs() < f64::EPSILON);

    assert_eq!(state.calls(), vec![r#"POST /query "a@b.com" hypertension"#]);
}

#[tokio::test]
async fn query_aliases_are_normalized() {
    let (base_url, _state) = spawn_backend().await;
    let response = clients(&base_url)
        .queries
        .send("anonymous", "alias")
        .await
        .ok()
        .unwrap();

    assert_eq!(response.response, "x");
    assert_eq!(response.references, vec!["s1"]);
    assert_eq!(response.confidence, 0.8);
}

#[tokio::test]
async fn slow_query_times_out_within_budget() {
    let (base_url, _state) = spawn_backend().await;
    let clients = ApiClients::new(ApiClientConfig::new(&base_url).with_timeout_ms(200)).unwrap();

    let started = Instant::now();
    let outcome = clients.queries.send("a@b.com", "slow").await;

    assert!(started.elapsed() < Duration::from_secs(2));
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.reason, FailureReason::Timeout);
    assert_eq!(
        failure.message,
        "Failed to get response from the server. Please check if the API is running."
    );
}

#[tokio::test]
async fn query_server_error_keeps_status_and_body() {
    let (base_url, _state) = spawn_backend().await;
    let outcome = clients(&base_url).queries.send("a@b.com", "broken").await;

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.reason, FailureReason::HttpStatus(500));
    assert_eq!(failure.detail.as_deref(), Some("model crashed"));
}

#[tokio::test]
async fn non_json_answer_is_a_parse_error() {
    let (base_url, _state) = spawn_backend().await;
    let outcome = clients(&base_url).queries.send("a@b.com", "html").await;
    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::ParseError)
    );
}

#[tokio::test]
async fn blank_query_never_reaches_the_backend() {
    let (base_url, state) = spawn_backend().await;
    let outcome = clients(&base_url).queries.send("a@b.com", "   ").await;

    assert_eq!(
        outcome.failure().map(|f| f.reason),
        Some(FailureReason::InvalidRequest)
    );
    assert!(state.calls().is_empty());
}

#[tokio::test]
async fn http_status_is_not_retried() {
    let (base_url, state) = spawn_backend().await;
    let config =
        ApiClientConfig::new(&base_url).with_retry(RetryConfig::none().with_max_attempts(3));
    let clients = ApiClients::new(config).unwrap();

    let outcome = clients.queries.send("a@b.com", "broken").await;
    assert!(outcome.is_failed());
    assert_eq!(state.calls().len(), 1);
}

#[tokio::test]
async fn documents_are_listed_with_defaults() {
    let (base_url, _state) = spawn_backend().await;
    let documents = clients(&base_url).documents.list().await.ok().unwrap();

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].name, "cardiology-guidelines.pdf");
    assert_eq!(documents[0].size, 2048);
    assert!(documents[0].uploaded_at.is_some());
    assert_eq!(documents[1].size, 0);
    assert_eq!(documents[1].uploaded_at, None);
    assert_eq!(documents[1].category, "general");
}

#[tokio::test]
async fn null_and_float_fields_do_not_empty_the_listing() {
    let (base_url, _state) = spawn_backend().await;
    let documents = clients(&format!("{}/legacy", base_url))
        .documents
        .try_list()
        .await
        .ok()
        .unwrap();

    assert_eq!(documents.len(), 3);
    assert_eq!(documents[1].name, "legacy.pdf");
    assert_eq!(documents[1].size, 0);
    assert_eq!(documents[1].uploaded_at, None);
    assert_eq!(documents[1].category, "general");
    assert_eq!(documents[2].size, 2048);
    assert_eq!(documents[2].category, "general");
}

#[tokio::test]
async fn unreachable_backend_lists_no_documents() {
    let clients = clients(&unreachable_base_url().await);

    let documents = clients.documents.list().await;
    assert_eq!(documents, RequestOutcome::Ok(Vec::new()));

    let failure = clients.documents.try_list().await;
    assert_eq!(
        failure.failure().map(|f| f.reason),
        Some(FailureReason::NetworkError)
    );
}

#[tokio::test]
async fn upload_sends_file_and_category() {
    let (base_url, state) = spawn_backend().await;
    let outcome = clients(&base_url)
        .documents
        .upload(
            UploadFile::new("stroke-protocol.pdf", b"%PDF-1.4 body".to_vec()),
            "neurology",
        )
        .await;

    assert_eq!(outcome.ok().unwrap().message, "Stored stroke-protocol.pdf");
    assert_eq!(
        state.calls(),
        vec!["POST /upload stroke-protocol.pdf neurology 13"]
    );
}

#[tokio::test]
async fn upload_failure_uses_fixed_message() {
    let outcome = clients(&unreachable_base_url().await)
        .documents
        .upload(UploadFile::new("a.pdf", vec![1, 2, 3]), "general")
        .await;

    assert_eq!(
        outcome.failure().map(|f| f.message.as_str()),
        Some("Failed to upload document. Please try again.")
    );
}

#[tokio::test]
async fn delete_encodes_the_document_name() {
    let (base_url, state) = spawn_backend().await;
    let outcome = clients(&base_url)
        .documents
        .delete("Heart Failure (2024).pdf")
        .await;

    assert_eq!(outcome.ok().unwrap().message, "Document deleted successfully!");
    assert_eq!(
        state.calls(),
        vec!["DELETE /documents/Heart Failure (2024).pdf"]
    );
}

#[tokio::test]
async fn delete_of_missing_document_fails_with_fixed_message() {
    let (base_url, _state) = spawn_backend().await;
    let outcome = clients(&base_url).documents.delete("missing.pdf").await;

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.reason, FailureReason::HttpStatus(404));
    assert_eq!(
        failure.message,
        "Failed to delete document. Please try again."
    );
}

#[tokio::test]
async fn signup_surfaces_backend_detail() {
    let (base_url, _state) = spawn_backend().await;
    let clients = clients(&base_url);

    let created = clients
        .accounts
        .signup(&Credentials::new("new@uol.edu.pk", "secret123"))
        .await;
    assert_eq!(created.ok().unwrap().message, "User created");

    let taken = clients
        .accounts
        .signup(&Credentials::new("taken@uol.edu.pk", "secret123"))
        .await;
    assert_eq!(
        taken.failure().map(|f| f.message.as_str()),
        Some("Email already registered")
    );
}

#[tokio::test]
async fn signup_transport_failure_is_a_network_error() {
    let outcome = clients(&unreachable_base_url().await)
        .accounts
        .signup(&Credentials::new("new@uol.edu.pk", "secret123"))
        .await;

    assert_eq!(
        outcome.failure().map(|f| f.message.as_str()),
        Some("Network error while adding user")
    );
}

#[tokio::test]
async fn signin_returns_backend_account_id() {
    let (base_url, _state) = spawn_backend().await;
    let clients = clients(&base_url);

    let record = clients
        .accounts
        .authenticate(
            &Credentials::new("doc@uol.edu.pk", "correct-horse"),
            AuthAction::SignIn,
        )
        .await;
    assert_eq!(record.ok().unwrap().id.as_deref(), Some("u-123"));

    let rejected = clients
        .accounts
        .authenticate(
            &Credentials::new("doc@uol.edu.pk", "wrong"),
            AuthAction::SignIn,
        )
        .await;
    assert_eq!(
        rejected.failure().map(|f| f.reason),
        Some(FailureReason::HttpStatus(401))
    );
}
