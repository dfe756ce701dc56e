use eventhub::{
    api::router::create_router,
    background::process_pending_jobs,
    config::Config,
    domain::models::user::{Role, User},
    domain::ports::EmailService,
    domain::services::{auth_service::hash_password, communication_service::CommunicationService},
    error::AppError,
    infra::{factory::sqlite_state, storage::local_file_storage::LocalFileStorage},
    state::AppState,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::sync::{Arc, Mutex, OnceLock};
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    Router,
};
use std::str::FromStr;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tower::ServiceExt;
use serde_json::{json, Value};

#[allow(dead_code)]
pub const PASSWORD: &str = "password123";

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub attachment_name: Option<String>,
}

#[derive(Default)]
pub struct RecordingEmailService {
    pub sent: Mutex<Vec<SentMail>>,
}

#[async_trait]
impl EmailService for RecordingEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        _attachment_data: Option<&[u8]>
    ) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            attachment_name: attachment_name.map(str::to_string),
        });
        Ok(())
    }
}

pub struct AuthHeaders {
    pub access_token: String,
    pub csrf_token: String,
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub storage_dir: String,
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingEmailService>,
}

/// Argon2 is slow in debug builds; every test user shares one hash.
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).unwrap()).clone()
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let id = Uuid::new_v4();
        let db_filename = format!("test_{}.db", id);
        let storage_dir = format!("test_storage_{}", id);
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let priv_key_pem = include_str!("../tests/keys/test_private.pem");
        let pub_key_pem = include_str!("../tests/keys/test_public.pem");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            jwt_secret_key: priv_key_pem.to_string(),
            jwt_public_key: pub_key_pem.to_string(),
            auth_issuer: "test-issuer".to_string(),
            frontend_url: "https://eventhub.test".to_string(),
            public_url: "https://api.eventhub.test".to_string(),
            storage_dir: storage_dir.clone(),
            max_upload_bytes: 1024 * 1024,
            bootstrap_staff_email: None,
            bootstrap_staff_password: None,
        };

        let mailer = Arc::new(RecordingEmailService::default());
        let storage = Arc::new(LocalFileStorage::new(&storage_dir, "https://api.eventhub.test/files"));
        let state = Arc::new(
            sqlite_state(pool.clone(), config, mailer.clone(), storage).expect("Failed to build state"),
        );

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            storage_dir,
            state,
            mailer,
        }
    }

    /// Inserts a verified, active account directly.
    pub async fn create_user(&self, email: &str, role: Role) -> User {
        let mut user = User::new(email.to_string(), format!("User {}", &email[..email.find('@').unwrap_or(email.len())]), password_hash());
        user.role = role;
        user.email_verified = true;
        self.state.user_repo.create(&user).await.expect("Failed to create user")
    }

    /// Creates an account with a unique email and logs it in.
    pub async fn user_with_role(&self, role: Role) -> (User, AuthHeaders) {
        let email = format!("{}-{}@uni.test", role.as_str().to_lowercase(), Uuid::new_v4().simple());
        let user = self.create_user(&email, role).await;
        let auth = self.login(&email, PASSWORD).await;
        (user, auth)
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthHeaders {
        let payload = json!({
            "email": email,
            "password": password
        });

        let response = self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap()
        ).await.unwrap();

        if !response.status().is_success() {
            panic!("Login failed in test helper: status {}", response.status());
        }

        let cookies: Vec<String> = response.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|h| h.to_str().unwrap().to_string())
            .collect();

        let access_token_cookie = cookies.iter()
            .find(|c| c.contains("access_token="))
            .expect("No access_token cookie returned");

        let start = access_token_cookie.find("access_token=").unwrap() + 13;
        let end = access_token_cookie[start..].find(';').unwrap_or(access_token_cookie.len() - start);
        let access_token = access_token_cookie[start..start+end].to_string();

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body_json: Value = serde_json::from_slice(&body_bytes).unwrap();
        let csrf_token = body_json["csrf_token"].as_str().expect("No csrf_token in body").to_string();

        AuthHeaders {
            access_token,
            csrf_token
        }
    }

    /// Sends a JSON request, optionally authenticated, and returns status + parsed body.
    pub async fn call(&self, method: &str, uri: &str, auth: Option<&AuthHeaders>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder
                .header(header::COOKIE, format!("access_token={}", auth.access_token))
                .header("X-CSRF-Token", &auth.csrf_token);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, parse_body(response).await)
    }

    /// Creates an event as `creator` and drives it through review to PUBLISHED.
    pub async fn published_event(&self, creator: &AuthHeaders, reviewer: &User, reviewer_auth: &AuthHeaders, capacity: i32) -> String {
        let event_id = self.draft_event(creator, capacity).await;

        let (status, _) = self.call("POST", &format!("/api/v1/events/{}/submit", event_id), Some(creator), Some(json!({ "reviewer_id": reviewer.id }))).await;
        assert_eq!(status, StatusCode::OK, "submit failed");
        let (status, _) = self.call("POST", &format!("/api/v1/events/{}/approve", event_id), Some(reviewer_auth), Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK, "approve failed");
        let (status, _) = self.call("POST", &format!("/api/v1/events/{}/publish", event_id), Some(creator), None).await;
        assert_eq!(status, StatusCode::OK, "publish failed");

        event_id
    }

    pub async fn draft_event(&self, creator: &AuthHeaders, capacity: i32) -> String {
        let start = Utc::now() + Duration::days(3);
        let payload = json!({
            "title": "Distributed Systems Colloquium",
            "description": "Consensus in practice",
            "location": "Building 5, Room 101",
            "meeting_url": "https://meet.uni.test/colloquium",
            "timezone": "Europe/Berlin",
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::hours(2)).to_rfc3339(),
            "capacity": capacity
        });
        let (status, body) = self.call("POST", "/api/v1/events", Some(creator), Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED, "event creation failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Runs one pass of the job worker.
    pub async fn run_jobs(&self) -> usize {
        let comm_service = CommunicationService::new(self.state.communication_repo.clone());
        process_pending_jobs(&self.state, &comm_service).await.expect("job pass failed")
    }

    pub fn sent_mail(&self) -> Vec<SentMail> {
        self.mailer.sent.lock().unwrap().clone()
    }
}

#[allow(dead_code)]
pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
        let _ = std::fs::remove_dir_all(&self.storage_dir);
    }
}
