//! Shared fakes and request helpers for rsd-ui integration tests
//!
//! - `FakeIdentity`: accepts one password, knows one registered address
//! - `FakePredictor`: keyword-scored predictions, optional failing models
//! - `FailingHistory`: history store whose writes always fail
//! - `test_app*`: router + state wired with the fakes and in-memory SQLite

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use rsd_common::types::{
    HistoryRecord, NewHistoryEntry, PredictionRequest, PredictionResult, Session, User,
};
use rsd_common::{AuthError, DashboardConfig, Error, ModelId, Result, Score, Sentiment};
use rsd_ui::db::{init_in_memory_database, SqliteHistoryStore};
use rsd_ui::services::{
    BatchPredictionResponse, BatchResponseItem, HistoryStore, IdentityProvider, PredictionBackend,
    PredictorHealth, SignUpOutcome,
};
use rsd_ui::session::SESSION_COOKIE;
use rsd_ui::{build_router, AppState};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const VALID_PASSWORD: &str = "secreto";
pub const REGISTERED_EMAIL: &str = "ya@existe.com";

pub fn test_session(user_id: &str, email: &str) -> Session {
    Session {
        access_token: format!("token-{}", user_id),
        refresh_token: format!("refresh-{}", user_id),
        expires_at: Utc::now() + Duration::hours(1),
        user: User {
            id: user_id.to_string(),
            email: Some(email.to_string()),
        },
    }
}

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
pub struct FakeIdentity {
    pub sign_up_calls: AtomicUsize,
    pub confirm_email: bool,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> std::result::Result<Session, AuthError> {
        if password == VALID_PASSWORD {
            Ok(test_session("user-ana", email))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _redirect_to: Option<&str>,
    ) -> std::result::Result<SignUpOutcome, AuthError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        if email == REGISTERED_EMAIL {
            Err(AuthError::AlreadyRegistered)
        } else if self.confirm_email {
            Ok(SignUpOutcome::ConfirmationPending)
        } else {
            Ok(SignUpOutcome::SignedIn(test_session("user-new", email)))
        }
    }

    async fn sign_out(&self, _session: &Session) -> std::result::Result<(), AuthError> {
        Ok(())
    }

    async fn refresh(&self, session: &Session) -> std::result::Result<Session, AuthError> {
        Ok(test_session(&session.user.id, session.user.email.as_deref().unwrap_or_default()))
    }
}

/// 1 for "terrible"/"malo", 3 for "okay"/"normal", 5 otherwise
pub fn keyword_score(text: &str) -> Score {
    let lower = text.to_lowercase();
    let value = if lower.contains("terrible") || lower.contains("malo") {
        1
    } else if lower.contains("okay") || lower.contains("normal") {
        3
    } else {
        5
    };
    Score::new(value).unwrap()
}

#[derive(Default)]
pub struct FakePredictor {
    pub failing_models: Vec<ModelId>,
    pub calls: AtomicUsize,
}

impl FakePredictor {
    pub fn failing(models: &[ModelId]) -> Self {
        Self {
            failing_models: models.to_vec(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PredictionBackend for FakePredictor {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_models.contains(&request.model) {
            return Err(Error::Service {
                status: 500,
                message: "model not loaded".to_string(),
            });
        }
        let score = keyword_score(&request.text);
        Ok(PredictionResult {
            score,
            sentiment: Sentiment::for_score(score),
            model: request.model,
            product_name: request.product_name.clone(),
            probs: None,
        })
    }

    async fn predict_batch(
        &self,
        reviews: &[String],
        model: ModelId,
        product_name: &str,
    ) -> Result<BatchPredictionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_models.contains(&model) {
            return Err(Error::Network("connection reset".to_string()));
        }
        let results = reviews
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let score = keyword_score(text);
                BatchResponseItem {
                    index: i + 1,
                    text: text.clone(),
                    score,
                    sentiment: Sentiment::for_score(score),
                    probs: None,
                }
            })
            .collect::<Vec<_>>();
        Ok(BatchPredictionResponse {
            total_reviews: Some(results.len()),
            results,
            statistics: None,
            model: Some(model.to_string()),
            product_name: Some(product_name.to_string()),
        })
    }

    async fn health(&self) -> Result<PredictorHealth> {
        let models: BTreeMap<String, bool> = ModelId::ALL
            .iter()
            .map(|m| (m.to_string(), !self.failing_models.contains(m)))
            .collect();
        Ok(PredictorHealth {
            status: "ok".to_string(),
            models,
        })
    }
}

pub struct FailingHistory;

#[async_trait]
impl HistoryStore for FailingHistory {
    async fn insert(&self, _session: &Session, _entry: &NewHistoryEntry) -> Result<()> {
        Err(Error::History("HTTP 403: permission denied".to_string()))
    }

    async fn recent(&self, _session: &Session, _limit: usize) -> Result<Vec<HistoryRecord>> {
        Err(Error::History("HTTP 403: permission denied".to_string()))
    }
}

// ============================================================================
// App construction
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub identity: Arc<FakeIdentity>,
    pub predictor: Arc<FakePredictor>,
}

impl TestApp {
    /// Register a session directly and return its `Cookie` header value
    pub async fn sign_in(&self) -> String {
        let id = self
            .state
            .sessions
            .insert(test_session("user-ana", "ana@example.com"))
            .await;
        format!("{}={}", SESSION_COOKIE, id)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::util::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(
        DashboardConfig::default(),
        FakePredictor::default(),
        FakeIdentity::default(),
        None,
    )
    .await
}

/// `history: None` uses a fresh in-memory SQLite store
pub async fn test_app_with(
    config: DashboardConfig,
    predictor: FakePredictor,
    identity: FakeIdentity,
    history: Option<Arc<dyn HistoryStore>>,
) -> TestApp {
    let history = match history {
        Some(store) => store,
        None => Arc::new(SqliteHistoryStore::new(
            init_in_memory_database().await.unwrap(),
        )),
    };
    let predictor = Arc::new(predictor);
    let identity = Arc::new(identity);

    let state = AppState::new(config, predictor.clone(), identity.clone(), history);
    TestApp {
        router: build_router(state.clone()),
        state,
        identity,
        predictor,
    }
}

// ============================================================================
// Requests and responses
// ============================================================================

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// `application/x-www-form-urlencoded` value encoding
fn form_encode(value: &str) -> String {
    let mut encoded = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).expect("JSON body")
}

pub fn header_value<'a>(response: &'a Response<Body>, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
