//! Integration tests for rsd-ui HTTP routes
//!
//! Tests cover:
//! - Health endpoint (no session required)
//! - Session protection: HTML routes redirect, JSON routes answer 401
//! - Sign-in, sign-up and sign-out flows
//! - Dashboard form submissions and rendering
//! - JSON analysis endpoints and history
//! - CSV export

mod helpers;

use axum::http::{header, StatusCode};
use helpers::*;
use rsd_common::{DashboardConfig, ModelId};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

// =============================================================================
// Health and session protection
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_session_required() {
    let app = test_app().await;

    let response = app.send(get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "rsd-ui");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_dashboard_redirects_to_login_without_session() {
    let app = test_app().await;

    let response = app.send(get("/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_value(&response, header::LOCATION), "/login");

    // Unknown session ids are treated the same
    let response = app
        .send(get("/?view=batch", Some("rsd_session=6f1c1f4e-1d0b-4c58-9a8e-3f7d5f2b9e11")))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_json_routes_answer_401_without_session() {
    let app = test_app().await;

    let response = app
        .send(post_json(
            "/api/predict",
            None,
            json!({"text": "rico", "model": "bert", "product_name": "Té Verde"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let response = app.send(get("/api/history", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.predictor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stylesheet_is_public() {
    let app = test_app().await;
    let response = app.send(get("/static/rsd.css", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "text/css");
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = test_app().await;

    let response = app
        .send(post_form(
            "/login",
            None,
            &[("email", "ana@example.com"), ("password", VALID_PASSWORD)],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_value(&response, header::LOCATION), "/");

    let cookie = header_value(&response, header::SET_COOKIE).to_string();
    assert!(cookie.starts_with("rsd_session="));
    assert!(cookie.contains("HttpOnly"));

    let session_cookie = cookie.split(';').next().unwrap();
    let response = app.send(get("/", Some(session_cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("ana@example.com"));
}

#[tokio::test]
async fn test_login_with_wrong_password_shows_error() {
    let app = test_app().await;

    let response = app
        .send(post_form(
            "/login",
            None,
            &[("email", "ana@example.com"), ("password", "incorrecta")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(header_value(&response, header::SET_COOKIE).is_empty());
    assert!(body_string(response).await.contains("Correo o contraseña incorrectos"));
}

#[tokio::test]
async fn test_signup_duplicate_email_message() {
    let app = test_app().await;

    let response = app
        .send(post_form(
            "/signup",
            None,
            &[("email", REGISTERED_EMAIL), ("password", "secreto123")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_string(response).await;
    assert!(html.contains("Este correo ya está registrado. Intenta iniciar sesión."));
    assert!(html.contains(r#"action="/signup""#));
}

#[tokio::test]
async fn test_signup_short_password_makes_no_provider_call() {
    let app = test_app().await;

    let response = app
        .send(post_form(
            "/signup",
            None,
            &[("email", "nuevo@example.com"), ("password", "12345")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("al menos 6 caracteres"));
    assert_eq!(app.identity.sign_up_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_signup_pending_confirmation_shows_notice() {
    let app = test_app_with(
        DashboardConfig::default(),
        FakePredictor::default(),
        FakeIdentity {
            confirm_email: true,
            ..FakeIdentity::default()
        },
        None,
    )
    .await;

    let response = app
        .send(post_form(
            "/signup",
            None,
            &[("email", "nuevo@example.com"), ("password", "secreto123")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_value(&response, header::SET_COOKIE).is_empty());
    assert!(body_string(response).await.contains("Revisa tu correo"));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    let response = app.send(post_form("/logout", Some(&cookie), &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_value(&response, header::LOCATION), "/login");
    assert!(header_value(&response, header::SET_COOKIE).contains("Max-Age=0"));

    let response = app.send(get("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

// =============================================================================
// Dashboard forms
// =============================================================================

#[tokio::test]
async fn test_predict_form_shows_result_and_history() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    let response = app
        .send(post_form(
            "/predict",
            Some(&cookie),
            &[
                ("product", "Granola de Frutos Secos"),
                ("model", "lstm"),
                ("review", "Muy malo, llegó rancio"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_value(&response, header::LOCATION), "/?view=simple");

    let html = body_string(app.send(get("/?view=simple", Some(&cookie))).await).await;
    assert!(html.contains("Muy malo - Usuario muy insatisfecho"));
    assert!(html.contains("Granola de Frutos Se..."));
    assert!(html.contains("<td>LSTM</td>"));
}

#[tokio::test]
async fn test_predict_form_blank_review_shows_error() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    app.send(post_form(
        "/predict",
        Some(&cookie),
        &[("product", "Té Verde"), ("model", "bert"), ("review", "   ")],
    ))
    .await;

    let html = body_string(app.send(get("/", Some(&cookie))).await).await;
    assert!(html.contains("El texto no puede estar vacío"));
    assert_eq!(app.predictor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_compare_form_drops_failing_model() {
    let app = test_app_with(
        DashboardConfig::default(),
        FakePredictor::failing(&[ModelId::Lstm]),
        FakeIdentity::default(),
        None,
    )
    .await;
    let cookie = app.sign_in().await;

    let response = app
        .send(post_form(
            "/compare",
            Some(&cookie),
            &[("product", "Café Premium"), ("review", "Excelente aroma")],
        ))
        .await;
    assert_eq!(header_value(&response, header::LOCATION), "/?view=compare");

    let html = body_string(app.send(get("/?view=compare", Some(&cookie))).await).await;
    assert!(html.contains("Regresión Logística"));
    assert!(html.contains("<td>BERT"));
    assert!(!html.contains("<td>LSTM"));
    assert_eq!(html.matches("Mejor").count(), 1);
}

#[tokio::test]
async fn test_compare_form_reports_when_no_model_answers() {
    let app = test_app_with(
        DashboardConfig::default(),
        FakePredictor::failing(&ModelId::ALL),
        FakeIdentity::default(),
        None,
    )
    .await;
    let cookie = app.sign_in().await;

    app.send(post_form(
        "/compare",
        Some(&cookie),
        &[("product", "Café Premium"), ("review", "Excelente aroma")],
    ))
    .await;
    let html = body_string(app.send(get("/?view=compare", Some(&cookie))).await).await;
    assert!(html.contains("Ningún modelo pudo analizar la reseña"));
    assert!(!html.contains("Mejor"));

    // A later blank submission replaces the message
    app.send(post_form(
        "/compare",
        Some(&cookie),
        &[("product", "Café Premium"), ("review", "  ")],
    ))
    .await;
    let html = body_string(app.send(get("/?view=compare", Some(&cookie))).await).await;
    assert!(html.contains("El texto no puede estar vacío"));
    assert!(!html.contains("Ningún modelo"));
}

#[tokio::test]
async fn test_batch_form_empty_input_shows_error() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    app.send(post_form(
        "/batch",
        Some(&cookie),
        &[("product", "Miel Orgánica"), ("model", "logreg"), ("reviews", " \n \n")],
    ))
    .await;

    let html = body_string(app.send(get("/?view=batch", Some(&cookie))).await).await;
    assert!(html.contains("Debe proporcionar al menos una reseña"));
    assert_eq!(app.predictor.calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// JSON API
// =============================================================================

#[tokio::test]
async fn test_api_predict_survives_history_failure() {
    let app = test_app_with(
        DashboardConfig::default(),
        FakePredictor::default(),
        FakeIdentity::default(),
        Some(Arc::new(FailingHistory)),
    )
    .await;
    let cookie = app.sign_in().await;

    let response = app
        .send(post_json(
            "/api/predict",
            Some(&cookie),
            json!({"text": "Me encantó", "model": "bert", "product_name": "Té Verde"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["score"], 5);
    assert_eq!(body["sentiment"], "Positivo");
    assert_eq!(body["model"], "bert");

    let response = app.send(get("/api/history", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_api_history_newest_first() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    for text in ["primera", "segunda", "tercera"] {
        let response = app
            .send(post_json(
                "/api/predict",
                Some(&cookie),
                json!({"text": text, "model": "logreg", "product_name": "Miel Orgánica"}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let body = body_json(app.send(get("/api/history", Some(&cookie))).await).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["review_text"], "tercera");
    assert_eq!(rows[2]["review_text"], "primera");
    assert_eq!(rows[0]["user_id"], "user-ana");
}

#[tokio::test]
async fn test_api_compare_keeps_model_order() {
    let app = test_app_with(
        DashboardConfig::default(),
        FakePredictor::failing(&[ModelId::Lstm]),
        FakeIdentity::default(),
        None,
    )
    .await;
    let cookie = app.sign_in().await;

    let body = body_json(
        app.send(post_json(
            "/api/compare",
            Some(&cookie),
            json!({"text": "Okay", "product_name": "Galletas Integrales"}),
        ))
        .await,
    )
    .await;

    let models: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["model"].as_str().unwrap())
        .collect();
    assert_eq!(models, vec!["logreg", "bert"]);
    assert_eq!(body[0]["score"], 3);
}

#[tokio::test]
async fn test_api_batch_example_and_statistics() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    let response = app
        .send(post_json(
            "/api/batch",
            Some(&cookie),
            json!({
                "reviews": "Great product\n\nTerrible\n   \nOkay",
                "model": "logreg",
                "product_name": "Café Premium"
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_reviews"], 3);
    assert_eq!(body["items"][0]["text"], "Great product");
    assert_eq!(body["items"][1]["index"], 2);
    assert_eq!(body["items"][2]["text"], "Okay");
    assert_eq!(body["statistics"]["average_score"], 3.0);
    assert_eq!(body["statistics"]["sentiment_distribution"]["Negativo"], 1);
    assert_eq!(body["statistics"]["score_distribution"]["5"], 1);
}

#[tokio::test]
async fn test_api_batch_empty_input_is_400() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    let response = app
        .send(post_json(
            "/api/batch",
            Some(&cookie),
            json!({"reviews": "", "model": "bert", "product_name": "Té Verde"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "EMPTY_INPUT");
    assert_eq!(app.predictor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_api_batch_transport_failure_is_502() {
    let app = test_app_with(
        DashboardConfig::default(),
        FakePredictor::failing(&[ModelId::Bert]),
        FakeIdentity::default(),
        None,
    )
    .await;
    let cookie = app.sign_in().await;

    let response = app
        .send(post_json(
            "/api/batch",
            Some(&cookie),
            json!({"reviews": "uno\ndos", "model": "bert", "product_name": "Té Verde"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "BATCH_ANALYSIS_FAILED"
    );
}

#[tokio::test]
async fn test_api_predictor_health() {
    let app = test_app_with(
        DashboardConfig::default(),
        FakePredictor::failing(&[ModelId::Bert]),
        FakeIdentity::default(),
        None,
    )
    .await;
    let cookie = app.sign_in().await;

    let body = body_json(app.send(get("/api/predictor/health", Some(&cookie))).await).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["models"]["logreg"], true);
    assert_eq!(body["models"]["bert"], false);
}

// =============================================================================
// CSV export
// =============================================================================

#[tokio::test]
async fn test_export_without_batch_is_404() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    let response = app.send(get("/batch/export.csv", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_csv_download() {
    let app = test_app().await;
    let cookie = app.sign_in().await;

    let reviews = "Good, \"great\" buy\nTerrible, nunca más\nOkay";
    let response = app
        .send(post_form(
            "/batch",
            Some(&cookie),
            &[("product", "Té Verde"), ("model", "bert"), ("reviews", reviews)],
        ))
        .await;
    assert_eq!(header_value(&response, header::LOCATION), "/?view=batch");

    let response = app.send(get("/batch/export.csv", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_TYPE),
        "text/csv; charset=utf-8"
    );
    let disposition = header_value(&response, header::CONTENT_DISPOSITION).to_string();
    assert!(disposition.starts_with("attachment; filename=\"analisis_T_ Verde_"));
    assert!(disposition.contains("filename*=UTF-8''analisis_T%C3%A9%20Verde_"));
    assert!(disposition.ends_with(".csv"));

    let body = body_string(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines,
        vec![
            "#,Reseña,Puntuación,Sentimiento",
            "1,\"Good, \"\"great\"\" buy\",5,Positivo",
            "2,\"Terrible, nunca más\",1,Negativo",
            "3,\"Okay\",3,Neutro",
        ]
    );
    assert!(!body.ends_with('\n'));
}
