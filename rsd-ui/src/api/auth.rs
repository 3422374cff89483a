//! Session cookie middleware and sign-in / sign-up / sign-out handlers

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use rsd_common::types::Session;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::render::{render_login, AuthMode, LoginView};
use crate::session::{SignUpStatus, SESSION_COOKIE};
use crate::AppState;

/// Signed-in session attached to protected requests by the middleware
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: Uuid,
    pub session: Session,
}

impl CurrentSession {
    pub fn email(&self) -> &str {
        self.session.user.email.as_deref().unwrap_or_default()
    }
}

/// Session id from the `Cookie` header(s), if well-formed
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

fn cleared_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}

async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Option<CurrentSession> {
    let id = session_id_from_headers(headers)?;
    let session = state.sessions.get_session(id).await?;
    Some(CurrentSession { id, session })
}

/// Protected HTML routes: no valid session redirects to `/login`
pub async fn require_page_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_session(&state, request.headers()).await {
        Some(current) => {
            request.extensions_mut().insert(current);
            next.run(request).await
        }
        None => {
            debug!(path = %request.uri().path(), "No session, redirecting to login");
            (
                [(header::SET_COOKIE, cleared_cookie())],
                Redirect::to("/login"),
            )
                .into_response()
        }
    }
}

/// Protected JSON routes: no valid session answers 401
pub async fn require_api_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current = resolve_session(&state, request.headers())
        .await
        .ok_or_else(|| ApiError::Unauthorized("Sesión no válida o expirada".to_string()))?;
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

fn login_response(status: StatusCode, view: LoginView<'_>) -> Response {
    (status, Html(render_login(&view))).into_response()
}

fn signed_in_redirect(id: Uuid) -> Response {
    (
        [(header::SET_COOKIE, session_cookie(id))],
        Redirect::to("/"),
    )
        .into_response()
}

/// GET /login
pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    if resolve_session(&state, &headers).await.is_some() {
        return Redirect::to("/").into_response();
    }

    login_response(
        StatusCode::OK,
        LoginView {
            mode: AuthMode::from_query(query.mode.as_deref()),
            email: "",
            error: None,
            notice: None,
        },
    )
}

/// POST /login
pub async fn login(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    let email = form.email.trim();
    match state.sessions.sign_in(email, &form.password).await {
        Ok(id) => signed_in_redirect(id),
        Err(e) => {
            info!(error = %e, "Sign-in rejected");
            let message = e.user_message();
            login_response(
                StatusCode::UNAUTHORIZED,
                LoginView {
                    mode: AuthMode::SignIn,
                    email,
                    error: Some(&message),
                    notice: None,
                },
            )
        }
    }
}

/// Where the provider's confirmation email should send the user back to
fn confirmation_redirect(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(header::HOST)?.to_str().ok()?;
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    Some(format!("{}://{}/login", scheme, host))
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let email = form.email.trim();
    let redirect_to = confirmation_redirect(&headers);

    match state
        .sessions
        .sign_up(email, &form.password, redirect_to.as_deref())
        .await
    {
        Ok(SignUpStatus::SignedIn(id)) => signed_in_redirect(id),
        Ok(SignUpStatus::ConfirmationPending) => login_response(
            StatusCode::OK,
            LoginView {
                mode: AuthMode::SignIn,
                email,
                error: None,
                notice: Some("Cuenta creada. Revisa tu correo para confirmar tu cuenta."),
            },
        ),
        Err(e) => {
            info!(error = %e, "Sign-up rejected");
            let message = e.user_message();
            login_response(
                StatusCode::BAD_REQUEST,
                LoginView {
                    mode: AuthMode::SignUp,
                    email,
                    error: Some(&message),
                    notice: None,
                },
            )
        }
    }
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Response {
    state.sessions.sign_out(current.id).await;
    (
        [(header::SET_COOKIE, cleared_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}
