//! Identity provider client (Supabase GoTrue-compatible)
//!
//! Endpoints used:
//! - `POST /auth/v1/token?grant_type=password` (sign in)
//! - `POST /auth/v1/token?grant_type=refresh_token` (refresh)
//! - `POST /auth/v1/signup`
//! - `POST /auth/v1/logout`
//!
//! Every request carries the project's public `apikey`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rsd_common::types::{Session, User};
use rsd_common::{AuthError, DashboardConfig, Error};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Shortest password accepted for sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// Access token lifetime assumed when the provider omits it
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Result of a sign-up request
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account created and signed in immediately
    SignedIn(Session),
    /// Account created; the user must confirm their email first
    ConfirmationPending,
}

/// Email/password identity operations
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError>;
}

/// Reject passwords the provider would refuse, before any request
pub fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| {
                Utc::now() + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
            });

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Map an error response to the matching [`AuthError`]
fn classify_error(status: u16, body: &str) -> AuthError {
    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let code = value
        .get("error_code")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let message = ["msg", "error_description", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());
    let lower = message.to_lowercase();

    if code == "user_already_exists" || lower.contains("already registered") {
        AuthError::AlreadyRegistered
    } else if code == "invalid_credentials"
        || code == "invalid_grant"
        || lower.contains("invalid login credentials")
    {
        AuthError::InvalidCredentials
    } else {
        AuthError::Provider { status, message }
    }
}

/// reqwest client for a Supabase project
pub struct SupabaseIdentity {
    http_client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseIdentity {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("rsd-ui/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    /// Build from the `[identity]` config section (both keys required)
    pub fn from_config(config: &DashboardConfig) -> Result<Self, Error> {
        let (url, key) = config.identity.require()?;
        Self::new(url, key)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn request(&self, url: String, bearer: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, String), AuthError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let request = self
            .request(self.auth_url("/token"), &self.anon_key)
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let (status, body) = self.send(request).await?;

        if !(200..300).contains(&status) {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str::<TokenResponse>(&body)
            .map(TokenResponse::into_session)
            .map_err(|e| AuthError::Provider {
                status,
                message: format!("Unexpected token response: {}", e),
            })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        debug!(user_id = %session.user.id, "Password sign-in accepted");
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError> {
        check_password(password)?;

        let mut request = self
            .request(self.auth_url("/signup"), &self.anon_key)
            .json(&json!({ "email": email, "password": password }));
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }

        let (status, body) = self.send(request).await?;
        if !(200..300).contains(&status) {
            return Err(classify_error(status, &body));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| AuthError::Provider {
            status,
            message: format!("Unexpected sign-up response: {}", e),
        })?;

        if value.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(value)
                .map(TokenResponse::into_session)
                .map_err(|e| AuthError::Provider {
                    status,
                    message: format!("Unexpected sign-up response: {}", e),
                })?;
            debug!(user_id = %session.user.id, "Sign-up returned a session");
            return Ok(SignUpOutcome::SignedIn(session));
        }

        // With email confirmation on, an existing address comes back as a
        // user object with no identities instead of an error
        let user = value.get("user").unwrap_or(&value);
        if user
            .get("identities")
            .and_then(Value::as_array)
            .is_some_and(|ids| ids.is_empty())
        {
            return Err(AuthError::AlreadyRegistered);
        }

        info!("User signed up, email confirmation pending");
        Ok(SignUpOutcome::ConfirmationPending)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let request = self.request(self.auth_url("/logout"), &session.access_token);
        let (status, body) = self.send(request).await?;

        // An already-invalid token means the provider side is signed out too
        if (200..300).contains(&status) || status == 401 || status == 403 {
            debug!(user_id = %session.user.id, status, "Provider sign-out complete");
            Ok(())
        } else {
            warn!(user_id = %session.user.id, status, "Provider sign-out failed");
            Err(classify_error(status, &body))
        }
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        match self
            .token_grant(
                "refresh_token",
                json!({ "refresh_token": session.refresh_token }),
            )
            .await
        {
            Ok(refreshed) => Ok(refreshed),
            Err(AuthError::InvalidCredentials) | Err(AuthError::Provider { status: 400..=499, .. }) => {
                Err(AuthError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }
}
