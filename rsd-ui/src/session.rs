//! Browser sessions
//!
//! Each signed-in browser holds an opaque `rsd_session` cookie (a uuid) that
//! maps to the provider session plus the dashboard's per-user view state.
//! Lookups refresh provider tokens that are about to expire.
//!
//! The map lock is never held across a provider call. Token refresh is
//! single-flight per session: concurrent lookups wait for the one refresh in
//! progress instead of reusing the same refresh token. Concurrent requests on
//! one session write their dashboard results independently; the last write
//! wins.
//!
//! Sessions idle for longer than the idle window are dropped by
//! [`SessionManager::evict_idle`], which `main` runs periodically.

use crate::services::identity::check_password;
use crate::services::{IdentityProvider, SignUpOutcome};
use chrono::{DateTime, Duration, Utc};
use rsd_common::types::{BatchResult, ComparisonOutcome, PredictionResult, Session};
use rsd_common::AuthError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "rsd_session";

/// Tokens expiring within this window are refreshed on lookup
const REFRESH_MARGIN_SECS: i64 = 60;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Sessions with no request for this long are evicted
pub const DEFAULT_IDLE_TIMEOUT_MINS: i64 = 12 * 60;

/// Authentication state change notification
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
    TokenRefreshed { user_id: String },
}

/// Last results shown on the dashboard for one session
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub product_name: Option<String>,
    pub review_text: String,
    pub prediction: Option<PredictionResult>,
    pub prediction_error: Option<String>,
    pub comparison: Vec<ComparisonOutcome>,
    pub comparison_error: Option<String>,
    pub batch_text: String,
    pub batch: Option<BatchResult>,
    pub batch_error: Option<String>,
}

struct SessionEntry {
    session: Session,
    dashboard: DashboardState,
    last_seen: DateTime<Utc>,
    /// Held for the duration of a token refresh
    refresh_lock: Arc<Mutex<()>>,
}

/// Result of a sign-up through the manager
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpStatus {
    SignedIn(Uuid),
    ConfirmationPending,
}

/// In-memory session registry
#[derive(Clone)]
pub struct SessionManager {
    entries: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    identity: Arc<dyn IdentityProvider>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionManager {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            identity,
            events,
        }
    }

    /// Subscribe to sign-in, sign-out and refresh events
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Register an already-established provider session
    pub async fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        let user_id = session.user.id.clone();
        self.entries.write().await.insert(
            id,
            SessionEntry {
                session,
                dashboard: DashboardState::default(),
                last_seen: Utc::now(),
                refresh_lock: Arc::new(Mutex::new(())),
            },
        );
        self.emit(AuthEvent::SignedIn { user_id });
        id
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Uuid, AuthError> {
        let session = self.identity.sign_in_with_password(email, password).await?;
        Ok(self.insert(session).await)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpStatus, AuthError> {
        check_password(password)?;
        match self.identity.sign_up(email, password, redirect_to).await? {
            SignUpOutcome::SignedIn(session) => {
                Ok(SignUpStatus::SignedIn(self.insert(session).await))
            }
            SignUpOutcome::ConfirmationPending => Ok(SignUpStatus::ConfirmationPending),
        }
    }

    /// Drop the session locally, then tell the provider (best effort)
    pub async fn sign_out(&self, id: Uuid) {
        let removed = self.entries.write().await.remove(&id);
        let Some(entry) = removed else {
            return;
        };

        if let Err(e) = self.identity.sign_out(&entry.session).await {
            warn!(user_id = %entry.session.user.id, error = %e, "Provider sign-out failed");
        }
        self.emit(AuthEvent::SignedOut {
            user_id: entry.session.user.id,
        });
    }

    /// Current provider session, refreshed if it expires within a minute
    ///
    /// Marks the session as active. A failed refresh ends the session.
    pub async fn get_session(&self, id: Uuid) -> Option<Session> {
        let margin = Duration::seconds(REFRESH_MARGIN_SECS);
        let (session, refresh_lock) = {
            let mut entries = self.entries.write().await;
            let entry = entries.get_mut(&id)?;
            entry.last_seen = Utc::now();
            (entry.session.clone(), Arc::clone(&entry.refresh_lock))
        };
        if !session.expires_within(margin) {
            return Some(session);
        }

        let _refreshing = refresh_lock.lock().await;

        // Another request may have refreshed while we waited
        let session = self.entries.read().await.get(&id)?.session.clone();
        if !session.expires_within(margin) {
            return Some(session);
        }

        debug!(user_id = %session.user.id, "Refreshing provider session");
        match self.identity.refresh(&session).await {
            Ok(refreshed) => {
                let mut entries = self.entries.write().await;
                // Signed out while the refresh was in flight
                let entry = entries.get_mut(&id)?;
                entry.session = refreshed.clone();
                drop(entries);

                self.emit(AuthEvent::TokenRefreshed {
                    user_id: refreshed.user.id.clone(),
                });
                Some(refreshed)
            }
            Err(e) => {
                warn!(user_id = %session.user.id, error = %e, "Session refresh failed, signing out");
                self.entries.write().await.remove(&id);
                self.emit(AuthEvent::SignedOut {
                    user_id: session.user.id,
                });
                None
            }
        }
    }

    /// Drop sessions with no request in the last `idle`; returns how many
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let cutoff = Utc::now() - idle;
        let evicted: Vec<Session> = {
            let mut entries = self.entries.write().await;
            let stale: Vec<Uuid> = entries
                .iter()
                .filter(|(_, entry)| entry.last_seen <= cutoff)
                .map(|(id, _)| *id)
                .collect();
            stale
                .iter()
                .filter_map(|id| entries.remove(id))
                .map(|entry| entry.session)
                .collect()
        };

        for session in &evicted {
            self.emit(AuthEvent::SignedOut {
                user_id: session.user.id.clone(),
            });
        }
        if !evicted.is_empty() {
            info!(evicted = evicted.len(), "Evicted idle sessions");
        }
        evicted.len()
    }

    /// Snapshot of the session's dashboard state
    pub async fn dashboard(&self, id: Uuid) -> DashboardState {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|entry| entry.dashboard.clone())
            .unwrap_or_default()
    }

    /// Mutate the session's dashboard state; no-op for unknown sessions
    pub async fn update_dashboard<F>(&self, id: Uuid, update: F)
    where
        F: FnOnce(&mut DashboardState),
    {
        if let Some(entry) = self.entries.write().await.get_mut(&id) {
            update(&mut entry.dashboard);
        }
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
